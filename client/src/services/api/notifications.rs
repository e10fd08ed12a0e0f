//! # Notifications API Client

use chrono::{DateTime, Utc};
use shared::dto::{Notification, NotificationsResponse, UnreadCountResponse};

use super::client::ApiClient;
use crate::core::{AppError, Result};

impl ApiClient {
    pub async fn list_notifications(&self, token: &str) -> Result<Vec<Notification>> {
        let response: NotificationsResponse = self.get_json("/chat/notifications", token).await?;
        Ok(response.notifications)
    }

    /// Unread messages since `last_read_at` (everything when `None`)
    pub async fn unread_count(&self, token: &str, last_read_at: Option<DateTime<Utc>>) -> Result<u32> {
        let mut request = self.client.get(self.url("/chat/unread-count")).bearer_auth(token);
        if let Some(at) = last_read_at {
            request = request.query(&[("last_read_at", shared::iso_timestamp(at))]);
        }
        self.send("/chat/unread-count", request)
            .await?
            .json::<UnreadCountResponse>()
            .await
            .map(|r| r.count)
            .map_err(|e| AppError::Parse(format!("Failed to parse unread count: {}", e)))
    }
}
