//! # Calendar API Client

use shared::dto::{CalendarEvent, CalendarLinkStatus, EventsResponse, LinkUrlResponse, NewCalendarEvent};

use super::client::ApiClient;
use crate::core::{AppError, Result};

impl ApiClient {
    /// Whether the user's external calendar is linked
    pub async fn calendar_link_status(&self, token: &str) -> Result<CalendarLinkStatus> {
        self.get_json("/calendar/link-status", token).await
    }

    /// OAuth URL that links an external calendar
    pub async fn calendar_link_url(&self, token: &str) -> Result<String> {
        let response: LinkUrlResponse = self.get_json("/calendar/link-url", token).await?;
        Ok(response.url)
    }

    pub async fn list_events(&self, token: &str) -> Result<Vec<CalendarEvent>> {
        let response: EventsResponse = self.get_json("/calendar/events", token).await?;
        Ok(response.events)
    }

    pub async fn create_event(&self, token: &str, event: &NewCalendarEvent) -> Result<CalendarEvent> {
        let request = self
            .client
            .post(self.url("/calendar/events"))
            .bearer_auth(token)
            .json(event);
        self.send("/calendar/events", request)
            .await?
            .json::<CalendarEvent>()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse created event: {}", e)))
    }

    pub async fn delete_event(&self, token: &str, event_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/calendar/events/{}", event_id)))
            .bearer_auth(token);
        self.send("/calendar/events/delete", request).await?;
        Ok(())
    }
}
