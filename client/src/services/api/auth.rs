//! # Authentication API
//!
//! Current-user lookup. Login itself happens in the browser OAuth flow
//! (see `services::session`).

use shared::dto::UserProfile;

use super::client::ApiClient;
use crate::core::Result;

impl ApiClient {
    /// `GET /auth/me`
    pub async fn get_me(&self, token: &str) -> Result<UserProfile> {
        self.get_json("/auth/me", token).await
    }
}
