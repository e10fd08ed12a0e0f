//! # Auth Session
//!
//! Bearer token and cached profile fields kept in durable storage, plus the
//! calendar OAuth browser hand-off.

use reqwest::Url;
use shared::dto::{AuthRedirect, UserProfile};
use std::sync::Arc;
use tracing::{info, warn};

use super::storage::{keys, KeyValueStorage};
use crate::core::{ApiService, AppError, Result};

/// Token and profile cache over durable storage
#[derive(Clone)]
pub struct AuthSession {
    storage: Arc<dyn KeyValueStorage>,
}

impl AuthSession {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Stored bearer token.
    ///
    /// Storage failures read as "no token": callers treat both the same way
    /// (skip the network call, keep current data).
    pub async fn token(&self) -> Option<String> {
        match self.storage.get(keys::AUTH_TOKEN).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read auth token");
                None
            }
        }
    }

    /// Token or [`AppError::Unauthorized`]
    pub async fn require_token(&self) -> Result<String> {
        self.token().await.ok_or(AppError::Unauthorized)
    }

    pub async fn set_token(&self, token: &str) -> Result<()> {
        self.storage.set(keys::AUTH_TOKEN, token).await
    }

    /// Cache the fields screens read before `/auth/me` answers
    pub async fn cache_profile(&self, user: &UserProfile) -> Result<()> {
        self.storage.set(keys::USER_ID, &user.id).await?;
        self.storage.set(keys::USER_EMAIL, &user.email).await?;
        match &user.name {
            Some(name) => self.storage.set(keys::USER_NAME, name).await,
            None => self.storage.remove(keys::USER_NAME).await,
        }
    }

    pub async fn cached_user_id(&self) -> Option<String> {
        self.storage.get(keys::USER_ID).await.ok().flatten()
    }

    /// Remove token and cached profile fields
    pub async fn logout(&self) -> Result<()> {
        for key in [keys::AUTH_TOKEN, keys::USER_ID, keys::USER_EMAIL, keys::USER_NAME] {
            self.storage.remove(key).await?;
        }
        info!("Session cleared");
        Ok(())
    }

    /// Complete an OAuth redirect: store the token when the redirect carries one.
    pub async fn complete_redirect(&self, redirect_url: &str) -> Result<AuthRedirect> {
        let redirect = parse_auth_redirect(redirect_url)?;
        if let Some(error) = &redirect.error {
            return Err(AppError::Http {
                status: 401,
                detail: error.clone(),
            });
        }
        if let Some(token) = &redirect.token {
            self.set_token(token).await?;
        }
        Ok(redirect)
    }

    /// Fetch the calendar OAuth URL and open it in the system browser.
    pub async fn open_calendar_link(&self, api: &dyn ApiService) -> Result<String> {
        let token = self.require_token().await?;
        let url = api.calendar_link_url(&token).await?;
        info!(url = %url, "Opening calendar link in browser");
        open::that(&url).map_err(|e| AppError::Api(format!("Failed to open browser: {}", e)))?;
        Ok(url)
    }
}

/// Parse `token`, `success` and `error` from an OAuth redirect URL.
///
/// `success` is true for `success=true` or `success=1`, or when a token is
/// present and no `success` parameter was sent.
pub fn parse_auth_redirect(redirect_url: &str) -> Result<AuthRedirect> {
    let url = Url::parse(redirect_url)
        .map_err(|e| AppError::Parse(format!("Invalid redirect URL: {}", e)))?;

    let mut redirect = AuthRedirect::default();
    let mut explicit_success = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "token" if !value.is_empty() => redirect.token = Some(value.into_owned()),
            "success" => explicit_success = Some(value == "true" || value == "1"),
            "error" if !value.is_empty() => redirect.error = Some(value.into_owned()),
            _ => {}
        }
    }
    redirect.success = explicit_success.unwrap_or(redirect.token.is_some()) && redirect.error.is_none();
    Ok(redirect)
}
