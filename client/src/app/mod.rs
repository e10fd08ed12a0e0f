//! # Application Context
//!
//! Everything the client needs, built once at startup and handed to the UI
//! binding. Replaces per-module singletons with one owned object.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  AppContext                                             │
//! │   ├── ApiClient (dyn ApiService) ── REST / SSE          │
//! │   ├── AuthSession ── token in KeyValueStorage           │
//! │   ├── Stores { friends, home, a2a, badge }              │
//! │   ├── WebSocketService ── /ws/{user_id}                 │
//! │   │      └── RealtimeBridge (attached while logged in)  │
//! │   ├── TutorialMachine                                   │
//! │   └── DataCache (negotiation logs)                      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! 1. [`AppContext::bootstrap`] (or [`AppContext::new`] with custom parts)
//! 2. [`AppContext::on_login`] once a user id is known
//! 3. screens call store fetches, subscribe to snapshots
//! 4. [`AppContext::on_logout`] tears the session down

use parking_lot::Mutex;
use shared::dto::{NegotiationMessage, UserProfile};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::DataCache;
use crate::core::{ApiService, AppError, ClientConfig, Result};
use crate::negotiation::NegotiationLog;
use crate::services::session::AuthSession;
use crate::services::storage::{FileStorage, KeyValueStorage};
use crate::services::websocket::WebSocketService;
use crate::services::ApiClient;
use crate::stores::{RealtimeBridge, Stores};
use crate::tutorial::TutorialMachine;

/// How long a finished negotiation transcript is served from cache
pub const NEGOTIATION_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

pub struct AppContext {
    pub config: ClientConfig,
    pub api: Arc<dyn ApiService>,
    pub storage: Arc<dyn KeyValueStorage>,
    pub session: AuthSession,
    pub cache: DataCache,
    pub stores: Stores,
    pub websocket: WebSocketService,
    pub tutorial: Arc<TutorialMachine>,
    bridge: Mutex<Option<RealtimeBridge>>,
}

impl AppContext {
    pub fn new(config: ClientConfig, api: Arc<dyn ApiService>, storage: Arc<dyn KeyValueStorage>) -> Self {
        let session = AuthSession::new(Arc::clone(&storage));
        let stores = Stores::new(Arc::clone(&api), session.clone(), Arc::clone(&storage));
        let websocket = WebSocketService::new(&config);
        let tutorial = Arc::new(TutorialMachine::with_default_script(Arc::clone(&storage)));

        Self {
            config,
            api,
            storage,
            session,
            cache: DataCache::new(),
            stores,
            websocket,
            tutorial,
            bridge: Mutex::new(None),
        }
    }

    /// Production wiring: config from the environment, file-backed storage,
    /// HTTP client. Restores tutorial progress.
    pub async fn bootstrap() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(&config.storage_path).await?);
        let api: Arc<dyn ApiService> = Arc::new(ApiClient::new(&config));
        info!(
            api_base_url = %config.api_base_url,
            storage = %config.storage_path.display(),
            "Bootstrapping client"
        );

        let context = Self::new(config, api, storage);
        if let Err(e) = context.tutorial.restore().await {
            warn!(error = %e, "Could not restore tutorial progress");
        }
        Ok(context)
    }

    /// Attach realtime handling and open the socket for `user_id`.
    ///
    /// Subscriptions are in place before the socket opens so no event is
    /// missed. A failed connect keeps retrying in the background.
    pub async fn on_login(&self, user_id: &str) -> Result<()> {
        // Re-attaching replaces the previous bridge's subscriptions by id
        let bridge = RealtimeBridge::attach(&self.websocket, &self.stores);
        *self.bridge.lock() = Some(bridge);
        info!(user_id, "User logged in");
        self.websocket.connect(user_id).await
    }

    /// Finish the OAuth redirect, load the profile and go online.
    ///
    /// The profile comes straight from `/auth/me`, never from the user the
    /// home store still holds from an earlier session.
    pub async fn login_with_redirect(&self, redirect_url: &str) -> Result<UserProfile> {
        let redirect = self.session.complete_redirect(redirect_url).await?;
        if !redirect.success {
            return Err(AppError::Unauthorized);
        }
        let token = self.session.require_token().await?;
        let user = self.api.get_me(&token).await?;
        self.stores.home.set_user(user.clone()).await;
        self.on_login(&user.id).await?;
        Ok(user)
    }

    /// Close the socket, forget the session and mark every store stale.
    /// Store data stays until the next fetch replaces it.
    pub async fn on_logout(&self) -> Result<()> {
        if let Some(bridge) = self.bridge.lock().take() {
            bridge.detach();
        }
        self.websocket.disconnect();
        self.stores.invalidate_all();
        self.cache.clear();
        self.session.logout().await?;
        info!("User logged out");
        Ok(())
    }

    pub fn is_online(&self) -> bool {
        self.bridge.lock().is_some()
    }

    /// Stream a negotiation, or serve its finished transcript from cache.
    ///
    /// A second caller while a stream is running gets whatever is cached, or
    /// an error when nothing is.
    pub async fn follow_negotiation(
        &self,
        session_id: &str,
        on_message: impl FnMut(&NegotiationMessage, &NegotiationLog),
    ) -> Result<NegotiationLog> {
        let key = format!("negotiation:{}", session_id);
        let cached = self.cache.get::<NegotiationLog>(&key);
        if cached.is_fresh() {
            if let Some(log) = cached.data.as_ref().filter(|log| log.is_finished()) {
                return Ok(log.clone());
            }
        }
        if self.cache.is_pending(&key) {
            return cached
                .data
                .ok_or_else(|| AppError::Api(format!("Negotiation {} is already being followed", session_id)));
        }

        self.cache.mark_pending(&key);
        match NegotiationLog::follow(self.api.as_ref(), &self.session, session_id, on_message).await {
            Ok(log) => {
                self.cache.set(&key, log.clone(), NEGOTIATION_CACHE_TTL);
                if log.is_finished() {
                    self.stores.a2a.invalidate();
                }
                Ok(log)
            }
            Err(e) => {
                self.cache.clear_pending(&key);
                Err(e)
            }
        }
    }

    /// Open the calendar OAuth page; the link status refreshes on the next
    /// home fetch.
    pub async fn link_calendar(&self) -> Result<String> {
        let url = self.session.open_calendar_link(self.api.as_ref()).await?;
        self.stores.home.invalidate();
        Ok(url)
    }
}
