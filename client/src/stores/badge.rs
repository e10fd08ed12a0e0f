//! Notification list and the unread badge.
//!
//! Read/dismissed/viewed bookkeeping is client-side and survives restarts:
//! `last_read_at` and the dismissed and viewed id lists live in durable
//! storage and are loaded once, before the first fetch.

use chrono::{DateTime, Utc};
use shared::dto::Notification;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{Field, LoadStatus, StoreCore, StoreState};
use crate::core::{ApiService, Result, Unsubscribe};
use crate::services::session::AuthSession;
use crate::services::storage::{get_json, keys, set_json, KeyValueStorage};

pub const BADGE_TTL: Duration = Duration::from_secs(3 * 60);

const NOTIFICATIONS: &str = "notifications";
const UNREAD: &str = "unread_count";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeState {
    /// Dismissed notifications are filtered out
    pub notifications: Vec<Notification>,
    pub unread_count: u32,
    pub last_read_at: Option<DateTime<Utc>>,
    pub dismissed_ids: Vec<String>,
    pub viewed_ids: Vec<String>,
    pub notifications_loading: bool,
    pub unread_loading: bool,
    pub status: LoadStatus,
}

impl BadgeState {
    /// Notifications neither read on the server nor opened locally
    pub fn unviewed_count(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| !n.read && !self.viewed_ids.contains(&n.id))
            .count()
    }

    pub fn has_badge(&self) -> bool {
        self.unread_count > 0
    }
}

impl StoreState for BadgeState {
    fn status(&self) -> &LoadStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut LoadStatus {
        &mut self.status
    }
}

const NOTIFICATIONS_FIELD: Field<BadgeState, Vec<Notification>> = Field {
    name: NOTIFICATIONS,
    get: |s| &s.notifications,
    get_mut: |s| &mut s.notifications,
    loading: |s| &mut s.notifications_loading,
};

const UNREAD_FIELD: Field<BadgeState, u32> = Field {
    name: UNREAD,
    get: |s| &s.unread_count,
    get_mut: |s| &mut s.unread_count,
    loading: |s| &mut s.unread_loading,
};

pub struct BadgeStore {
    core: StoreCore<BadgeState>,
    api: Arc<dyn ApiService>,
    session: AuthSession,
    storage: Arc<dyn KeyValueStorage>,
    restored: OnceCell<()>,
}

impl BadgeStore {
    pub fn new(api: Arc<dyn ApiService>, session: AuthSession, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            core: StoreCore::new("badge", BADGE_TTL),
            api,
            session,
            storage,
            restored: OnceCell::new(),
        }
    }

    pub fn get_snapshot(&self) -> Arc<BadgeState> {
        self.core.snapshot()
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Unsubscribe {
        self.core.subscribe(listener)
    }

    /// Load persisted read/dismissed/viewed state. Runs once; later calls
    /// return immediately.
    pub async fn restore(&self) {
        self.restored
            .get_or_init(|| async {
                let storage = self.storage.as_ref();
                let last_read_at = match storage.get(keys::NOTIFICATIONS_LAST_READ_AT).await {
                    Ok(Some(raw)) => DateTime::parse_from_rfc3339(&raw)
                        .map(|t| t.with_timezone(&Utc))
                        .map_err(|e| warn!(error = %e, "Ignoring unreadable last_read_at"))
                        .ok(),
                    Ok(None) => None,
                    Err(e) => {
                        warn!(error = %e, "Failed to read last_read_at");
                        None
                    }
                };
                let dismissed: Vec<String> = read_ids(storage, keys::DISMISSED_NOTIFICATION_IDS).await;
                let viewed: Vec<String> = read_ids(storage, keys::VIEWED_NOTIFICATION_IDS).await;

                debug!(dismissed = dismissed.len(), viewed = viewed.len(), "Badge state restored");
                self.core.modify(|s| {
                    s.last_read_at = last_read_at;
                    s.notifications.retain(|n| !dismissed.contains(&n.id));
                    s.dismissed_ids = dismissed;
                    s.viewed_ids = viewed;
                });
            })
            .await;
    }

    pub async fn fetch_notifications(&self, force: bool) -> Vec<Notification> {
        self.restore().await;
        let api = &self.api;
        let dismissed = self.core.snapshot().dismissed_ids.clone();
        self.core
            .load(&NOTIFICATIONS_FIELD, force, &self.session, |token| async move {
                api.list_notifications(&token).await.map(|mut list| {
                    list.retain(|n| !dismissed.contains(&n.id));
                    list
                })
            })
            .await
    }

    /// Count of notifications newer than the local `last_read_at`
    pub async fn fetch_unread_count(&self, force: bool) -> u32 {
        self.restore().await;
        let api = &self.api;
        let last_read_at = self.core.snapshot().last_read_at;
        self.core
            .load(&UNREAD_FIELD, force, &self.session, |token| async move {
                api.unread_count(&token, last_read_at).await
            })
            .await
    }

    pub async fn fetch_all(&self, force: bool) {
        self.restore().await;
        self.core
            .load_all(force, &[NOTIFICATIONS, UNREAD], async {
                tokio::join!(self.fetch_notifications(force), self.fetch_unread_count(force));
            })
            .await;
    }

    pub fn invalidate(&self) {
        self.core.invalidate();
    }

    pub async fn refresh(&self) {
        self.fetch_all(true).await;
    }

    /// Clear the badge: everything up to now counts as read.
    pub async fn mark_read(&self) -> Result<()> {
        self.restore().await;
        let now = Utc::now();
        self.core.modify(|s| {
            s.last_read_at = Some(now);
            s.unread_count = 0;
            for n in &mut s.notifications {
                n.read = true;
            }
        });
        self.storage
            .set(keys::NOTIFICATIONS_LAST_READ_AT, &shared::iso_timestamp(now))
            .await
    }

    /// Hide a notification for good
    pub async fn dismiss_notification(&self, notification_id: &str) -> Result<()> {
        self.restore().await;
        self.core.modify(|s| {
            s.notifications.retain(|n| n.id != notification_id);
            if !s.dismissed_ids.iter().any(|id| id == notification_id) {
                s.dismissed_ids.push(notification_id.to_string());
            }
        });
        let ids = self.core.snapshot().dismissed_ids.clone();
        set_json(self.storage.as_ref(), keys::DISMISSED_NOTIFICATION_IDS, &ids).await
    }

    /// Record that the user opened a notification
    pub async fn mark_viewed(&self, notification_id: &str) -> Result<()> {
        self.restore().await;
        let changed = self.core.modify(|s| {
            if !s.viewed_ids.iter().any(|id| id == notification_id) {
                s.viewed_ids.push(notification_id.to_string());
            }
        });
        if !changed {
            return Ok(());
        }
        let ids = self.core.snapshot().viewed_ids.clone();
        set_json(self.storage.as_ref(), keys::VIEWED_NOTIFICATION_IDS, &ids).await
    }
}

async fn read_ids(storage: &dyn KeyValueStorage, key: &str) -> Vec<String> {
    match get_json::<Vec<String>>(storage, key).await {
        Ok(ids) => ids.unwrap_or_default(),
        Err(e) => {
            warn!(key, error = %e, "Failed to read notification ids");
            Vec::new()
        }
    }
}
