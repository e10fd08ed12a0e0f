//! Push events to store actions.
//!
//! | Event | Action |
//! |-------|--------|
//! | `friend_request` | friends: invalidate, refetch requests |
//! | `friend_accepted` | friends: invalidate, refetch all |
//! | `friend_deleted` | friends: drop `deleted_by` now, then invalidate |
//! | `a2a_request`, `a2a_status_changed` | a2a: invalidate, refetch all; badge: refetch count |
//! | `notification` | badge: invalidate, refetch all |
//!
//! Handlers run on the socket task, so network work is spawned.

use serde_json::Value;
use shared::dto::realtime::event_types;
use shared::dto::{RealtimeEvent, SessionStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::Stores;
use crate::core::Unsubscribe;
use crate::debug::spawn_tracked;
use crate::services::websocket::WebSocketService;

const FRIENDS_SUBSCRIPTION: &str = "realtime:friends";
const A2A_SUBSCRIPTION: &str = "realtime:a2a";
const BADGE_SUBSCRIPTION: &str = "realtime:badge";

/// Live subscriptions wiring the socket to the stores
#[derive(Debug)]
pub struct RealtimeBridge {
    subscriptions: Vec<Unsubscribe>,
}

impl RealtimeBridge {
    /// Subscribe the stores to `ws`. Attaching again replaces the previous
    /// bridge's subscriptions (ids are fixed).
    pub fn attach(ws: &WebSocketService, stores: &Stores) -> Self {
        let friends = {
            let stores = stores.clone();
            ws.subscribe(
                FRIENDS_SUBSCRIPTION,
                &[
                    event_types::FRIEND_REQUEST,
                    event_types::FRIEND_ACCEPTED,
                    event_types::FRIEND_DELETED,
                ],
                move |value| on_friends_event(&stores, value),
            )
        };
        let a2a = {
            let stores = stores.clone();
            ws.subscribe(
                A2A_SUBSCRIPTION,
                &[event_types::A2A_REQUEST, event_types::A2A_STATUS_CHANGED],
                move |value| on_a2a_event(&stores, value),
            )
        };
        let badge = {
            let stores = stores.clone();
            ws.subscribe(BADGE_SUBSCRIPTION, &[event_types::NOTIFICATION], move |_| {
                stores.badge.invalidate();
                let badge = Arc::clone(&stores.badge);
                spawn_tracked("realtime_badge_refetch", async move { badge.fetch_all(true).await });
            })
        };

        info!("Realtime bridge attached");
        Self {
            subscriptions: vec![friends, a2a, badge],
        }
    }

    pub fn detach(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
        debug!("Realtime bridge detached");
    }
}

fn parse(value: &Value) -> Option<RealtimeEvent> {
    match serde_json::from_value::<RealtimeEvent>(value.clone()) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "Unreadable realtime event");
            None
        }
    }
}

fn on_friends_event(stores: &Stores, value: &Value) {
    let Some(event) = parse(value) else { return };
    let friends = Arc::clone(&stores.friends);

    match event.kind.as_str() {
        event_types::FRIEND_REQUEST => {
            friends.invalidate();
            spawn_tracked("realtime_friend_requests_refetch", async move {
                friends.fetch_requests(true).await;
            });
        }
        event_types::FRIEND_ACCEPTED => {
            friends.invalidate();
            spawn_tracked("realtime_friends_refetch", async move { friends.fetch_all(true).await });
        }
        event_types::FRIEND_DELETED => {
            match event.str_field("deleted_by").or_else(|| event.str_field("friend_id")) {
                Some(user_id) => {
                    info!(user_id, "Friend removed by the other side");
                    friends.remove_friend(user_id);
                }
                None => warn!("friend_deleted event without a user id"),
            }
            friends.invalidate();
        }
        other => debug!(event = other, "Unhandled friends event"),
    }
}

fn on_a2a_event(stores: &Stores, value: &Value) {
    let Some(event) = parse(value) else { return };

    if event.kind == event_types::A2A_STATUS_CHANGED {
        let status = event
            .payload
            .get("status")
            .and_then(|s| serde_json::from_value::<SessionStatus>(s.clone()).ok());
        if let (Some(session_id), Some(status)) = (event.str_field("session_id"), status) {
            stores.a2a.update_session_status(session_id, status);
        }
    }

    stores.a2a.invalidate();
    let a2a = Arc::clone(&stores.a2a);
    let badge = Arc::clone(&stores.badge);
    spawn_tracked("realtime_a2a_refetch", async move {
        tokio::join!(a2a.fetch_all(true), badge.fetch_unread_count(true));
    });
}
