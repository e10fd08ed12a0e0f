//! # Realtime Push Events
//!
//! Envelope for the JSON events delivered on `ws(s)://.../ws/{user_id}`.
//! Every event carries a `type` field; the rest of the object depends on it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type names sent by the backend
pub mod event_types {
    pub const FRIEND_REQUEST: &str = "friend_request";
    pub const FRIEND_ACCEPTED: &str = "friend_accepted";
    pub const FRIEND_DELETED: &str = "friend_deleted";
    pub const A2A_REQUEST: &str = "a2a_request";
    pub const A2A_STATUS_CHANGED: &str = "a2a_status_changed";
    pub const NOTIFICATION: &str = "notification";
    /// Subscribes to every event type
    pub const WILDCARD: &str = "*";
}

/// Raw push event: the `type` plus whatever other fields came with it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl RealtimeEvent {
    /// String field from the payload
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}
