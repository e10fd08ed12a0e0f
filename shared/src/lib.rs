//! # Shared Data Transfer Objects Library
//!
//! This library defines the contract between the JOYNER client core and the
//! scheduling backend. All DTOs use JSON serialization via `serde`.
//!
//! ## Structure
//!
//! - **[`dto`]**: Data Transfer Objects for API communication
//!   - **[`dto::auth`]**: Current user, backend error bodies, OAuth redirects
//!   - **[`dto::friends`]**: Friends and friend requests
//!   - **[`dto::calendar`]**: Calendar link status and events
//!   - **[`dto::a2a`]**: A2A sessions, pending requests, chat, negotiation stream messages
//!   - **[`dto::notifications`]**: Notifications and unread counts
//!   - **[`dto::realtime`]**: WebSocket push event envelope and type names
//! - **[`utils`]**: Shared formatting helpers
//!
//! ## Wire Format
//!
//! - Field names are **snake_case** in Rust and JSON
//! - Collections and optional fields tolerate omission (`#[serde(default)]`),
//!   the backend drops empty fields freely
//! - Negotiation messages are internally tagged on `type` with
//!   SCREAMING_SNAKE_CASE names (`PROPOSE`, `NEED_HUMAN`, ...)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shared::dto::friends::FriendsListResponse;
//!
//! let body = r#"{"friends":[{"id":"u1","email":"a@joyner.app"}]}"#;
//! let list: FriendsListResponse = serde_json::from_str(body).unwrap();
//! assert_eq!(list.friends[0].id, "u1");
//! ```

pub mod dto;
pub mod utils;

// DTO library: everything is public API
pub use dto::*;
pub use utils::*;
