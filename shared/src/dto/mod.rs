//! # Data Transfer Objects (DTOs)
//!
//! This module contains all data structures exchanged with the backend over
//! REST, Server-Sent Events and the WebSocket push channel.
//!
//! ## Module Organization
//!
//! - [`auth`] - Current user profile, error bodies, OAuth redirect parameters
//! - [`friends`] - Friend list and friend request payloads
//! - [`calendar`] - Calendar link status, link URL, events
//! - [`a2a`] - Agent-to-agent sessions, pending requests, chat, negotiation messages
//! - [`notifications`] - Notification list and unread count
//! - [`realtime`] - WebSocket event envelope and event type names
//!
//! ## Example JSON Communication
//!
//! ```text
//! GET /friends/list
//! Authorization: Bearer eyJhbGciOi...
//! ```
//!
//! ```text
//! HTTP/1.1 200 OK
//! Content-Type: application/json
//!
//! {
//!   "friends": [
//!     { "id": "7c1e...", "email": "mina@joyner.app", "name": "Mina" }
//!   ]
//! }
//! ```

pub mod a2a;
pub mod auth;
pub mod calendar;
pub mod friends;
pub mod notifications;
pub mod realtime;

pub use a2a::*;
pub use auth::*;
pub use calendar::*;
pub use friends::*;
pub use notifications::*;
pub use realtime::*;
