//! # Services Module
//!
//! External integrations for the JOYNER client.
//!
//! ```text
//! services/
//! ├── api/          - Backend REST client (auth, friends, calendar, a2a, chat)
//! ├── session.rs    - Auth token, cached profile, OAuth redirect parsing
//! ├── sse.rs        - `data: ` line buffering for negotiation streams
//! ├── storage.rs    - Durable async key-value storage
//! └── websocket.rs  - Per-user push socket multiplexed to subscribers
//! ```
//!
//! ```text
//!             ┌──────────────┐        ┌──────────────────┐
//!  stores ──► │  ApiClient   │ ─────► │  REST / SSE      │
//!             └──────────────┘        └──────────────────┘
//!             ┌──────────────┐        ┌──────────────────┐
//!  bridge ◄── │ WebSocket    │ ◄───── │  /ws/{user_id}   │
//!             └──────────────┘        └──────────────────┘
//! ```

pub mod api;
pub mod session;
pub mod sse;
pub mod storage;
pub mod websocket;

pub use api::ApiClient;
pub use session::AuthSession;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use websocket::{ConnectionState, WebSocketService};
