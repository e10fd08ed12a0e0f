//! # Backend API Client Module
//!
//! HTTP client for the JOYNER backend. Every call is bearer-authenticated
//! and returns [`crate::core::Result`].
//!
//! ## Module Structure
//!
//! ```text
//! api/
//! ├── mod.rs            - Module exports and documentation
//! ├── client.rs         - ApiClient struct, request helpers, ApiService impl
//! ├── auth.rs           - /auth/me
//! ├── friends.rs        - /friends/*
//! ├── calendar.rs       - /calendar/*
//! ├── a2a.rs            - /chat/chat, /a2a/*, negotiation SSE stream
//! └── notifications.rs  - /chat/notifications, /chat/unread-count
//! ```
//!
//! ## Error Mapping
//!
//! - transport failures -> `AppError::Api`
//! - non-2xx -> `AppError::Http { status, detail }` where `detail` is the
//!   backend's JSON `detail` field (or the raw body)
//! - undecodable bodies -> `AppError::Parse`

pub mod a2a;
pub mod auth;
pub mod calendar;
pub mod client;
pub mod friends;
pub mod notifications;

pub use client::ApiClient;
