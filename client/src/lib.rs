//! # JOYNER Client Core - Library Root
//!
//! Client-side data layer for JOYNER, a scheduling app where AI agents
//! negotiate meeting times between friends. Screens are a thin binding over
//! this crate: they call store fetches, subscribe to snapshots, and drive
//! the onboarding tutorial.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              joyner (this crate)                       │
//! ├────────────────────────────────────────────────────────┤
//! │  stores     - TTL-cached domain state + snapshots      │
//! │  tutorial   - scripted onboarding state machine        │
//! │  cache      - generic key/value TTL cache              │
//! │  services   - REST, SSE, WebSocket, durable storage    │
//! │  app        - AppContext wiring it all together        │
//! └────────────────────────────────────────────────────────┘
//!          │ HTTP / SSE                   │ WebSocket
//!          ▼                              ▼
//! ┌─────────────────┐          ┌─────────────────────────┐
//! │  REST backend   │          │   /ws/{user_id} push    │
//! └─────────────────┘          └─────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - **app**: [`app::AppContext`], built once at startup
//! - **cache**: [`cache::DataCache`] with stale/pending tracking
//! - **core**: errors, configuration, the `ApiService` trait, listeners
//! - **debug**: logging setup and tracked task spawning
//! - **negotiation**: folds SSE negotiation messages into a view model
//! - **services**: HTTP client, auth session, SSE parsing, storage, WebSocket
//! - **stores**: friends, home, a2a and badge stores plus the realtime bridge
//! - **tutorial**: script, machine, target and action registries
//!
//! ## Data Flow
//!
//! ```text
//! screen focus ──► store.fetch_x(false) ──► fresh? ──yes──► snapshot
//!                                             │no
//!                                             ▼
//!                                  ApiService (bearer token)
//!                                             │
//!                                  state swap + listeners
//!
//! WebSocket event ──► RealtimeBridge ──► invalidate + refetch
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`core::Result`]. Store fetches never fail:
//! errors are logged and the previous data stays visible.

pub mod app;
pub mod cache;
pub mod core;
pub mod debug;
pub mod negotiation;
pub mod services;
pub mod stores;
pub mod tutorial;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::AppContext;
pub use core::{AppError, ClientConfig, Result};
