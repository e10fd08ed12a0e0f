//! # Core Abstractions
//!
//! Foundational types used throughout the client core:
//!
//! - **[`error`]**: `AppError` and the `Result<T>` alias
//! - **[`config`]**: `ClientConfig` loaded from the environment
//! - **[`service`]**: the `ApiService` trait stores depend on
//! - **[`subscription`]**: `ListenerSet` and the `Unsubscribe` handle
//!
//! ## Dependency Injection
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use joyner::core::{ApiService, ClientConfig};
//! use joyner::services::api::ApiClient;
//!
//! let config = ClientConfig::default();
//! let api: Arc<dyn ApiService> = Arc::new(ApiClient::new(&config));
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod subscription;

pub use config::ClientConfig;
pub use error::{AppError, Result};
pub use service::ApiService;
pub use subscription::{Listener, ListenerSet, Unsubscribe};
