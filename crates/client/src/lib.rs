//! Coursedeck Client - Headless client core for the course marketplace.
//!
//! This crate is the state-management and API layer that a UI shell (native,
//! TUI, or embedded webview) drives. It owns no rendering; it owns the typed
//! REST client, the session / cart / enrollment state containers, the
//! route-guard state machine, and the checkout orchestration.
//!
//! # Architecture
//!
//! - [`api::ApiClient`] - typed JSON-over-REST client for the marketplace API
//! - [`store`] - explicit, dependency-injected state containers plus the
//!   persistence vault (one versioned blob; payment state is never persisted)
//! - [`guard`] - pure route-guard decisions and the [`guard::Router`]
//!   location container
//! - [`checkout::PaymentOrchestrator`] - the single-attempt checkout state
//!   machine over an injected [`checkout::PaymentProvider`]
//! - [`enrollment::EnrollmentReconciler`] - mirrors the server-owned
//!   enrollment set and per-course progress
//! - [`state::AppState`] - wires the above together and subscribes to the
//!   [`events::EventBus`] so any 401 anywhere forces logout + `/login`
//!
//! # Example
//!
//! ```rust,ignore
//! use coursedeck_client::{AppState, ClientConfig};
//! use coursedeck_client::store::vault::MemoryBackend;
//! use std::sync::Arc;
//!
//! let config = ClientConfig::from_env()?;
//! let app = AppState::new(config, Arc::new(MemoryBackend::default()))?;
//! app.hydrate();
//! let _listener = app.spawn_unauthorized_listener();
//!
//! let user = app.login("ada@example.com", "hunter2").await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod guard;
pub mod routes;
pub mod state;
pub mod store;

pub use config::ClientConfig;
pub use error::ClientError;
pub use state::AppState;
