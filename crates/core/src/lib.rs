//! Coursedeck Core - Shared types library.
//!
//! This crate provides common types used across all Coursedeck components:
//! - `client` - Headless client core (stores, API client, checkout)
//! - `integration-tests` - Scenario tests against a stub marketplace API
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no state
//! containers. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, roles, and
//!   per-course progress records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
