//! Core types for Coursedeck.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod progress;
pub mod role;

pub use id::*;
pub use price::{CurrencyCode, Price};
pub use progress::CourseProgress;
pub use role::Role;
