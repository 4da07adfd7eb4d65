//! # hkrow Configuration Module
//!
//! This module centralizes the configuration constants of the row model.
//! Values that depend on each other live side by side and their relationships
//! are enforced through compile-time assertions.
//!
//! ## Module Organization
//!
//! - [`constants`]: Group shape limits, inline buffer sizes and operator limits

pub mod constants;
pub use constants::*;
