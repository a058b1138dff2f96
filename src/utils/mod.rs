//! Shared utilities.
//!
//! - [`app_data`] - configuration and per-user data/runtime locations
//! - [`progress`] - progress bars that compile away without the `progress` feature

pub mod app_data;
pub mod progress;

pub use app_data::*;
