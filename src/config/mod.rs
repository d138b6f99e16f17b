//! # Configuration
//!
//! Startup configuration for the controller.

mod controller;

pub use controller::{ConfigError, ControllerConfig};
