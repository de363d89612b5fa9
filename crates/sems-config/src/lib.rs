//! sems-config
//!
//! Persistent console preferences: API endpoint, outbox location and output
//! settings. Owns the Config data structure plus disk persistence helpers.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{AccessibilitySettings, Config};
