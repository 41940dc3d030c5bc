//! RN-Droid Core - shared types
//!
//! Errors, configuration and the session event bus used by every
//! RN-Droid component crate.

pub mod config;
pub mod events;
pub mod error;

pub use config::AppConfig;
pub use events::{Event, EventBus, EventSubscription};
pub use error::{DebugError, ErrorKind, Result};

/// RN-Droid version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "RN-Droid";
