//! RN-Droid - React Native Android debug sessions
//!
//! Finds the attached Android device, builds and launches a React Native
//! app on it, and relays the debugger proxy to the app's script runtime.
//!
//! ## Architecture
//!
//! - `rn-droid-core`: configuration, events and the shared error type
//! - `rn-droid-emulator-bridge`: device discovery and adb commands
//! - `rn-droid-build-engine`: `react-native run-android` build/install
//! - `rn-droid-manifest-manager`: app name and package resolution
//! - `rn-droid-debugger-relay`: reconnecting debugger-proxy relay
//! - `session` (this crate): the session orchestrator

#![warn(clippy::all)]

pub mod commands;
pub mod session;

// Re-export main components for library usage
pub use rn_droid_core as core;
pub use rn_droid_emulator_bridge as emulator;
pub use rn_droid_build_engine as build;
pub use rn_droid_manifest_manager as manifest;
pub use rn_droid_debugger_relay as relay;

pub use session::{select_target, SessionOrchestrator, SessionTarget};

/// Prelude module for convenient imports
pub mod prelude {
    pub use rn_droid_core::{AppConfig, DebugError, Event, EventBus};
    pub use rn_droid_emulator_bridge::{filter_online, AdbClient, Device, DeviceSource};
    pub use rn_droid_debugger_relay::{DebuggerRelay, Dispatcher, RelayOptions, RelayState};
    pub use crate::session::{select_target, SessionOrchestrator, SessionTarget};
}
