//! Error types for RN-Droid
//!
//! Centralized error handling using thiserror. Component crates keep their
//! own error enums and convert into [`DebugError`] at the crate boundary.

use thiserror::Error;

/// Coarse error classification shared by every component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// External command failed to run, exited non-zero, or the device is unreachable
    ExternalTool,
    /// Command output did not have the expected shape
    Parse,
    /// Package identity could not be determined
    Resolution,
    /// Socket-level failure on the debugger relay
    RelayTransport,
    /// Local I/O, serialization or configuration failure
    Local,
}

/// Main error type for RN-Droid
#[derive(Error, Debug)]
pub enum DebugError {
    #[error("External tool error: {0}")]
    ExternalTool(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Relay transport error: {0}")]
    RelayTransport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for RN-Droid operations
pub type Result<T> = std::result::Result<T, DebugError>;

impl DebugError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DebugError::ExternalTool(_) => ErrorKind::ExternalTool,
            DebugError::Parse(_) => ErrorKind::Parse,
            DebugError::Resolution(_) => ErrorKind::Resolution,
            DebugError::RelayTransport(_) => ErrorKind::RelayTransport,
            DebugError::Io(_)
            | DebugError::Json(_)
            | DebugError::TomlParse(_)
            | DebugError::TomlSerialize(_)
            | DebugError::Config(_) => ErrorKind::Local,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            DebugError::ExternalTool(msg) => {
                format!("Device command failed: {}. Is the device connected and adb on PATH?", msg)
            }
            DebugError::Parse(msg) => format!("Unexpected device output: {}", msg),
            DebugError::Resolution(msg) => format!("Could not determine the app package: {}", msg),
            DebugError::Io(e) => format!("File operation failed: {}", e),
            DebugError::Config(msg) => format!("Configuration error: {}", msg),
            _ => self.to_string(),
        }
    }
}
