//! Android Build Engine
//!
//! Builds a React Native app and installs it on the attached device.

pub mod runner;

pub use runner::{BuildMessage, ReactNativeRunner};

use std::path::Path;
use async_trait::async_trait;

use rn_droid_core::DebugError;

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Build failed: {0}")]
    BuildFailed(String),
    #[error("Toolchain not found: {0}")]
    ToolchainNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BuildError> for DebugError {
    fn from(err: BuildError) -> Self {
        DebugError::ExternalTool(err.to_string())
    }
}

/// Builds the project and installs it on the device
#[async_trait]
pub trait AppInstaller: Send + Sync {
    async fn build_and_install(&self, project_root: &Path) -> Result<(), BuildError>;
}
