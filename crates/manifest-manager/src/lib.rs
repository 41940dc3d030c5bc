//! Android Manifest Manager
//!
//! Resolves the identity of the app being debugged: its logical name from
//! `package.json` and its installed package from `AndroidManifest.xml`.

pub mod package;
pub mod parser;
pub mod resolver;

pub use package::PackageJson;
pub use parser::ManifestParser;
pub use resolver::PackageNameResolver;

use std::path::Path;
use async_trait::async_trait;

use rn_droid_core::DebugError;

/// Resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("package.json not found in {0}")]
    PackageJsonNotFound(String),
    #[error("package.json has no name")]
    MissingName,
    #[error("Invalid package.json: {0}")]
    InvalidPackageJson(#[from] serde_json::Error),
    #[error("Invalid AndroidManifest.xml: {0}")]
    InvalidManifest(String),
    #[error("Cannot derive a package name for app {0:?}")]
    Unresolvable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ResolveError> for DebugError {
    fn from(err: ResolveError) -> Self {
        DebugError::Resolution(err.to_string())
    }
}

/// Reads the app's logical name from the project manifest
#[async_trait]
pub trait AppManifest: Send + Sync {
    async fn app_name(&self, project_root: &Path) -> Result<String, ResolveError>;
}

/// Resolves the installed Android package for an app
#[async_trait]
pub trait PackageNameResolution: Send + Sync {
    async fn resolve_package_name(&self, app_name: &str, project_root: &Path) -> Result<String, ResolveError>;
}
