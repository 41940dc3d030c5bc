//! package.json reader

use std::path::Path;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{AppManifest, ResolveError};

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: Option<String>,
}

/// Reads `<project>/package.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageJson;

impl PackageJson {
    /// Extract the app name from package.json contents
    pub fn parse_name(contents: &str) -> Result<String, ResolveError> {
        let manifest: PackageManifest = serde_json::from_str(contents)?;
        manifest
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or(ResolveError::MissingName)
    }
}

#[async_trait]
impl AppManifest for PackageJson {
    async fn app_name(&self, project_root: &Path) -> Result<String, ResolveError> {
        let path = project_root.join("package.json");
        if !path.exists() {
            return Err(ResolveError::PackageJsonNotFound(project_root.display().to_string()));
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let name = Self::parse_name(&contents)?;
        debug!("App name from {:?}: {}", path, name);
        Ok(name)
    }
}
