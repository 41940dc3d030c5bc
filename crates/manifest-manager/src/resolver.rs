//! Package name resolution
//!
//! The installed package comes from the app's AndroidManifest.xml, falling
//! back to the `com.<appname>` convention used by new React Native projects.
//! Names are lower-cased because adb component and intent names are.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::{parser::ManifestParser, PackageNameResolution, ResolveError};

const DEFAULT_PACKAGE_PREFIX: &str = "com.";

/// Resolves the package from `android/app/src/main/AndroidManifest.xml`
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageNameResolver;

impl PackageNameResolver {
    /// Conventional manifest location inside a React Native project
    pub fn manifest_path(project_root: &Path) -> PathBuf {
        project_root
            .join("android")
            .join("app")
            .join("src")
            .join("main")
            .join("AndroidManifest.xml")
    }

    /// Package name used when the manifest does not declare one
    pub fn default_package_name(app_name: &str) -> Result<String, ResolveError> {
        let app_name = app_name.trim();
        if app_name.is_empty() {
            return Err(ResolveError::Unresolvable(app_name.to_string()));
        }
        Ok(format!("{}{}", DEFAULT_PACKAGE_PREFIX, app_name))
    }
}

#[async_trait]
impl PackageNameResolution for PackageNameResolver {
    async fn resolve_package_name(&self, app_name: &str, project_root: &Path) -> Result<String, ResolveError> {
        let manifest = Self::manifest_path(project_root);

        let declared = if manifest.exists() {
            ManifestParser::package_from_file(&manifest).await?
        } else {
            debug!("No manifest at {:?}", manifest);
            None
        };

        let package = match declared {
            Some(package) => package,
            None => Self::default_package_name(app_name)?,
        };

        let package = package.to_lowercase();
        info!("Resolved package name: {}", package);
        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(root: &Path, xml: &str) {
        let path = PackageNameResolver::manifest_path(root);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, xml).unwrap();
    }

    #[tokio::test]
    async fn test_declared_package_is_lowercased() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), r#"<manifest package="com.Example.AwesomeApp"/>"#);

        let package = PackageNameResolver
            .resolve_package_name("Ignored", dir.path())
            .await
            .unwrap();
        assert_eq!(package, "com.example.awesomeapp");
    }

    #[tokio::test]
    async fn test_fallback_without_manifest() {
        let dir = tempfile::tempdir().unwrap();

        let package = PackageNameResolver
            .resolve_package_name("AwesomeProject", dir.path())
            .await
            .unwrap();
        assert_eq!(package, "com.awesomeproject");
    }

    #[tokio::test]
    async fn test_fallback_without_package_attribute() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "<manifest><application/></manifest>");

        let package = PackageNameResolver.resolve_package_name("Demo", dir.path()).await.unwrap();
        assert_eq!(package, "com.demo");
    }

    #[tokio::test]
    async fn test_unresolvable() {
        let dir = tempfile::tempdir().unwrap();

        let err = PackageNameResolver.resolve_package_name("  ", dir.path()).await.unwrap_err();
        assert!(matches!(err, ResolveError::Unresolvable(_)));
        assert_eq!(
            rn_droid_core::DebugError::from(err).kind(),
            rn_droid_core::ErrorKind::Resolution
        );
    }
}
