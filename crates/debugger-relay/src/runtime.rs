//! Script runtime
//!
//! Holds the state the debugged app's scripts see: injected globals, the
//! installed bridge, and the scripts imported so far. Fetching a script is
//! delegated to a [`ScriptImporter`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::bridge::{BridgeError, BridgeRegistry};

/// Script errors
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("Invalid value injected for {key}: {source}")]
    InvalidInject {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid executeApplicationScript payload: {0}")]
    InvalidPayload(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches a script and makes it available for execution
#[async_trait]
pub trait ScriptImporter: Send + Sync {
    /// Returns where the script was stored
    async fn import(&self, url: &str) -> Result<PathBuf, ScriptError>;
}

/// Downloads scripts into the project's `.vscode/.react` directory, where
/// the debugger front end picks them up together with their source maps.
pub struct ScriptDownloader {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl ScriptDownloader {
    pub fn new(project_root: &Path) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_dir: project_root.join(".vscode").join(".react"),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Last path segment of the script URL, query stripped
    pub fn file_name_for(url: &str) -> String {
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.path_segments().and_then(|s| s.last()).map(str::to_string))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "bundle.js".to_string())
    }
}

#[async_trait]
impl ScriptImporter for ScriptDownloader {
    async fn import(&self, url: &str) -> Result<PathBuf, ScriptError> {
        debug!("Downloading script {}", url);
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let path = self.cache_dir.join(Self::file_name_for(url));
        tokio::fs::write(&path, body).await?;

        info!("Script {} stored at {:?}", url, path);
        Ok(path)
    }
}

/// Runtime side of the relay
pub struct ScriptRuntime {
    globals: RwLock<HashMap<String, Value>>,
    bridge: RwLock<Option<Arc<BridgeRegistry>>>,
    scripts: RwLock<Vec<PathBuf>>,
    importer: Arc<dyn ScriptImporter>,
}

impl ScriptRuntime {
    pub fn new(importer: impl ScriptImporter + 'static) -> Self {
        Self {
            globals: RwLock::new(HashMap::new()),
            bridge: RwLock::new(None),
            scripts: RwLock::new(Vec::new()),
            importer: Arc::new(importer),
        }
    }

    pub fn set_global(&self, key: impl Into<String>, value: Value) {
        self.globals.write().insert(key.into(), value);
    }

    pub fn global(&self, key: &str) -> Option<Value> {
        self.globals.read().get(key).cloned()
    }

    /// Decode each JSON text and assign it as a global
    pub fn inject(&self, encoded: &HashMap<String, String>) -> Result<(), ScriptError> {
        for (key, text) in encoded {
            let value = serde_json::from_str(text).map_err(|source| ScriptError::InvalidInject {
                key: key.clone(),
                source,
            })?;
            self.set_global(key.clone(), value);
        }
        Ok(())
    }

    /// Install (or replace) the bridge remote calls are routed to
    pub fn install_bridge(&self, bridge: BridgeRegistry) {
        *self.bridge.write() = Some(Arc::new(bridge));
    }

    pub fn call_bridge(&self, method: &str, args: &[Value]) -> Result<Value, BridgeError> {
        let bridge = self.bridge.read().clone().ok_or(BridgeError::Unavailable)?;
        bridge.invoke(method, args)
    }

    pub async fn import_script(&self, url: &str) -> Result<PathBuf, ScriptError> {
        let path = self.importer.import(url).await?;
        self.scripts.write().push(path.clone());
        Ok(path)
    }

    /// Scripts imported so far, oldest first
    pub fn loaded_scripts(&self) -> Vec<PathBuf> {
        self.scripts.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct NoImport;

    #[async_trait]
    impl ScriptImporter for NoImport {
        async fn import(&self, url: &str) -> Result<PathBuf, ScriptError> {
            Err(ScriptError::InvalidPayload(url.to_string()))
        }
    }

    #[test]
    fn test_file_name_for() {
        assert_eq!(
            ScriptDownloader::file_name_for("http://localhost:8081/index.android.bundle?platform=android&dev=true"),
            "index.android.bundle"
        );
        assert_eq!(ScriptDownloader::file_name_for("http://localhost:8081/"), "bundle.js");
        assert_eq!(ScriptDownloader::file_name_for("not a url"), "bundle.js");
    }

    #[test]
    fn test_inject_decodes_values() {
        let runtime = ScriptRuntime::new(NoImport);
        let mut encoded = HashMap::new();
        encoded.insert("__fbBatchedBridgeConfig".to_string(), r#"{"remoteModuleConfig":[]}"#.to_string());
        encoded.insert("__DEV__".to_string(), "true".to_string());

        runtime.inject(&encoded).unwrap();
        assert_eq!(runtime.global("__fbBatchedBridgeConfig"), Some(json!({"remoteModuleConfig": []})));
        assert_eq!(runtime.global("__DEV__"), Some(json!(true)));
    }

    #[test]
    fn test_inject_rejects_bad_json() {
        let runtime = ScriptRuntime::new(NoImport);
        let mut encoded = HashMap::new();
        encoded.insert("broken".to_string(), "{".to_string());

        let err = runtime.inject(&encoded).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidInject { ref key, .. } if key == "broken"));
    }

    #[test]
    fn test_bridge_lifecycle() {
        let runtime = ScriptRuntime::new(NoImport);
        assert!(matches!(runtime.call_bridge("flushedQueue", &[]), Err(BridgeError::Unavailable)));

        let mut bridge = BridgeRegistry::new();
        bridge.register("flushedQueue", |_| Ok(json!(null)));
        runtime.install_bridge(bridge);

        assert_eq!(runtime.call_bridge("flushedQueue", &[]).unwrap(), json!(null));
    }

    #[tokio::test]
    async fn test_downloader_stores_script() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request).await.unwrap();
            let body = "__d(function(){});";
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/javascript\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
        });

        let project = tempfile::tempdir().unwrap();
        let runtime = ScriptRuntime::new(ScriptDownloader::new(project.path()));
        let url = format!("http://{}/index.android.bundle?platform=android", addr);

        let path = runtime.import_script(&url).await.unwrap();
        assert_eq!(path, project.path().join(".vscode").join(".react").join("index.android.bundle"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "__d(function(){});");
        assert_eq!(runtime.loaded_scripts(), vec![path]);
        server.await.unwrap();
    }
}
