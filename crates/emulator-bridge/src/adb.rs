//! ADB (Android Debug Bridge) Client
//!
//! Discovers devices and issues device-scoped commands via adb.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};

use rn_droid_core::DebugError;

use crate::device::{ApiLevel, Device};

/// `<id>\t<status>` optionally followed by more columns
static DEVICE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\t(\S+)(?:\s|$)").expect("device line pattern should compile"));

#[cfg(windows)]
const ADB_BINARY: &str = "adb.exe";
#[cfg(not(windows))]
const ADB_BINARY: &str = "adb";

/// ADB errors
#[derive(Debug, thiserror::Error)]
pub enum AdbError {
    #[error("ADB not found")]
    NotFound,
    #[error("ADB command failed: {0}")]
    CommandFailed(String),
    #[error("Unexpected adb output: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AdbError> for DebugError {
    fn from(err: AdbError) -> Self {
        match err {
            AdbError::Parse(msg) => DebugError::Parse(msg),
            other => DebugError::ExternalTool(other.to_string()),
        }
    }
}

/// Runs one adb invocation and returns its stdout
#[async_trait]
pub trait AdbExecutor: Send + Sync {
    async fn exec(&self, args: &[String]) -> Result<String, AdbError>;
}

/// Executes the real adb binary
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    adb: PathBuf,
}

impl ProcessExecutor {
    pub fn new(adb: PathBuf) -> Self {
        Self { adb }
    }

    /// Find adb: explicit override, then the SDK's platform-tools, then PATH
    pub fn locate(sdk_path: Option<&Path>, adb_override: Option<&Path>) -> Result<Self, AdbError> {
        if let Some(adb) = adb_override {
            return Ok(Self::new(adb.to_path_buf()));
        }

        if let Some(sdk) = sdk_path {
            let candidate = sdk.join("platform-tools").join(ADB_BINARY);
            if candidate.exists() {
                return Ok(Self::new(candidate));
            }
        }

        which::which(ADB_BINARY)
            .map(Self::new)
            .map_err(|_| AdbError::NotFound)
    }

    /// Path of the adb executable in use
    pub fn adb_path(&self) -> &Path {
        &self.adb
    }
}

#[async_trait]
impl AdbExecutor for ProcessExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, AdbError> {
        let output = Command::new(&self.adb)
            .args(args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AdbError::NotFound,
                _ => AdbError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdbError::CommandFailed(format!(
                "adb {}: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Anything that can enumerate attached devices
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// All attached devices in discovery order
    async fn connected_devices(&self) -> Result<Vec<Device>, AdbError>;
}

/// Attached devices that are ready for commands
pub async fn filter_online<S>(source: &S) -> Result<Vec<Device>, AdbError>
where
    S: DeviceSource + ?Sized,
{
    let devices = source.connected_devices().await?;
    Ok(devices.into_iter().filter(|d| d.is_online).collect())
}

/// Parse `adb devices` output, keeping input order.
///
/// Lines that are not `<id>\t<status>` (banner, blank lines, daemon
/// chatter) are skipped.
pub fn parse_device_list(output: &str) -> Vec<Device> {
    output
        .lines()
        .filter_map(|line| DEVICE_LINE.captures(line))
        .map(|caps| Device::new(&caps[1], &caps[2] == "device"))
        .collect()
}

/// Prefix `args` with `-s <id>` when a device is targeted
fn scoped(target: Option<&str>, args: &[&str]) -> Vec<String> {
    let mut full_args = Vec::with_capacity(args.len() + 2);
    if let Some(serial) = target {
        full_args.push("-s".to_string());
        full_args.push(serial.to_string());
    }
    full_args.extend(args.iter().map(|s| s.to_string()));
    full_args
}

/// ADB Client
#[derive(Clone)]
pub struct AdbClient {
    executor: Arc<dyn AdbExecutor>,
}

impl AdbClient {
    /// Create a client over any executor
    pub fn new(executor: impl AdbExecutor + 'static) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    /// Create a client backed by the adb binary
    pub fn locate(sdk_path: Option<&Path>, adb_override: Option<&Path>) -> Result<Self, AdbError> {
        let executor = ProcessExecutor::locate(sdk_path, adb_override)?;
        info!("Using adb at {:?}", executor.adb_path());
        Ok(Self::new(executor))
    }

    async fn run(&self, args: Vec<String>) -> Result<String, AdbError> {
        debug!("adb {}", args.join(" "));
        self.executor.exec(&args).await
    }

    /// List attached devices
    pub async fn list_devices(&self) -> Result<Vec<Device>, AdbError> {
        let output = self.run(scoped(None, &["devices"])).await?;
        Ok(parse_device_list(&output))
    }

    /// Query the device's API level
    pub async fn api_version(&self, device_id: &str) -> Result<ApiLevel, AdbError> {
        let output = self
            .run(scoped(Some(device_id), &["shell", "getprop", "ro.build.version.sdk"]))
            .await?;
        let value = output.trim();
        value
            .parse()
            .map(ApiLevel)
            .map_err(|_| AdbError::Parse(format!("API level of {} is not an integer: {:?}", device_id, value)))
    }

    /// Reverse-forward a device port to a host port
    pub async fn reverse_add(&self, device_id: &str, device_port: u16, computer_port: u16) -> Result<(), AdbError> {
        let remote = format!("tcp:{}", device_port);
        let local = format!("tcp:{}", computer_port);
        self.run(scoped(Some(device_id), &["reverse", &remote, &local])).await?;
        Ok(())
    }

    /// Start the main activity of a package
    pub async fn launch_app(&self, package: &str, target: Option<&str>) -> Result<(), AdbError> {
        let component = format!("{}/.MainActivity", package);
        self.run(scoped(target, &["shell", "am", "start", "-n", &component])).await?;
        Ok(())
    }

    /// Broadcast the reload intent that switches the app to the JS debug proxy
    pub async fn reload_app_in_debug_mode(&self, package: &str, target: Option<&str>) -> Result<(), AdbError> {
        let action = format!("{}.RELOAD_APP_ACTION", package);
        self.run(scoped(
            target,
            &["shell", "am", "broadcast", "-a", &action, "--ez", "jsproxy", "true"],
        ))
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceSource for AdbClient {
    async fn connected_devices(&self) -> Result<Vec<Device>, AdbError> {
        self.list_devices().await
    }
}
