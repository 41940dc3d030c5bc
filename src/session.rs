//! Session Orchestrator
//!
//! Drives one debug run:
//! - build and install the app
//! - resolve its package identity
//! - pick a device when more than one is attached
//! - launch the app and switch it into debug-proxy mode

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use rn_droid_build_engine::{AppInstaller, ReactNativeRunner};
use rn_droid_core::{Event, EventBus, Result};
use rn_droid_emulator_bridge::{AdbClient, Device, DeviceSource};
use rn_droid_manifest_manager::{AppManifest, PackageJson, PackageNameResolution, PackageNameResolver};

/// The resolved debug session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub project_root: PathBuf,
    /// Installed Android package
    pub package_name: String,
    /// `None` when a single device makes scoping unnecessary
    pub device_id: Option<String>,
}

/// Pick the device to scope commands to.
///
/// With fewer than two devices nothing is returned, so commands go out
/// without `-s`. Otherwise the preferred id wins if it is online, then the
/// first online device in discovery order.
pub fn select_target(preferred: Option<&str>, devices: &[Device]) -> Option<String> {
    if devices.len() < 2 {
        return None;
    }

    if let Some(id) = preferred {
        if devices.iter().any(|d| d.id == id && d.is_online) {
            return Some(id.to_string());
        }
        debug!("Preferred device {} is not attached or offline", id);
    }

    devices.iter().find(|d| d.is_online).map(|d| d.id.clone())
}

/// Session orchestrator
pub struct SessionOrchestrator {
    adb: AdbClient,
    installer: Box<dyn AppInstaller>,
    manifest: Box<dyn AppManifest>,
    resolver: Box<dyn PackageNameResolution>,
    events: Arc<EventBus>,
}

impl SessionOrchestrator {
    pub fn new(
        adb: AdbClient,
        installer: impl AppInstaller + 'static,
        manifest: impl AppManifest + 'static,
        resolver: impl PackageNameResolution + 'static,
    ) -> Self {
        Self {
            adb,
            installer: Box::new(installer),
            manifest: Box::new(manifest),
            resolver: Box::new(resolver),
            events: Arc::new(EventBus::new()),
        }
    }

    /// React Native CLI build, `package.json` name, manifest package lookup
    pub fn with_defaults(adb: AdbClient) -> Self {
        Self::new(adb, ReactNativeRunner::new(), PackageJson, PackageNameResolver)
    }

    /// Publish session events on a shared bus
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn adb(&self) -> &AdbClient {
        &self.adb
    }

    /// Build, install and (when several devices are attached) launch the app.
    ///
    /// The first failing step aborts the run.
    pub async fn run_session(&self, project_root: &Path, preference: Option<&str>) -> Result<SessionTarget> {
        info!("Building and installing {:?}", project_root);
        self.installer.build_and_install(project_root).await?;

        let app_name = self.manifest.app_name(project_root).await?;
        let package_name = self.resolver.resolve_package_name(&app_name, project_root).await?;
        info!("App {} resolved to package {}", app_name, package_name);

        let devices = self.adb.connected_devices().await?;
        self.events.emit(Event::DevicesDiscovered { count: devices.len() });

        let device_id = select_target(preference, &devices);
        self.events.emit(Event::TargetSelected { device_id: device_id.clone() });

        // Only set when two or more devices are attached; a lone device was
        // already started by the install step.
        if let Some(ref id) = device_id {
            info!("Launching {} on {}", package_name, id);
            self.adb.launch_app(&package_name, Some(id)).await?;
            self.events.emit(Event::AppLaunched {
                package: package_name.clone(),
                device_id: id.clone(),
            });
        }

        Ok(SessionTarget {
            project_root: project_root.to_path_buf(),
            package_name,
            device_id,
        })
    }

    /// Ask the running app to load its scripts through the debugger proxy
    pub async fn enable_debug_mode(&self, target: &SessionTarget) -> Result<()> {
        info!("Enabling JS debugging for {}", target.package_name);
        self.adb
            .reload_app_in_debug_mode(&target.package_name, target.device_id.as_deref())
            .await?;
        self.events.emit(Event::DebugModeEnabled {
            package: target.package_name.clone(),
            device_id: target.device_id.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rn_droid_build_engine::BuildError;
    use rn_droid_core::ErrorKind;
    use rn_droid_emulator_bridge::{AdbError, AdbExecutor};
    use rn_droid_manifest_manager::ResolveError;

    type Calls = Arc<Mutex<Vec<Vec<String>>>>;

    /// Answers `devices` with a canned listing, records every call and
    /// fails any call that contains `fail_on`
    struct FakeAdb {
        listing: String,
        fail_on: Option<&'static str>,
        calls: Calls,
    }

    #[async_trait]
    impl AdbExecutor for FakeAdb {
        async fn exec(&self, args: &[String]) -> std::result::Result<String, AdbError> {
            self.calls.lock().push(args.to_vec());
            if let Some(word) = self.fail_on {
                if args.iter().any(|a| a == word) {
                    return Err(AdbError::CommandFailed(format!("adb {} exited with 1", word)));
                }
            }
            if args.len() == 1 && args[0] == "devices" {
                Ok(self.listing.clone())
            } else {
                Ok(String::new())
            }
        }
    }

    struct FakeInstaller {
        fail: bool,
    }

    #[async_trait]
    impl AppInstaller for FakeInstaller {
        async fn build_and_install(&self, _project_root: &Path) -> std::result::Result<(), BuildError> {
            if self.fail {
                Err(BuildError::BuildFailed("gradle exited with 1".into()))
            } else {
                Ok(())
            }
        }
    }

    struct FakeManifest {
        fail: bool,
    }

    #[async_trait]
    impl AppManifest for FakeManifest {
        async fn app_name(&self, project_root: &Path) -> std::result::Result<String, ResolveError> {
            if self.fail {
                Err(ResolveError::PackageJsonNotFound(project_root.display().to_string()))
            } else {
                Ok("AwesomeApp".into())
            }
        }
    }

    struct FakeResolver {
        package: Option<&'static str>,
    }

    #[async_trait]
    impl PackageNameResolution for FakeResolver {
        async fn resolve_package_name(
            &self,
            app_name: &str,
            _project_root: &Path,
        ) -> std::result::Result<String, ResolveError> {
            self.package
                .map(str::to_string)
                .ok_or_else(|| ResolveError::Unresolvable(app_name.to_string()))
        }
    }

    fn fake_adb(listing: &str, fail_on: Option<&'static str>) -> (AdbClient, Calls) {
        let calls = Calls::default();
        let adb = AdbClient::new(FakeAdb {
            listing: listing.to_string(),
            fail_on,
            calls: Arc::clone(&calls),
        });
        (adb, calls)
    }

    fn orchestrator(listing: &str) -> (SessionOrchestrator, Calls) {
        let (adb, calls) = fake_adb(listing, None);
        let orchestrator = SessionOrchestrator::new(
            adb,
            FakeInstaller { fail: false },
            FakeManifest { fail: false },
            FakeResolver { package: Some("com.awesomeapp") },
        );
        (orchestrator, calls)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_target_single_device() {
        let devices = vec![Device::new("A", true)];
        assert_eq!(select_target(Some("A"), &devices), None);
        assert_eq!(select_target(None, &[]), None);
    }

    #[test]
    fn test_select_target_preference() {
        let devices = vec![Device::new("A", true), Device::new("B", true)];
        assert_eq!(select_target(Some("B"), &devices), Some("B".into()));
        assert_eq!(select_target(Some("Z"), &devices), Some("A".into()));
        assert_eq!(select_target(None, &devices), Some("A".into()));
    }

    #[test]
    fn test_select_target_skips_offline() {
        let devices = vec![Device::new("A", false), Device::new("B", false), Device::new("C", true)];
        assert_eq!(select_target(Some("A"), &devices), Some("C".into()));

        let all_offline = vec![Device::new("A", false), Device::new("B", false)];
        assert_eq!(select_target(None, &all_offline), None);
    }

    #[tokio::test]
    async fn test_single_device_is_not_launched() {
        let (orchestrator, calls) = orchestrator("List of devices attached\nemulator-5554\tdevice\n");
        let target = orchestrator.run_session(Path::new("/work/app"), None).await.unwrap();

        assert_eq!(target.device_id, None);
        assert_eq!(target.package_name, "com.awesomeapp");
        assert_eq!(calls.lock().as_slice(), &[args(&["devices"])]);
    }

    #[tokio::test]
    async fn test_multiple_devices_launch_scoped() {
        let (orchestrator, calls) = orchestrator("List of devices attached\nA\tdevice\nB\tdevice\n");
        let events = orchestrator.events().subscribe();

        let target = orchestrator.run_session(Path::new("/work/app"), Some("B")).await.unwrap();
        assert_eq!(target.device_id.as_deref(), Some("B"));
        assert_eq!(
            calls.lock().as_slice(),
            &[
                args(&["devices"]),
                args(&["-s", "B", "shell", "am", "start", "-n", "com.awesomeapp/.MainActivity"]),
            ]
        );
        assert_eq!(
            events.drain(),
            vec![
                Event::DevicesDiscovered { count: 2 },
                Event::TargetSelected { device_id: Some("B".into()) },
                Event::AppLaunched { package: "com.awesomeapp".into(), device_id: "B".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_no_online_device_among_many() {
        let (orchestrator, calls) = orchestrator("A\toffline\nB\tunauthorized\n");
        let target = orchestrator.run_session(Path::new("/work/app"), None).await.unwrap();

        assert_eq!(target.device_id, None);
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_enable_debug_mode_uses_target() {
        let (orchestrator, calls) = orchestrator("A\tdevice\nB\tdevice\n");
        let target = orchestrator.run_session(Path::new("/work/app"), None).await.unwrap();
        orchestrator.enable_debug_mode(&target).await.unwrap();

        let last = calls.lock().last().cloned().unwrap();
        assert_eq!(
            last,
            args(&["-s", "A", "shell", "am", "broadcast", "-a", "com.awesomeapp.RELOAD_APP_ACTION", "--ez", "jsproxy", "true"])
        );
    }

    #[tokio::test]
    async fn test_enable_debug_mode_unscoped() {
        let (orchestrator, calls) = orchestrator("A\tdevice\n");
        let target = SessionTarget {
            project_root: PathBuf::from("/work/app"),
            package_name: "com.awesomeapp".into(),
            device_id: None,
        };
        orchestrator.enable_debug_mode(&target).await.unwrap();

        assert_eq!(calls.lock()[0][0], "shell");
    }

    #[tokio::test]
    async fn test_build_failure_aborts() {
        let (adb, calls) = fake_adb("A\tdevice\n", None);
        let orchestrator = SessionOrchestrator::new(
            adb,
            FakeInstaller { fail: true },
            FakeManifest { fail: false },
            FakeResolver { package: Some("com.awesomeapp") },
        );

        let err = orchestrator.run_session(Path::new("/work/app"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTool);
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_manifest_failure_aborts() {
        let (adb, calls) = fake_adb("A\tdevice\nB\tdevice\n", None);
        let orchestrator = SessionOrchestrator::new(
            adb,
            FakeInstaller { fail: false },
            FakeManifest { fail: true },
            FakeResolver { package: Some("com.awesomeapp") },
        );

        let err = orchestrator.run_session(Path::new("/work/app"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_resolution_failure_aborts() {
        let (adb, calls) = fake_adb("A\tdevice\n", None);
        let orchestrator = SessionOrchestrator::new(
            adb,
            FakeInstaller { fail: false },
            FakeManifest { fail: false },
            FakeResolver { package: None },
        );

        let err = orchestrator.run_session(Path::new("/work/app"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_device_listing_failure_aborts() {
        let (adb, calls) = fake_adb("A\tdevice\nB\tdevice\n", Some("devices"));
        let orchestrator = SessionOrchestrator::new(
            adb,
            FakeInstaller { fail: false },
            FakeManifest { fail: false },
            FakeResolver { package: Some("com.awesomeapp") },
        );
        let events = orchestrator.events().subscribe();

        let err = orchestrator.run_session(Path::new("/work/app"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTool);
        assert_eq!(calls.lock().as_slice(), &[args(&["devices"])]);
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn test_launch_failure_aborts() {
        let (adb, calls) = fake_adb("A\tdevice\nB\tdevice\n", Some("start"));
        let orchestrator = SessionOrchestrator::new(
            adb,
            FakeInstaller { fail: false },
            FakeManifest { fail: false },
            FakeResolver { package: Some("com.awesomeapp") },
        );
        let events = orchestrator.events().subscribe();

        let err = orchestrator.run_session(Path::new("/work/app"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTool);
        assert_eq!(calls.lock().len(), 2);

        let emitted = events.drain();
        assert!(!emitted.iter().any(|e| matches!(e, Event::AppLaunched { .. })));
        assert_eq!(emitted.last(), Some(&Event::TargetSelected { device_id: Some("A".into()) }));
    }
}
