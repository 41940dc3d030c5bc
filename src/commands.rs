//! CLI commands for RN-Droid
//!
//! Thin drivers that wire configuration into the device registry, the
//! session orchestrator and the debugger relay.

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;
use tracing::{debug, info, warn};

use rn_droid_core::{AppConfig, Event, EventSubscription};
use rn_droid_debugger_relay::{
    DebuggerRelay, Dispatcher, RelayOptions, ScriptAckPolicy, ScriptDownloader, ScriptRuntime,
};
use rn_droid_emulator_bridge::{filter_online, AdbClient};

use crate::session::{SessionOrchestrator, SessionTarget};

fn adb_client(config: &AppConfig) -> Result<AdbClient> {
    let sdk_path = config.get_sdk_path();
    let adb = AdbClient::locate(sdk_path.as_deref(), config.android.adb_path.as_deref())?;
    Ok(adb)
}

/// Device list command
pub struct DevicesCommand;

impl DevicesCommand {
    /// List all attached devices
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let adb = adb_client(config)?;
        let devices = adb.list_devices().await?;

        if devices.is_empty() {
            println!("No devices attached");
        } else {
            println!("Attached devices:");
            for device in devices {
                println!("  {}", device);
            }
        }

        Ok(())
    }
}

/// Run command options
pub struct RunCommand {
    pub project_path: PathBuf,
    /// Overrides `session.target` from the config
    pub device: Option<String>,
}

impl RunCommand {
    /// Build, launch, relay, and stay attached until Ctrl-C
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let adb = adb_client(config)?;
        let orchestrator = SessionOrchestrator::with_defaults(adb.clone());
        let progress = log_session_events(orchestrator.events().subscribe());
        let preference = self.device.as_deref().or(config.session.target.as_deref());

        let target = orchestrator.run_session(&self.project_path, preference).await?;
        forward_packager_port(&adb, &target, config.packager.port).await?;

        let downloader = ScriptDownloader::new(&target.project_root);
        info!("Debugger scripts are stored in {:?}", downloader.cache_dir());
        let runtime = Arc::new(ScriptRuntime::new(downloader));
        let dispatcher = Dispatcher::new(runtime)
            .with_script_policy(ScriptAckPolicy::from_config(&config.relay));
        let relay = DebuggerRelay::new(RelayOptions::from_config(config), dispatcher).start();

        orchestrator.enable_debug_mode(&target).await?;
        info!("Debug session for {} is running, press Ctrl-C to stop", target.package_name);

        let stopper = relay.abort_handle();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => stopper.abort(),
            result = relay.join() => result?,
        }

        orchestrator.events().emit(Event::Shutdown);
        let _ = progress.await;
        Ok(())
    }
}

/// Log session events until `Shutdown` or until the bus goes away
fn log_session_events(events: EventSubscription) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while let Ok(event) = events.recv() {
            match event {
                Event::DevicesDiscovered { count } => info!("{} device(s) attached", count),
                Event::TargetSelected { device_id: Some(id) } => info!("Targeting device {}", id),
                Event::TargetSelected { device_id: None } => debug!("No device scoping needed"),
                Event::AppLaunched { package, device_id } => info!("Launched {} on {}", package, device_id),
                Event::DebugModeEnabled { package, .. } => info!("{} switched to the debugger proxy", package),
                Event::Shutdown => break,
            }
        }
    })
}

/// Let the device reach the host packager over `adb reverse`.
///
/// Without a selected target the first online device is used.
async fn forward_packager_port(adb: &AdbClient, target: &SessionTarget, port: u16) -> Result<()> {
    let device_id = match target.device_id.clone() {
        Some(id) => Some(id),
        None => filter_online(adb).await?.into_iter().next().map(|d| d.id),
    };
    let Some(device_id) = device_id else {
        warn!("No online device to forward port {} to", port);
        return Ok(());
    };

    let api = adb.api_version(&device_id).await?;
    if api.supports_reverse() {
        adb.reverse_add(&device_id, port, port).await?;
        info!("Forwarded device port {} to the packager", port);
    } else {
        warn!("{} runs API {}, adb reverse is unavailable", device_id, api);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rn_droid_emulator_bridge::{AdbError, AdbExecutor};

    type Calls = Arc<Mutex<Vec<Vec<String>>>>;

    /// Scripted adb: a device listing and one API level for every device
    struct ScriptedAdb {
        listing: &'static str,
        api_level: &'static str,
        calls: Calls,
    }

    #[async_trait]
    impl AdbExecutor for ScriptedAdb {
        async fn exec(&self, args: &[String]) -> std::result::Result<String, AdbError> {
            self.calls.lock().push(args.to_vec());
            if args.iter().any(|a| a == "devices") {
                Ok(self.listing.to_string())
            } else if args.iter().any(|a| a == "getprop") {
                Ok(format!("{}\r\n", self.api_level))
            } else {
                Ok(String::new())
            }
        }
    }

    fn adb(listing: &'static str, api_level: &'static str) -> (AdbClient, Calls) {
        let calls = Calls::default();
        let client = AdbClient::new(ScriptedAdb {
            listing,
            api_level,
            calls: Arc::clone(&calls),
        });
        (client, calls)
    }

    fn target(device_id: Option<&str>) -> SessionTarget {
        SessionTarget {
            project_root: PathBuf::from("/work/app"),
            package_name: "com.awesomeapp".into(),
            device_id: device_id.map(str::to_string),
        }
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_reverse_on_lollipop_and_later() {
        let (adb, calls) = adb("A\tdevice\nB\tdevice\n", "23");
        forward_packager_port(&adb, &target(Some("B")), 8081).await.unwrap();

        assert_eq!(
            calls.lock().as_slice(),
            &[
                args(&["-s", "B", "shell", "getprop", "ro.build.version.sdk"]),
                args(&["-s", "B", "reverse", "tcp:8081", "tcp:8081"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_reverse_before_lollipop() {
        let (adb, calls) = adb("A\tdevice\n", "19");
        forward_packager_port(&adb, &target(Some("A")), 8081).await.unwrap();

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(!calls.iter().any(|c| c.contains(&"reverse".to_string())));
    }

    #[tokio::test]
    async fn test_untargeted_session_uses_online_device() {
        let (adb, calls) = adb("List of devices attached\nX\toffline\nemulator-5554\tdevice\n", "28");
        forward_packager_port(&adb, &target(None), 8081).await.unwrap();

        assert_eq!(
            calls.lock().as_slice(),
            &[
                args(&["devices"]),
                args(&["-s", "emulator-5554", "shell", "getprop", "ro.build.version.sdk"]),
                args(&["-s", "emulator-5554", "reverse", "tcp:8081", "tcp:8081"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_online_device_skips_reverse() {
        let (adb, calls) = adb("List of devices attached\nX\tunauthorized\n", "28");
        forward_packager_port(&adb, &target(None), 8081).await.unwrap();

        assert_eq!(calls.lock().as_slice(), &[args(&["devices"])]);
    }

    #[tokio::test]
    async fn test_event_logger_stops_on_shutdown() {
        let bus = rn_droid_core::EventBus::new();
        let logger = log_session_events(bus.subscribe());
        bus.emit(Event::DevicesDiscovered { count: 1 });
        bus.emit(Event::Shutdown);

        tokio::time::timeout(std::time::Duration::from_secs(5), logger)
            .await
            .unwrap()
            .unwrap();
    }
}
