//! RN-Droid
//!
//! Entry point: sets up logging, loads the configuration and runs a command.
//!
//! ```text
//! rn-droid devices
//! rn-droid run [project-dir] [--device <id>]
//! ```

use std::path::PathBuf;
use anyhow::{anyhow, bail, Result};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rn_droid::commands::{DevicesCommand, RunCommand};
use rn_droid_core::{AppConfig, DebugError, APP_NAME, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} starting...", APP_NAME, VERSION);
    let config = AppConfig::load().await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("devices") => DevicesCommand.execute(&config).await,
        Some("run") => match parse_run(&args[1..]) {
            Ok(command) => command.execute(&config).await,
            Err(err) => Err(err),
        },
        Some(other) => Err(anyhow!("Unknown command: {}", other)),
        None => {
            println!("Usage: rn-droid <devices | run [project-dir] [--device <id>]>");
            Ok(())
        }
    };

    if let Err(ref err) = result {
        if let Some(session_err) = err.downcast_ref::<DebugError>() {
            error!("{}", session_err.user_message());
        }
    }
    result
}

fn parse_run(args: &[String]) -> Result<RunCommand> {
    let mut project_path = None;
    let mut device = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--device" | "-s" => match iter.next() {
                Some(id) => device = Some(id.clone()),
                None => bail!("{} needs a device id", arg),
            },
            path if project_path.is_none() => project_path = Some(PathBuf::from(path)),
            extra => bail!("Unexpected argument: {}", extra),
        }
    }

    let project_path = match project_path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    Ok(RunCommand { project_path, device })
}
