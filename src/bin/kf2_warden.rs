use anyhow::{Context, Result};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use kf2_warden::config::FleetConfig;
use kf2_warden::console::HttpConsole;
use kf2_warden::fleet::FleetController;
use kf2_warden::scheduler::{self, StopReason};

fn init_logging(log_file: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file: {}", path))?;
            tracing_subscriber::fmt()
                .with_ansi(false)
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let mut conf_file = "conf/fleet.yaml".to_string();
    let mut log_file: Option<String> = None;
    let mut once = false;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "--h" | "--?" | "/?" => {
                println!("Usage: kf2_warden [--conf FILE] [--log-file FILE] [--once]");
                return Ok(());
            }
            "--conf" => {
                if i + 1 < args.len() {
                    i += 1;
                    conf_file = args[i].clone();
                } else {
                    return Err(anyhow::anyhow!("--conf requires a FILE argument"));
                }
            }
            "--log-file" => {
                if i + 1 < args.len() {
                    i += 1;
                    log_file = Some(args[i].clone());
                } else {
                    return Err(anyhow::anyhow!("--log-file requires a FILE argument"));
                }
            }
            "--once" => once = true,
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    init_logging(log_file.as_deref())?;

    let config = FleetConfig::from_file(&conf_file)
        .with_context(|| format!("Cannot load config: {}", conf_file))?;

    let mut controller = FleetController::from_config(HttpConsole::new(), &config)?;

    tracing::info!(
        "[warden] [started] managing {} servers, checking every {}s",
        controller.targets().len(),
        config.check_interval
    );

    if once {
        controller
            .run_tick()
            .await
            .context("WebAdmin console contract broken")?;
        return Ok(());
    }

    let reason = scheduler::run_fleet(&mut controller, config.check_interval(), scheduler::ctrl_c())
        .await
        .context("WebAdmin console contract broken")?;

    match reason {
        StopReason::FleetRetired => tracing::info!("[warden] [stopped] no active servers left"),
        StopReason::Interrupted => tracing::info!("[warden] [stopped] interrupted"),
    }

    Ok(())
}
