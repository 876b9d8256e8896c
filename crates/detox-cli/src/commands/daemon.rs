/// Daemon lifecycle management commands
use anyhow::{Context, Result};
use detox_core::{
    config::{get_data_dir, log_file_path, pid_file_path, socket_path},
    ipc::{IpcClient, IpcRequest, IpcResponse},
    status::format_elapsed,
    Daemon, EngineConfig,
};
use detox_storage::Database;
use std::{env, fs, io, process::Command, thread::sleep, time};
use sysinfo::{Pid, System};

use super::helpers::truncate_str;

/// Turn monitoring on and launch the daemon
pub fn start_daemon() -> Result<()> {
    let db = Database::new(None)?;
    let mut settings = db.get_settings()?;
    if settings.watched_apps.is_empty() {
        println!("No watched apps yet. Add some with: detox apps add <APP_ID>");
    }
    if !settings.monitoring_enabled {
        settings.monitoring_enabled = true;
        db.update_settings(&settings)?;
    }
    spawn_daemon()
}

/// Relaunch the daemon only if monitoring was left on
pub fn resume_daemon() -> Result<()> {
    let settings = Database::new(None)?.get_settings()?;
    if settings.monitoring_enabled {
        log::info!("Monitoring was enabled, resuming daemon.");
        spawn_daemon()
    } else {
        println!("Monitoring is off. Run `detox start` to turn it on.");
        Ok(())
    }
}

fn spawn_daemon() -> Result<()> {
    let pid_file_path = pid_file_path()?;
    let sock_path = socket_path()?;

    if pid_file_path.exists() {
        if let Ok(pid_str) = fs::read_to_string(&pid_file_path) {
            if let Ok(pid) = pid_str.trim().parse::<usize>() {
                let mut sys = System::new();
                if sys.refresh_process(Pid::from(pid)) {
                    log::info!("Daemon is already running (PID: {pid}).");
                    return Ok(());
                }
            }
        }
        log::warn!("Removing stale PID file.");
        let _ = fs::remove_file(&pid_file_path);
    }

    if sock_path.exists() {
        log::warn!("Removing stale socket file.");
        fs::remove_file(&sock_path)?;
    }

    let data_dir = get_data_dir()?;
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    log::info!("Starting Social Detox daemon...");

    let current_exe = env::current_exe()?;
    let current_dir = env::current_dir()?;
    let child = Command::new(current_exe)
        .arg("daemon-internal-start")
        .current_dir(current_dir)
        .spawn()?;

    log::info!("Daemon process started with PID: {}", child.id());
    fs::write(&pid_file_path, child.id().to_string())?;

    Ok(())
}

pub async fn run_daemon_process() -> Result<()> {
    // Detached process: nothing to report to but the log file
    setup_daemon_logging().context("Failed to set up daemon logging")?;
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic().await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

async fn daemon_main_logic() -> Result<()> {
    let db = Database::new(None)?;
    let mut daemon = Daemon::new(db, EngineConfig::default())?;
    daemon.run_with_signals().await
}

/// Turn monitoring off and stop the daemon
pub async fn stop_daemon() -> Result<()> {
    let db = Database::new(None)?;
    let mut settings = db.get_settings()?;
    if settings.monitoring_enabled {
        settings.monitoring_enabled = false;
        db.update_settings(&settings)?;
    }

    let pid_file_path = pid_file_path()?;
    let sock_path = socket_path()?;

    if !pid_file_path.exists() {
        log::info!("Daemon is not running (no PID file).");
        if sock_path.exists() {
            fs::remove_file(&sock_path)?;
        }
        return Ok(());
    }

    let pid_str = fs::read_to_string(&pid_file_path)?;
    let pid = pid_str
        .trim()
        .parse::<usize>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    log::info!("Stopping Social Detox daemon (PID: {pid})...");
    let client = IpcClient::new(&sock_path);

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
            sleep(time::Duration::from_secs(2));

            if !kill_if_running(pid) {
                log::info!("Daemon stopped successfully.");
            }
        }
        Ok(resp) => log::error!("Received unexpected response from daemon: {resp:?}"),
        Err(e) => {
            log::error!("Failed to send shutdown command: {e}. Forcing cleanup.");
            kill_if_running(pid);
        }
    }

    fs::remove_file(&pid_file_path)?;
    if sock_path.exists() {
        fs::remove_file(&sock_path)?;
    }

    Ok(())
}

/// Force-kill `pid` if it is still alive; returns whether it was
fn kill_if_running(pid: usize) -> bool {
    let mut sys = System::new();
    if !sys.refresh_process(Pid::from(pid)) {
        return false;
    }
    log::warn!("Daemon did not stop gracefully. Force killing...");
    if let Some(process) = sys.process(Pid::from(pid)) {
        process.kill();
    }
    true
}

pub async fn show_status() -> Result<()> {
    let settings = Database::new(None)?.get_settings()?;
    println!(
        "Monitoring: {}",
        if settings.monitoring_enabled {
            "ENABLED"
        } else {
            "DISABLED"
        }
    );
    println!(
        "Limit: {} minutes, {} watched app(s)",
        settings.time_limit_minutes,
        settings.watched_apps.len()
    );

    let sock_path = socket_path()?;
    if !sock_path.exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    let client = IpcClient::new(&sock_path);
    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status {
            running,
            foreground_app,
            elapsed_seconds,
            limit_reached,
            on_break,
            status,
        }) => {
            println!(
                "Daemon Status: {}",
                if running { "Running" } else { "Stopped" }
            );
            println!("\n{}", status.title);
            println!("  {}", status.text);
            println!(
                "\nForeground app: {}",
                foreground_app.map_or_else(|| "Unknown".to_string(), |app| truncate_str(&app, 40))
            );
            println!("Uninterrupted time: {}", format_elapsed(elapsed_seconds));
            println!("Limit reached: {}", if limit_reached { "yes" } else { "no" });
            println!("On break: {}", if on_break { "yes" } else { "no" });
        }
        Ok(_) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

fn setup_daemon_logging() -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    let log_path = log_file_path()?;

    if let Some(parent) = log_path.parent() {
        create_dir_all(parent)?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();

    Ok(())
}
