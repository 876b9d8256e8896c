use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{ForegroundApp, ForegroundSource};

/// Reads the focused X11 window's process via `xdotool` and `/proc`
pub struct LinuxMonitor;

impl LinuxMonitor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn focused_pid() -> Result<Option<u32>> {
        let output = Command::new("xdotool")
            .args(["getactivewindow", "getwindowpid"])
            .output()
            .await
            .context("Failed to run xdotool")?;

        if !output.status.success() {
            // No focused window, e.g. on an empty desktop
            return Ok(None);
        }

        Ok(parse_pid(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl Default for LinuxMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the pid printed by `xdotool getwindowpid`
#[must_use]
pub fn parse_pid(output: &str) -> Option<u32> {
    output.trim().parse().ok().filter(|pid| *pid > 0)
}

/// Process name from the contents of `/proc/<pid>/comm`
#[must_use]
pub fn parse_comm(contents: &str) -> Option<String> {
    let name = contents.trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[async_trait]
impl ForegroundSource for LinuxMonitor {
    async fn start_monitoring(&mut self) -> Result<()> {
        log::info!("Started Linux foreground monitoring");
        Ok(())
    }

    async fn foreground_app(&self) -> Result<Option<ForegroundApp>> {
        let Some(pid) = Self::focused_pid().await? else {
            return Ok(None);
        };

        let comm = tokio::fs::read_to_string(format!("/proc/{pid}/comm"))
            .await
            .with_context(|| format!("Failed to read process name for pid {pid}"))?;

        Ok(parse_comm(&comm).map(|name| ForegroundApp {
            app_id: name.clone(),
            app_name: name,
        }))
    }

    async fn stop_monitoring(&mut self) -> Result<()> {
        log::info!("Stopped Linux foreground monitoring");
        Ok(())
    }
}
