use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{ForegroundApp, ForegroundSource};

const FRONTMOST_SCRIPT: &str = r#"
    tell application "System Events"
        set frontProc to first application process whose frontmost is true
        return (bundle identifier of frontProc) & "|" & (name of frontProc)
    end tell
"#;

pub struct MacOSMonitor;

impl MacOSMonitor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for MacOSMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `bundle_id|name` as printed by the frontmost-app script
#[must_use]
pub fn parse_frontmost(output: &str) -> Option<(String, String)> {
    let (bundle_id, name) = output.trim().split_once('|')?;
    if bundle_id.is_empty() || bundle_id == "missing value" {
        return None;
    }
    Some((bundle_id.to_string(), name.to_string()))
}

#[async_trait]
impl ForegroundSource for MacOSMonitor {
    async fn start_monitoring(&mut self) -> Result<()> {
        log::info!("Started macOS foreground monitoring");
        Ok(())
    }

    async fn foreground_app(&self) -> Result<Option<ForegroundApp>> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(FRONTMOST_SCRIPT)
            .output()
            .await
            .context("Failed to run osascript")?;

        if !output.status.success() {
            log::debug!(
                "osascript failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_frontmost(&stdout).map(|(app_id, app_name)| ForegroundApp {
            app_id,
            app_name,
        }))
    }

    async fn stop_monitoring(&mut self) -> Result<()> {
        log::info!("Stopped macOS foreground monitoring");
        Ok(())
    }
}
