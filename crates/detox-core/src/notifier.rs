//! Where interventions and status text end up.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use crate::scheduler::Intervention;
use crate::status::StatusUpdate;

/// Shows a reminder to the user
#[async_trait]
pub trait InterventionSink: Send + Sync {
    async fn present(&self, intervention: &Intervention) -> Result<()>;
}

/// Receives the status text after every tick
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn update_status(&self, status: &StatusUpdate);
}

/// Writes interventions to the log only
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl InterventionSink for LogNotifier {
    async fn present(&self, intervention: &Intervention) -> Result<()> {
        log::info!("{}", render_log_line(intervention));
        Ok(())
    }
}

/// Desktop notifications through `notify-send` or `osascript`,
/// logging instead when neither is usable.
#[derive(Debug, Default)]
pub struct DesktopNotifier {
    fallback: LogNotifier,
}

impl DesktopNotifier {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fallback: LogNotifier,
        }
    }

    async fn send(intervention: &Intervention) -> Result<()> {
        let body = notification_body(intervention);

        let mut command = if cfg!(target_os = "macos") {
            let script = format!(
                "display notification {} with title {}",
                applescript_quote(&body),
                applescript_quote(&intervention.title)
            );
            let mut cmd = Command::new("osascript");
            cmd.arg("-e").arg(script);
            cmd
        } else {
            let mut cmd = Command::new("notify-send");
            cmd.args(["--app-name", "Social Detox"])
                .arg(&intervention.title)
                .arg(&body);
            cmd
        };

        let status = command
            .status()
            .await
            .context("Failed to launch notification command")?;
        if !status.success() {
            anyhow::bail!("Notification command exited with {status}");
        }
        Ok(())
    }
}

#[async_trait]
impl InterventionSink for DesktopNotifier {
    async fn present(&self, intervention: &Intervention) -> Result<()> {
        if let Err(e) = Self::send(intervention).await {
            log::warn!("Desktop notification failed, logging instead: {e:#}");
            return self.fallback.present(intervention).await;
        }
        Ok(())
    }
}

/// Notification body, subheading first when present
#[must_use]
pub fn notification_body(intervention: &Intervention) -> String {
    match &intervention.subheading {
        Some(subheading) => format!("{subheading}: {}", intervention.body),
        None => intervention.body.clone(),
    }
}

fn render_log_line(intervention: &Intervention) -> String {
    format!(
        "[{:?}] {} - {}",
        intervention.variant,
        intervention.title,
        notification_body(intervention)
    )
}

/// Quote a string as an AppleScript literal
#[must_use]
pub fn applescript_quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Sink used by the daemon
#[must_use]
pub fn create_notifier() -> Box<dyn InterventionSink> {
    Box::new(DesktopNotifier::new())
}
