use anyhow::Result;
use async_trait::async_trait;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

/// The application currently in front of the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundApp {
    /// Stable identifier matched against the watch list
    pub app_id: String,
    pub app_name: String,
}

/// Platform source of foreground-app observations
#[async_trait]
pub trait ForegroundSource: Send + Sync {
    /// Start observing the foreground app
    async fn start_monitoring(&mut self) -> Result<()>;

    /// Get the app in front right now, `None` when it cannot be determined
    async fn foreground_app(&self) -> Result<Option<ForegroundApp>>;

    /// Stop observing
    async fn stop_monitoring(&mut self) -> Result<()>;
}

/// Create platform-specific foreground source
///
/// # Errors
///
/// Returns an error if the current platform is not supported
pub fn create_monitor() -> Result<Box<dyn ForegroundSource>> {
    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(macos::MacOSMonitor::new()))
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::LinuxMonitor::new()))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        anyhow::bail!("Unsupported platform")
    }
}
