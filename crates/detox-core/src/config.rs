use anyhow::Result;
use std::path::PathBuf;

/// Get the local data directory for detox.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("detox");
    Ok(path)
}

/// PID file of the running daemon
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn pid_file_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("detox.pid"))
}

/// Socket the daemon listens on for CLI requests
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn socket_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("detox.sock"))
}

/// Log file the background daemon writes to
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn log_file_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("detox.log"))
}
