use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::Mutex,
};

use crate::notifier::StatusSink;
use crate::session::SessionState;
use crate::status::StatusUpdate;

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcRequest {
    Status,
    Shutdown,
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcResponse {
    Status {
        running: bool,
        foreground_app: Option<String>,
        elapsed_seconds: u64,
        limit_reached: bool,
        on_break: bool,
        status: StatusUpdate,
    },
    Shutdown,
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// Send one request and wait for the daemon's answer
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or replies with garbage
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    foreground_app: Option<String>,
    elapsed_seconds: u64,
    limit_reached: bool,
    on_break: bool,
    status: StatusUpdate,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            foreground_app: None,
            elapsed_seconds: 0,
            limit_reached: false,
            on_break: false,
            status: StatusUpdate::waiting(),
        }
    }
}

/// Answers CLI requests from the daemon's latest tick
pub struct DaemonIpcHandler {
    snapshot: Mutex<Snapshot>,
    shutdown_signal: Arc<AtomicBool>,
}

impl DaemonIpcHandler {
    #[must_use]
    pub fn new(shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            snapshot: Mutex::new(Snapshot::default()),
            shutdown_signal,
        }
    }

    /// Record the session after a tick
    pub async fn set_session(&self, foreground_app: Option<String>, session: &SessionState) {
        let mut snapshot = self.snapshot.lock().await;
        snapshot.foreground_app = foreground_app;
        snapshot.elapsed_seconds = session.elapsed_seconds();
        snapshot.limit_reached = session.limit_reached_this_session();
        snapshot.on_break = session.is_on_break();
    }

    async fn respond(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Status => {
                let snapshot = self.snapshot.lock().await.clone();
                IpcResponse::Status {
                    running: true,
                    foreground_app: snapshot.foreground_app,
                    elapsed_seconds: snapshot.elapsed_seconds,
                    limit_reached: snapshot.limit_reached,
                    on_break: snapshot.on_break,
                    status: snapshot.status,
                }
            }
            IpcRequest::Shutdown => {
                log::info!("Shutdown requested over IPC");
                self.shutdown_signal.store(true, Ordering::SeqCst);
                IpcResponse::Shutdown
            }
        }
    }

    /// Answer a single request on `stream`
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be written
    pub async fn handle(&self, stream: &mut UnixStream, request: IpcRequest) -> Result<()> {
        let response = self.respond(request).await;
        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        Ok(())
    }
}

#[async_trait]
impl StatusSink for DaemonIpcHandler {
    async fn update_status(&self, status: &StatusUpdate) {
        self.snapshot.lock().await.status = status.clone();
    }
}

/// Accept CLI connections on `sock_path` until the task is dropped
///
/// # Errors
///
/// Returns an error if the socket cannot be bound
pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    let listener = UnixListener::bind(sock_path)?;

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0; 1024];
                    match stream.read(&mut buf).await {
                        Ok(n) if n > 0 => match bincode::deserialize::<IpcRequest>(&buf[..n]) {
                            Ok(request) => {
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Ok(_) => {}
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionTracker, WatchConfiguration};
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn test_status_reflects_latest_tick() {
        let handler = DaemonIpcHandler::new(Arc::new(AtomicBool::new(false)));

        let mut tracker = SessionTracker::new(WatchConfiguration::new(1, ["firefox"]));
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        for i in 0..65 {
            tracker.tick(Some("firefox"), 30, t0 + Duration::seconds(i));
        }
        handler
            .set_session(Some("firefox".to_string()), tracker.state())
            .await;
        handler.update_status(&StatusUpdate::counting(65)).await;

        let response = handler.respond(IpcRequest::Status).await;
        assert_eq!(
            response,
            IpcResponse::Status {
                running: true,
                foreground_app: Some("firefox".to_string()),
                elapsed_seconds: 65,
                limit_reached: true,
                on_break: false,
                status: StatusUpdate::counting(65),
            }
        );
    }

    #[tokio::test]
    async fn test_shutdown_sets_signal() {
        let signal = Arc::new(AtomicBool::new(false));
        let handler = DaemonIpcHandler::new(signal.clone());
        assert_eq!(
            handler.respond(IpcRequest::Shutdown).await,
            IpcResponse::Shutdown
        );
        assert!(signal.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_client_round_trip_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("detox.sock");
        let signal = Arc::new(AtomicBool::new(false));
        let handler = Arc::new(DaemonIpcHandler::new(signal.clone()));

        let server = {
            let sock = sock.clone();
            let handler = handler.clone();
            tokio::spawn(async move { listen(handler, &sock).await })
        };

        // Wait for the socket to be bound
        for _ in 0..50 {
            if sock.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let client = IpcClient::new(&sock);
        match client.send_command(IpcRequest::Status).await.unwrap() {
            IpcResponse::Status {
                running, status, ..
            } => {
                assert!(running);
                assert_eq!(status, StatusUpdate::waiting());
            }
            IpcResponse::Shutdown => panic!("unexpected shutdown response"),
        }

        client.send_command(IpcRequest::Shutdown).await.unwrap();
        assert!(signal.load(Ordering::SeqCst));
        server.abort();
    }
}
