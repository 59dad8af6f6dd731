use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::net::UnixStream;
use tokio::process::{Child, Command};

use crate::error::MpvError;

const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct MpvConfig {
    /// Explicit path to the mpv executable. Searched for when unset.
    pub binary: Option<PathBuf>,
    /// IPC socket path. A per-process path in the temp dir when unset.
    pub ipc_socket: Option<PathBuf>,
    pub extra_args: Vec<String>,
    pub connect_timeout: Duration,
}

impl Default for MpvConfig {
    fn default() -> Self {
        Self {
            binary: None,
            ipc_socket: None,
            extra_args: Vec::new(),
            connect_timeout: Duration::from_secs(6),
        }
    }
}

/// A managed mpv process.
pub struct MpvProcess {
    child: Child,
    socket_path: PathBuf,
}

impl MpvProcess {
    /// Begin killing the process without waiting for it to exit.
    pub fn start_kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("mpv already gone: {e}");
        } else {
            tracing::info!("mpv stopped");
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Find the mpv binary: the configured path, then next to our own
/// executable, then `PATH`.
pub fn find_mpv_binary(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.is_file().then(|| path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let candidate = exe_dir.join("mpv");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    which::which("mpv").ok()
}

fn default_socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("aparajito-mpv-{}.sock", std::process::id()))
}

fn launch_args(socket_path: &Path, extra_args: &[String]) -> Vec<String> {
    let mut args = vec![
        "--idle=yes".to_string(),
        "--force-window=yes".to_string(),
        "--keep-open=yes".to_string(),
        "--no-terminal".to_string(),
        format!("--input-ipc-server={}", socket_path.display()),
    ];
    args.extend(extra_args.iter().cloned());
    args
}

/// Start an idle mpv and connect to its IPC socket.
pub async fn launch(config: &MpvConfig) -> Result<(MpvProcess, UnixStream), MpvError> {
    let binary = find_mpv_binary(config.binary.as_deref()).ok_or_else(|| {
        MpvError::BinaryNotFound(
            config
                .binary
                .as_ref()
                .map_or_else(|| "mpv on PATH".to_string(), |p| p.display().to_string()),
        )
    })?;
    tracing::info!("Found mpv binary at: {}", binary.display());

    let socket_path = config.ipc_socket.clone().unwrap_or_else(default_socket_path);
    // A stale socket from a crashed run would make the first connect succeed
    // against nothing.
    let _ = std::fs::remove_file(&socket_path);

    let child = Command::new(&binary)
        .args(launch_args(&socket_path, &config.extra_args))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(MpvError::Spawn)?;
    tracing::info!(
        "Started mpv (PID: {})",
        child
            .id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".into())
    );

    let mut process = MpvProcess { child, socket_path };
    match connect(&mut process, config.connect_timeout).await {
        Ok(stream) => Ok((process, stream)),
        Err(e) => {
            process.start_kill();
            Err(e)
        }
    }
}

async fn connect(process: &mut MpvProcess, timeout: Duration) -> Result<UnixStream, MpvError> {
    let attempts = (timeout.as_millis() / CONNECT_RETRY_DELAY.as_millis()).max(1);
    for _ in 0..attempts {
        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
        match UnixStream::connect(&process.socket_path).await {
            Ok(stream) => {
                tracing::info!("mpv IPC connected: {}", process.socket_path.display());
                return Ok(stream);
            }
            Err(_) => {
                if let Ok(Some(status)) = process.child.try_wait() {
                    return Err(MpvError::ExitedEarly(status.to_string()));
                }
            }
        }
    }
    Err(MpvError::ConnectTimeout(process.socket_path.clone(), timeout))
}
