use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MpvError {
    #[error("mpv binary not found (looked for {0})")]
    BinaryNotFound(String),
    #[error("failed to start mpv: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("mpv exited before its IPC socket was ready ({0})")]
    ExitedEarly(String),
    #[error("timed out after {1:?} connecting to mpv IPC socket {path}", path = .0.display())]
    ConnectTimeout(PathBuf, Duration),
    #[error("malformed mpv message: {0}")]
    Protocol(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
