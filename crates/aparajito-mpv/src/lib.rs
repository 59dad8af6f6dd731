//! mpv playback backend driven over mpv's JSON IPC socket.

pub mod error;
pub mod ipc;

#[cfg(unix)]
pub mod backend;
#[cfg(unix)]
pub mod process;

pub use error::MpvError;

#[cfg(unix)]
pub use backend::MpvBackend;
#[cfg(unix)]
pub use process::{MpvConfig, MpvProcess};
