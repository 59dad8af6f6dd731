use aparajito_models::track::TrackKind;
use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Reported to the UI as a `playbackError`; the session keeps its
    /// previous source.
    #[error("failed to load {uri}: {reason}")]
    SourceLoadFailure { uri: String, reason: String },
    /// Absorbed by the resolver's toggle fallback, never surfaced.
    #[error("no {0} tracks available")]
    TrackResolutionEmpty(TrackKind),
    /// Logged and dropped. UI track lists can race ahead of metadata changes.
    #[error("invalid command argument: {0}")]
    InvalidCommandArgument(String),
    /// The bridge has been torn down and no longer owns a backend.
    #[error("playback backend unavailable")]
    BackendUnavailable,
    #[error(transparent)]
    Backend(#[from] BackendError),
}
