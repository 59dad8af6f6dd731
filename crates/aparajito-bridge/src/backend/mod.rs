//! Capability interface to the native playback engine.
//!
//! The bridge never talks to a decoder directly. It drives a
//! [`PlaybackBackend`] and listens for [`BackendEvent`]s on a channel the
//! backend was constructed with.

pub mod simulated;

use aparajito_models::track::TrackKind;
use tokio::sync::mpsc;

use crate::locator::SourceLocator;

pub use simulated::SimulatedBackend;

pub type BackendEventSender = mpsc::UnboundedSender<BackendEvent>;
pub type BackendEventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend has been released")]
    Released,
    #[error("backend disconnected: {0}")]
    Disconnected(String),
    #[error("unsupported source: {0}")]
    Unsupported(String),
    #[error("backend command failed: {0}")]
    Command(String),
}

/// Asynchronous notifications from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// The engine started or stopped rendering (buffering, end of stream,
    /// external pause ...).
    PlayingChanged(bool),
    /// Metadata for `locator` is available.
    SourceReady { locator: SourceLocator },
    /// The track topology changed. Previously enumerated groups are stale.
    TracksChanged,
    /// `locator` could not be opened.
    LoadFailed {
        locator: SourceLocator,
        reason: String,
    },
    /// Playback failed after the source was opened.
    Failed { reason: String },
}

/// Opaque engine-side handle for a track group. Only meaningful to the
/// backend that produced it, and only until the next `TracksChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupRef(pub u64);

/// Raw per-track metadata as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub label: Option<String>,
    pub language: Option<String>,
    /// Whether the device can decode this track.
    pub supported: bool,
    pub selected: bool,
}

/// One group of interchangeable tracks of a single kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackGroupDescriptor {
    pub kind: TrackKind,
    pub group_ref: GroupRef,
    pub tracks: Vec<TrackDescriptor>,
}

/// The native playback engine.
///
/// All methods are called from the bridge's single runtime task; none of them
/// may block. Long-running work (opening a source, probing tracks) completes
/// in the background and is reported through [`BackendEvent`]s.
pub trait PlaybackBackend: Send {
    /// Replace the current media item with `locator`.
    fn load_source(&mut self, locator: &SourceLocator) -> Result<(), BackendError>;
    fn prepare(&mut self) -> Result<(), BackendError>;
    fn play(&mut self) -> Result<(), BackendError>;
    fn pause(&mut self) -> Result<(), BackendError>;
    /// Seek to an absolute position. Targets past the end are clamped by the
    /// engine.
    fn seek_to(&mut self, position_ms: u64) -> Result<(), BackendError>;
    fn position_ms(&self) -> u64;
    /// `None` until the engine knows the duration.
    fn duration_ms(&self) -> Option<u64>;
    fn is_playing(&self) -> bool;
    /// Every track group of the current item, in engine order. Empty when no
    /// metadata has loaded.
    fn track_groups(&self) -> Vec<TrackGroupDescriptor>;
    fn set_track_override(
        &mut self,
        kind: TrackKind,
        group: GroupRef,
        track_index: usize,
    ) -> Result<(), BackendError>;
    fn set_kind_disabled(&mut self, kind: TrackKind, disabled: bool) -> Result<(), BackendError>;
    /// Free the engine. Must be the last call made on this backend.
    fn release(&mut self);
}
