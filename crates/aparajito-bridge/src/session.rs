use aparajito_models::gateway::SessionSnapshot;
use aparajito_models::layout::LayoutInstruction;

use crate::locator::SourceLocator;

/// The one live playback session of a bridge.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSession {
    pub current_source: Option<SourceLocator>,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    /// Whether the native video surface is the visible layer.
    pub native_mode_active: bool,
}

/// Session fields restored when a load fails.
#[derive(Debug, Clone)]
pub struct SessionCheckpoint {
    current_source: Option<SourceLocator>,
    native_mode_active: bool,
    position_ms: u64,
    duration_ms: Option<u64>,
}

/// A load the backend has not confirmed yet.
#[derive(Debug, Clone)]
pub struct PendingLoad {
    pub locator: SourceLocator,
    pub previous: SessionCheckpoint,
}

impl PlaybackSession {
    pub fn checkpoint(&self) -> SessionCheckpoint {
        SessionCheckpoint {
            current_source: self.current_source.clone(),
            native_mode_active: self.native_mode_active,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
        }
    }

    pub fn restore(&mut self, checkpoint: SessionCheckpoint) {
        self.current_source = checkpoint.current_source;
        self.native_mode_active = checkpoint.native_mode_active;
        self.position_ms = checkpoint.position_ms;
        self.duration_ms = checkpoint.duration_ms;
    }

    /// Whether timeline samples should flow.
    pub fn wants_timeline(&self) -> bool {
        self.is_playing && self.native_mode_active
    }

    pub fn snapshot(&self, layout: LayoutInstruction) -> SessionSnapshot {
        SessionSnapshot {
            current_source_uri: self.current_source.as_ref().map(|s| s.to_string()),
            is_playing: self.is_playing,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            is_native_mode_active: self.native_mode_active,
            layout,
        }
    }
}
