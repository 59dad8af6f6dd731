use std::time::Duration;

use aparajito_models::gateway::{PlaybackErrorKind, SessionSnapshot, UiCommand, UiEvent};
use aparajito_models::layout::{LayoutMode, DEFAULT_PORTRAIT_HEIGHT_FRACTION};
use aparajito_models::track::{TrackEntry, TrackKind};
use tokio::time::Instant;

use crate::backend::{BackendError, BackendEvent, PlaybackBackend};
use crate::error::BridgeError;
use crate::events::EventBus;
use crate::layout::LayoutController;
use crate::locator::SourceLocator;
use crate::session::{PendingLoad, PlaybackSession};
use crate::timeline::{TimelineBroadcaster, DEFAULT_TICK_INTERVAL};
use crate::tracks::{self, Resolution, SelectionState, TrackSelection};

#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    pub timeline_interval: Duration,
    pub portrait_height_fraction: f32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            timeline_interval: DEFAULT_TICK_INTERVAL,
            portrait_height_fraction: DEFAULT_PORTRAIT_HEIGHT_FRACTION,
        }
    }
}

/// What the runtime has to do after a command was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Done,
    /// Reply to `listTracks`.
    Tracks(Vec<TrackEntry>),
    /// Open the file picker.
    PickFile,
}

/// The playback session state machine.
///
/// Every method runs to completion on the caller's thread and never awaits.
/// Results reach the UI through the [`EventBus`].
pub struct Bridge {
    backend: Box<dyn PlaybackBackend>,
    bus: EventBus,
    session: PlaybackSession,
    pending: Option<PendingLoad>,
    selection: SelectionState,
    timeline: TimelineBroadcaster,
    layout: LayoutController,
}

impl Bridge {
    pub fn new(backend: Box<dyn PlaybackBackend>, bus: EventBus, config: BridgeConfig) -> Self {
        Self {
            backend,
            bus,
            session: PlaybackSession::default(),
            pending: None,
            selection: SelectionState::default(),
            timeline: TimelineBroadcaster::new(config.timeline_interval),
            layout: LayoutController::new(config.portrait_height_fraction),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn selection(&self, kind: TrackKind) -> TrackSelection {
        self.selection.get(kind)
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout.mode()
    }

    pub fn timeline_due(&self) -> Option<Instant> {
        self.timeline.next_due()
    }

    pub fn handle(&mut self, command: UiCommand) -> CommandOutcome {
        tracing::debug!(op = command.name(), "command");
        match command {
            UiCommand::LoadAndPlay { uri } => self.load_and_play(&uri),
            UiCommand::Hide => self.hide(),
            UiCommand::Play => self.set_playing(true),
            UiCommand::Pause => self.set_playing(false),
            UiCommand::Seek { ms } => self.seek(ms),
            UiCommand::SetOrientation { is_landscape } => {
                if let Some(instruction) = self
                    .layout
                    .request(LayoutMode::from_landscape_flag(is_landscape))
                {
                    self.bus.publish(UiEvent::ApplyLayout(instruction));
                }
            }
            UiCommand::ListTracks { kind } => return CommandOutcome::Tracks(self.list_tracks(kind)),
            UiCommand::SelectTrack {
                kind,
                group_index,
                track_index,
            } => self.select_track(kind, group_index, track_index),
            UiCommand::NextTrack { kind } => self.next_track(kind),
            UiCommand::PickLocalFile => return CommandOutcome::PickFile,
        }
        CommandOutcome::Done
    }

    /// Flat track list for `kind`, re-read from the backend.
    pub fn list_tracks(&self, kind: TrackKind) -> Vec<TrackEntry> {
        tracks::entries(&tracks::project(kind, &self.backend.track_groups()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = self.session.snapshot(self.layout.instruction());
        if self.session.current_source.is_some() {
            snapshot.position_ms = self.backend.position_ms();
            if let Some(duration) = self.backend.duration_ms().filter(|d| *d > 0) {
                snapshot.duration_ms = Some(duration);
            }
        }
        snapshot
    }

    /// A file came back from the picker. The UI is told the normalised
    /// locator, the same string the session snapshot carries.
    pub fn local_file_selected(&mut self, uri: String) {
        tracing::info!(%uri, "local file selected");
        self.load_and_play(&uri);
        let uri = match SourceLocator::parse(&uri) {
            Ok(locator) => locator.as_str().to_string(),
            Err(_) => uri,
        };
        self.bus.publish(UiEvent::HandleLocalFileSelection { uri });
    }

    fn load_and_play(&mut self, uri: &str) {
        let locator = match SourceLocator::parse(uri) {
            Ok(locator) => locator,
            Err(e) => {
                tracing::warn!(%uri, "rejecting source: {e}");
                self.publish_load_failure(uri, e.to_string());
                return;
            }
        };

        // A superseded load never committed, so fall back to what preceded it.
        let previous = match self.pending.take() {
            Some(superseded) => {
                tracing::debug!(superseded = %superseded.locator, "load superseded");
                superseded.previous
            }
            None => self.session.checkpoint(),
        };

        let started = self
            .backend
            .load_source(&locator)
            .and_then(|()| self.backend.prepare())
            .and_then(|()| self.backend.play());
        if let Err(e) = started {
            tracing::warn!(%locator, "backend refused source: {e}");
            self.session.restore(previous);
            self.sync_play_state(self.backend.is_playing());
            self.publish_load_failure(locator.as_str(), e.to_string());
            return;
        }

        tracing::info!(%locator, "loading source");
        self.session.current_source = Some(locator.clone());
        self.session.native_mode_active = true;
        self.session.position_ms = 0;
        self.session.duration_ms = None;
        // Group refs from the previous item mean nothing for this one.
        self.selection.forget_pinned();
        self.pending = Some(PendingLoad { locator, previous });
        self.sync_play_state(true);
        self.sync_timeline();
    }

    fn hide(&mut self) {
        if self.session.native_mode_active {
            tracing::info!("native surface hidden");
        }
        self.session.native_mode_active = false;
        if self.session.is_playing {
            self.set_playing(false);
        }
        self.sync_timeline();
    }

    fn set_playing(&mut self, playing: bool) {
        if self.session.is_playing == playing {
            tracing::debug!(playing, "already in requested play state");
            return;
        }
        let result = if playing {
            self.backend.play()
        } else {
            self.backend.pause()
        };
        if let Err(e) = result {
            self.report_backend_error(e);
            return;
        }
        self.sync_play_state(playing);
    }

    fn seek(&mut self, ms: i64) {
        let Ok(position_ms) = u64::try_from(ms) else {
            let e = BridgeError::InvalidCommandArgument(format!("negative seek target {ms}"));
            tracing::warn!("{e}");
            return;
        };
        match self.backend.seek_to(position_ms) {
            Ok(()) => self.session.position_ms = self.backend.position_ms(),
            Err(e) => self.report_backend_error(e),
        }
    }

    fn select_track(&mut self, kind: TrackKind, group_index: i64, track_index: i64) {
        let groups = tracks::project(kind, &self.backend.track_groups());
        match tracks::resolve_explicit(kind, group_index, track_index, &groups) {
            Ok(resolution) => self.apply_resolution(kind, resolution),
            Err(e) => tracing::warn!(kind = %kind, "ignoring selectTrack: {e}"),
        }
    }

    fn next_track(&mut self, kind: TrackKind) {
        let groups = tracks::project(kind, &self.backend.track_groups());
        let resolution = tracks::resolve_next(kind, self.selection.get(kind), &groups);
        self.apply_resolution(kind, resolution);
    }

    fn apply_resolution(&mut self, kind: TrackKind, resolution: Resolution) {
        let result = match resolution {
            Resolution::Disable => self.backend.set_kind_disabled(kind, true),
            Resolution::Automatic => self.backend.set_kind_disabled(kind, false),
            Resolution::Enable {
                group_ref,
                track_index,
                ..
            } => self
                .backend
                .set_kind_disabled(kind, false)
                .and_then(|()| self.backend.set_track_override(kind, group_ref, track_index)),
        };
        match result {
            Ok(()) => {
                let selection = resolution.selection();
                tracing::info!(kind = %kind, ?selection, "track selection changed");
                self.selection.set(kind, selection);
            }
            Err(e) => self.report_backend_error(e),
        }
    }

    pub fn on_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::PlayingChanged(playing) => {
                if self.session.is_playing != playing {
                    tracing::info!(playing, "engine changed play state");
                    self.sync_play_state(playing);
                }
            }
            BackendEvent::SourceReady { locator } => {
                if !self.is_pending(&locator) {
                    tracing::debug!(%locator, "ignoring ready for superseded source");
                    return;
                }
                self.pending = None;
                self.session.duration_ms = self.backend.duration_ms().filter(|d| *d > 0);
                tracing::info!(%locator, duration_ms = ?self.session.duration_ms, "source ready");
                self.reapply_disabled_kinds();
            }
            BackendEvent::TracksChanged => self.drop_stale_selections(),
            BackendEvent::LoadFailed { locator, reason } => {
                let Some(pending) = self.pending.take_if(|p| p.locator == locator) else {
                    tracing::debug!(%locator, %reason, "ignoring failure for superseded source");
                    return;
                };
                tracing::warn!(%locator, %reason, "source failed to load");
                self.session.restore(pending.previous);
                self.sync_play_state(self.backend.is_playing());
                self.sync_timeline();
                self.publish_load_failure(locator.as_str(), reason);
            }
            BackendEvent::Failed { reason } => {
                tracing::warn!(%reason, "playback failed");
                self.sync_play_state(self.backend.is_playing());
                self.bus.publish(UiEvent::PlaybackError {
                    kind: PlaybackErrorKind::Backend,
                    message: reason,
                    uri: self.current_uri(),
                });
            }
        }
    }

    /// One timeline tick. The runtime calls this when
    /// [`Bridge::timeline_due`] has passed.
    pub fn tick_timeline(&mut self) {
        if !self.session.wants_timeline() {
            self.timeline.stop();
            return;
        }
        if let Some(sample) = TimelineBroadcaster::sample(&*self.backend) {
            self.session.position_ms = sample.position_ms;
            self.session.duration_ms = Some(sample.duration_ms);
            self.bus.publish(UiEvent::UpdateTimeline {
                position_ms: sample.position_ms,
                duration_ms: sample.duration_ms,
            });
        }
        self.timeline.reschedule();
    }

    /// Stop the timeline, then free the engine.
    pub fn teardown(mut self) {
        self.timeline.stop();
        self.pending = None;
        self.backend.release();
        tracing::info!("playback bridge torn down");
    }

    fn is_pending(&self, locator: &SourceLocator) -> bool {
        self.pending.as_ref().is_some_and(|p| &p.locator == locator)
    }

    fn current_uri(&self) -> Option<String> {
        self.session.current_source.as_ref().map(|s| s.to_string())
    }

    /// Record the play state and tell the UI if it changed.
    fn sync_play_state(&mut self, playing: bool) {
        let changed = self.session.is_playing != playing;
        self.session.is_playing = playing;
        self.sync_timeline();
        if changed {
            self.bus.publish(UiEvent::SetPlayState {
                is_playing: playing,
            });
        }
    }

    fn sync_timeline(&mut self) {
        if self.session.wants_timeline() {
            self.timeline.start();
        } else {
            self.timeline.stop();
        }
    }

    /// Engines may forget disablement when a new item opens.
    fn reapply_disabled_kinds(&mut self) {
        for kind in TrackKind::ALL {
            if self.selection.get(kind) != TrackSelection::Disabled {
                continue;
            }
            if let Err(e) = self.backend.set_kind_disabled(kind, true) {
                self.report_backend_error(e);
            }
        }
    }

    fn drop_stale_selections(&mut self) {
        let raw = self.backend.track_groups();
        for kind in TrackKind::ALL {
            let TrackSelection::Enabled {
                group_index,
                track_index,
            } = self.selection.get(kind)
            else {
                continue;
            };
            let groups = tracks::project(kind, &raw);
            let still_valid = groups
                .get(group_index)
                .is_some_and(|g| track_index < g.tracks.len());
            if !still_valid {
                tracing::debug!(kind = %kind, group_index, track_index, "selection no longer exists");
                self.selection.set(kind, TrackSelection::Automatic);
            }
        }
    }

    fn publish_load_failure(&self, uri: &str, reason: String) {
        let error = BridgeError::SourceLoadFailure {
            uri: uri.to_string(),
            reason,
        };
        self.bus.publish(UiEvent::PlaybackError {
            kind: PlaybackErrorKind::SourceLoadFailure,
            message: error.to_string(),
            uri: Some(uri.to_string()),
        });
    }

    fn report_backend_error(&self, error: BackendError) {
        let error = BridgeError::from(error);
        tracing::warn!("{error}");
        self.bus.publish(UiEvent::PlaybackError {
            kind: PlaybackErrorKind::Backend,
            message: error.to_string(),
            uri: self.current_uri(),
        });
    }
}
