//! In-process playback engine with scripted media.
//!
//! Position advances on the tokio clock while playing, so paused-time tests
//! can drive it with `tokio::time::advance`. The host binary uses it as the
//! `simulated` backend when no native engine is installed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use aparajito_models::track::TrackKind;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{
    BackendError, BackendEvent, BackendEventReceiver, BackendEventSender, GroupRef,
    PlaybackBackend, TrackDescriptor, TrackGroupDescriptor,
};
use crate::locator::SourceLocator;

/// Metadata the simulated engine reports once a source has "loaded".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedMedia {
    pub duration_ms: Option<u64>,
    pub groups: Vec<TrackGroupDescriptor>,
}

impl SimulatedMedia {
    /// A feature-length item with two audio languages and two subtitle groups.
    pub fn feature() -> Self {
        let track = |label: Option<&str>, language: Option<&str>| TrackDescriptor {
            label: label.map(str::to_string),
            language: language.map(str::to_string),
            supported: true,
            selected: false,
        };
        Self {
            duration_ms: Some(125 * 60 * 1000),
            groups: vec![
                TrackGroupDescriptor {
                    kind: TrackKind::Audio,
                    group_ref: GroupRef(1),
                    tracks: vec![track(Some("Bangla 5.1"), Some("bn"))],
                },
                TrackGroupDescriptor {
                    kind: TrackKind::Audio,
                    group_ref: GroupRef(2),
                    tracks: vec![track(None, Some("en"))],
                },
                TrackGroupDescriptor {
                    kind: TrackKind::Subtitle,
                    group_ref: GroupRef(3),
                    tracks: vec![track(Some("English"), Some("en"))],
                },
                TrackGroupDescriptor {
                    kind: TrackKind::Subtitle,
                    group_ref: GroupRef(4),
                    tracks: vec![track(None, None)],
                },
            ],
        }
    }
}

#[derive(Debug)]
struct SimState {
    library: HashMap<String, SimulatedMedia>,
    failures: HashMap<String, String>,
    fallback: Option<SimulatedMedia>,
    auto_ready: bool,

    current: Option<SourceLocator>,
    prepared: bool,
    loaded: Option<SimulatedMedia>,

    playing: bool,
    anchor_ms: u64,
    anchor_at: Instant,

    disabled: HashSet<TrackKind>,
    overrides: HashMap<TrackKind, (GroupRef, usize)>,
    released: bool,
    calls: Vec<String>,
}

impl SimState {
    fn position_ms(&self) -> u64 {
        let mut pos = self.anchor_ms;
        if self.playing {
            pos += self.anchor_at.elapsed().as_millis() as u64;
        }
        match self.loaded.as_ref().and_then(|m| m.duration_ms) {
            Some(duration) => pos.min(duration),
            None => pos,
        }
    }

    fn reanchor(&mut self, position_ms: u64) {
        self.anchor_ms = position_ms;
        self.anchor_at = Instant::now();
    }

    fn ensure_live(&self) -> Result<(), BackendError> {
        if self.released {
            Err(BackendError::Released)
        } else {
            Ok(())
        }
    }

    /// Resolve the pending source into metadata or a load failure.
    fn complete_load(&mut self) -> Option<BackendEvent> {
        let locator = self.current.clone()?;
        if !self.prepared || self.loaded.is_some() {
            return None;
        }
        if let Some(reason) = self.failures.get(locator.as_str()) {
            let reason = reason.clone();
            self.playing = false;
            return Some(BackendEvent::LoadFailed { locator, reason });
        }
        let media = self
            .library
            .get(locator.as_str())
            .or(self.fallback.as_ref())
            .cloned();
        match media {
            Some(media) => {
                self.loaded = Some(media);
                Some(BackendEvent::SourceReady { locator })
            }
            None => {
                self.playing = false;
                Some(BackendEvent::LoadFailed {
                    locator,
                    reason: "no such media".into(),
                })
            }
        }
    }
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
    events: BackendEventSender,
}

impl SimulatedBackend {
    pub fn new(events: BackendEventSender) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                library: HashMap::new(),
                failures: HashMap::new(),
                fallback: None,
                auto_ready: true,
                current: None,
                prepared: false,
                loaded: None,
                playing: false,
                anchor_ms: 0,
                anchor_at: Instant::now(),
                disabled: HashSet::new(),
                overrides: HashMap::new(),
                released: false,
                calls: Vec::new(),
            })),
            events,
        }
    }

    /// Convenience constructor returning the receiving end of the event channel.
    pub fn channel() -> (Self, BackendEventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn with_media(self, uri: &str, media: SimulatedMedia) -> Self {
        lock(&self.state).library.insert(uri.to_string(), media);
        self
    }

    /// Media reported for any source that is not in the library.
    pub fn with_fallback(self, media: SimulatedMedia) -> Self {
        lock(&self.state).fallback = Some(media);
        self
    }

    pub fn with_failure(self, uri: &str, reason: &str) -> Self {
        lock(&self.state)
            .failures
            .insert(uri.to_string(), reason.to_string());
        self
    }

    /// Hold metadata back until [`SimulatedController::finish_loading`] is
    /// called instead of resolving it during `prepare`.
    pub fn manual_metadata(self) -> Self {
        lock(&self.state).auto_ready = false;
        self
    }

    pub fn controller(&self) -> SimulatedController {
        SimulatedController {
            state: self.state.clone(),
            events: self.events.clone(),
        }
    }

    fn record(&self, call: String) -> MutexGuard<'_, SimState> {
        let mut st = lock(&self.state);
        st.calls.push(call);
        st
    }

    fn emit(&self, event: Option<BackendEvent>) {
        if let Some(event) = event {
            let _ = self.events.send(event);
        }
    }
}

impl PlaybackBackend for SimulatedBackend {
    fn load_source(&mut self, locator: &SourceLocator) -> Result<(), BackendError> {
        let mut st = self.record(format!("load {locator}"));
        st.ensure_live()?;
        st.current = Some(locator.clone());
        st.prepared = false;
        st.loaded = None;
        st.playing = false;
        st.overrides.clear();
        st.reanchor(0);
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), BackendError> {
        let event = {
            let mut st = self.record("prepare".into());
            st.ensure_live()?;
            if st.current.is_none() {
                return Err(BackendError::Command("prepare without a source".into()));
            }
            st.prepared = true;
            if st.auto_ready {
                st.complete_load()
            } else {
                None
            }
        };
        self.emit(event);
        Ok(())
    }

    fn play(&mut self) -> Result<(), BackendError> {
        let mut st = self.record("play".into());
        st.ensure_live()?;
        if !st.playing {
            let pos = st.position_ms();
            st.playing = true;
            st.reanchor(pos);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        let mut st = self.record("pause".into());
        st.ensure_live()?;
        if st.playing {
            let pos = st.position_ms();
            st.playing = false;
            st.reanchor(pos);
        }
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<(), BackendError> {
        let mut st = self.record(format!("seek {position_ms}"));
        st.ensure_live()?;
        let target = match st.loaded.as_ref().and_then(|m| m.duration_ms) {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };
        st.reanchor(target);
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        lock(&self.state).position_ms()
    }

    fn duration_ms(&self) -> Option<u64> {
        lock(&self.state).loaded.as_ref().and_then(|m| m.duration_ms)
    }

    fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    fn track_groups(&self) -> Vec<TrackGroupDescriptor> {
        let st = lock(&self.state);
        let Some(media) = st.loaded.as_ref() else {
            return Vec::new();
        };
        let mut groups = media.groups.clone();
        for kind in TrackKind::ALL {
            if st.disabled.contains(&kind) {
                continue;
            }
            // An override wins; otherwise the engine picks the first
            // decodable track of the kind.
            let chosen = st.overrides.get(&kind).copied().or_else(|| {
                groups
                    .iter()
                    .filter(|g| g.kind == kind)
                    .find(|g| g.tracks.first().is_some_and(|t| t.supported))
                    .map(|g| (g.group_ref, 0))
            });
            if let Some((group_ref, track_index)) = chosen {
                for group in groups
                    .iter_mut()
                    .filter(|g| g.kind == kind && g.group_ref == group_ref)
                {
                    if let Some(track) = group.tracks.get_mut(track_index) {
                        track.selected = true;
                    }
                }
            }
        }
        groups
    }

    fn set_track_override(
        &mut self,
        kind: TrackKind,
        group: GroupRef,
        track_index: usize,
    ) -> Result<(), BackendError> {
        let mut st = self.record(format!("override {kind} {} {track_index}", group.0));
        st.ensure_live()?;
        st.overrides.insert(kind, (group, track_index));
        Ok(())
    }

    fn set_kind_disabled(&mut self, kind: TrackKind, disabled: bool) -> Result<(), BackendError> {
        let mut st = self.record(format!("disable {kind} {disabled}"));
        st.ensure_live()?;
        if disabled {
            st.disabled.insert(kind);
        } else {
            st.disabled.remove(&kind);
        }
        Ok(())
    }

    fn release(&mut self) {
        let mut st = self.record("release".into());
        st.playing = false;
        st.released = true;
    }
}

/// Test and demo handle for driving engine-side changes the bridge did not
/// ask for.
#[derive(Clone)]
pub struct SimulatedController {
    state: Arc<Mutex<SimState>>,
    events: BackendEventSender,
}

impl SimulatedController {
    /// Deliver metadata (or the scripted failure) for the pending source.
    pub fn finish_loading(&self) {
        let event = lock(&self.state).complete_load();
        if let Some(event) = event {
            let _ = self.events.send(event);
        }
    }

    /// The engine stopped or resumed on its own, e.g. buffering or end of
    /// stream.
    pub fn set_playing(&self, playing: bool) {
        {
            let mut st = lock(&self.state);
            let pos = st.position_ms();
            st.playing = playing;
            st.reanchor(pos);
        }
        let _ = self.events.send(BackendEvent::PlayingChanged(playing));
    }

    /// Swap the loaded item's track groups, as after a metadata refresh.
    pub fn replace_groups(&self, groups: Vec<TrackGroupDescriptor>) {
        {
            let mut st = lock(&self.state);
            if let Some(media) = st.loaded.as_mut() {
                media.groups = groups;
            }
            st.overrides.clear();
        }
        let _ = self.events.send(BackendEvent::TracksChanged);
    }

    pub fn fail(&self, reason: &str) {
        lock(&self.state).playing = false;
        let _ = self.events.send(BackendEvent::Failed {
            reason: reason.to_string(),
        });
    }

    /// Every backend call made so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| c.as_str() == name || c.starts_with(&format!("{name} ")))
            .count()
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }

    pub fn disabled(&self, kind: TrackKind) -> bool {
        lock(&self.state).disabled.contains(&kind)
    }

    pub fn override_for(&self, kind: TrackKind) -> Option<(GroupRef, usize)> {
        lock(&self.state).overrides.get(&kind).copied()
    }
}
