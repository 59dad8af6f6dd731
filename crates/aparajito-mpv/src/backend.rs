use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use aparajito_bridge::backend::{
    BackendError, BackendEvent, BackendEventSender, GroupRef, PlaybackBackend,
    TrackGroupDescriptor,
};
use aparajito_bridge::locator::SourceLocator;
use aparajito_models::track::TrackKind;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::MpvError;
use crate::ipc::{self, MpvMessage, MpvTrack, OBSERVED_PROPERTIES};
use crate::process::{self, MpvConfig, MpvProcess};

/// A `loadfile` mpv has accepted but not started yet.
#[derive(Debug)]
struct QueuedLoad {
    request_id: u64,
    locator: SourceLocator,
    /// Taken from the `loadfile` reply.
    entry_id: Option<i64>,
}

/// The file mpv is opening or playing, between `start-file` and `end-file`.
#[derive(Debug)]
struct ActiveFile {
    locator: SourceLocator,
    entry_id: Option<i64>,
}

/// What the reader task has learned from mpv's property observers.
#[derive(Debug, Default)]
struct MpvState {
    queued: VecDeque<QueuedLoad>,
    active: Option<ActiveFile>,
    loaded: bool,
    paused: bool,
    idle: bool,
    time_pos_ms: u64,
    duration_ms: Option<u64>,
    tracks: Vec<MpvTrack>,
    /// Last play state reported upstream.
    playing: bool,
}

fn seconds_to_ms(data: &Value) -> Option<u64> {
    data.as_f64()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| (s * 1000.0).round() as u64)
}

impl MpvState {
    fn apply(&mut self, message: MpvMessage) -> Vec<BackendEvent> {
        let mut events = Vec::new();
        match message {
            MpvMessage::PropertyChange { name, data } => match name.as_str() {
                "pause" => self.paused = data.as_bool().unwrap_or(self.paused),
                "idle-active" => self.idle = data.as_bool().unwrap_or(false),
                "time-pos" => self.time_pos_ms = seconds_to_ms(&data).unwrap_or(0),
                "duration" => self.duration_ms = seconds_to_ms(&data),
                "track-list" => {
                    self.tracks = ipc::parse_track_list(&data);
                    if self.loaded {
                        events.push(BackendEvent::TracksChanged);
                    }
                }
                _ => {}
            },
            MpvMessage::StartFile { playlist_entry_id } => {
                self.start_file(playlist_entry_id);
            }
            MpvMessage::FileLoaded => {
                self.loaded = true;
                match &self.active {
                    Some(active) => events.push(BackendEvent::SourceReady {
                        locator: active.locator.clone(),
                    }),
                    None => tracing::debug!("mpv loaded a file it was not asked for"),
                }
            }
            MpvMessage::EndFile {
                reason,
                file_error,
                playlist_entry_id,
            } => {
                if let Some(event) = self.end_file(reason, file_error, playlist_entry_id) {
                    events.push(event);
                }
            }
            MpvMessage::Reply {
                request_id,
                error,
                data,
            } => {
                if let Some(event) = self.reply(request_id, error, &data) {
                    events.push(event);
                }
            }
            MpvMessage::Event(_) => {}
        }

        let playing = self.loaded && !self.paused && !self.idle;
        if playing != self.playing {
            self.playing = playing;
            events.push(BackendEvent::PlayingChanged(playing));
        }
        events
    }

    /// Match `start-file` to the load it belongs to. With playlist ids, loads
    /// queued ahead of the matching one were replaced before mpv reached
    /// them. Without ids, loads start in the order they were sent.
    fn start_file(&mut self, entry_id: Option<i64>) {
        let matched = entry_id.and_then(|id| {
            self.queued
                .iter()
                .position(|load| load.entry_id == Some(id))
        });
        if let Some(index) = matched {
            for skipped in self.queued.drain(..index) {
                tracing::debug!(locator = %skipped.locator, "mpv skipped replaced load");
            }
        }
        self.active = self.queued.pop_front().map(|load| ActiveFile {
            locator: load.locator,
            entry_id: entry_id.or(load.entry_id),
        });
        self.loaded = false;
    }

    fn end_file(
        &mut self,
        reason: String,
        file_error: Option<String>,
        entry_id: Option<i64>,
    ) -> Option<BackendEvent> {
        let active = self.active.as_ref()?;
        if let (Some(ended), Some(current)) = (entry_id, active.entry_id) {
            if ended != current {
                tracing::debug!(ended, current, "ignoring end-file for another entry");
                return None;
            }
        }
        let active = self.active.take()?;
        let was_loaded = std::mem::replace(&mut self.loaded, false);

        // "stop" and "redirect" are replacements we asked for.
        if reason != "error" {
            return None;
        }
        let reason = file_error.unwrap_or(reason);
        if was_loaded {
            Some(BackendEvent::Failed { reason })
        } else {
            Some(BackendEvent::LoadFailed {
                locator: active.locator,
                reason,
            })
        }
    }

    fn reply(&mut self, request_id: u64, error: String, data: &Value) -> Option<BackendEvent> {
        let Some(index) = self
            .queued
            .iter()
            .position(|load| load.request_id == request_id)
        else {
            if error != "success" {
                tracing::warn!(request_id, %error, "mpv rejected command");
            }
            return None;
        };

        if error == "success" {
            self.queued[index].entry_id = data.get("playlist_entry_id").and_then(Value::as_i64);
            return None;
        }
        let load = self.queued.remove(index)?;
        tracing::warn!(locator = %load.locator, %error, "mpv rejected loadfile");
        Some(BackendEvent::LoadFailed {
            locator: load.locator,
            reason: error,
        })
    }
}

fn lock(state: &Mutex<MpvState>) -> MutexGuard<'_, MpvState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// [`PlaybackBackend`] over an mpv IPC connection.
///
/// Commands are queued to a writer task and never awaited; state is read
/// from a cache the reader task keeps current from property observers.
pub struct MpvBackend {
    state: Arc<Mutex<MpvState>>,
    commands: mpsc::UnboundedSender<String>,
    next_request_id: u64,
    reader: Option<JoinHandle<()>>,
    process: Option<MpvProcess>,
    released: bool,
}

impl MpvBackend {
    /// Start a managed mpv and attach to it.
    pub async fn launch(config: &MpvConfig, events: BackendEventSender) -> Result<Self, MpvError> {
        let (process, stream) = process::launch(config).await?;
        let mut backend = Self::from_stream(stream, events);
        backend.process = Some(process);
        Ok(backend)
    }

    /// Attach to an already connected IPC stream. Must be called inside a
    /// tokio runtime.
    pub fn from_stream(stream: UnixStream, events: BackendEventSender) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(MpvState::default()));

        tokio::spawn(write_loop(write_half, rx));
        let reader = tokio::spawn(read_loop(read_half, state.clone(), events));

        let mut backend = Self {
            state,
            commands: tx,
            next_request_id: 0,
            reader: Some(reader),
            process: None,
            released: false,
        };
        for (id, name) in OBSERVED_PROPERTIES {
            if let Err(e) = backend.send(ipc::observe_property(id, name)) {
                tracing::warn!("failed to observe mpv property {name}: {e}");
            }
        }
        backend
    }

    fn send(&mut self, command: Vec<Value>) -> Result<(), BackendError> {
        if self.released {
            return Err(BackendError::Released);
        }
        self.next_request_id += 1;
        self.commands
            .send(ipc::encode(&command, self.next_request_id))
            .map_err(|_| BackendError::Disconnected("mpv IPC writer stopped".into()))
    }
}

impl PlaybackBackend for MpvBackend {
    fn load_source(&mut self, locator: &SourceLocator) -> Result<(), BackendError> {
        if locator.scheme() == "content" {
            return Err(BackendError::Unsupported(format!(
                "mpv cannot open {} locators",
                locator.scheme()
            )));
        }
        let target = match locator.to_file_path() {
            Some(path) => path.display().to_string(),
            None => locator.as_str().to_string(),
        };

        // Queue before sending so the reader can match the reply.
        let request_id = self.next_request_id + 1;
        {
            let mut st = lock(&self.state);
            st.queued.push_back(QueuedLoad {
                request_id,
                locator: locator.clone(),
                entry_id: None,
            });
            st.loaded = false;
            st.time_pos_ms = 0;
            st.duration_ms = None;
            st.tracks.clear();
        }
        if let Err(e) = self.send(ipc::loadfile(&target)) {
            lock(&self.state)
                .queued
                .retain(|load| load.request_id != request_id);
            return Err(e);
        }
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), BackendError> {
        // mpv starts demuxing as soon as loadfile arrives.
        Ok(())
    }

    fn play(&mut self) -> Result<(), BackendError> {
        self.send(ipc::set_property("pause", json!(false)))
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.send(ipc::set_property("pause", json!(true)))
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<(), BackendError> {
        self.send(ipc::seek_absolute(position_ms))?;
        let mut st = lock(&self.state);
        st.time_pos_ms = match st.duration_ms {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        lock(&self.state).time_pos_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        lock(&self.state).duration_ms
    }

    fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    fn track_groups(&self) -> Vec<TrackGroupDescriptor> {
        let st = lock(&self.state);
        if !st.loaded {
            return Vec::new();
        }
        ipc::track_groups(&st.tracks)
    }

    fn set_track_override(
        &mut self,
        kind: TrackKind,
        group: GroupRef,
        _track_index: usize,
    ) -> Result<(), BackendError> {
        self.send(ipc::set_property(ipc::track_property(kind), json!(group.0)))
    }

    fn set_kind_disabled(&mut self, kind: TrackKind, disabled: bool) -> Result<(), BackendError> {
        let value = if disabled { "no" } else { "auto" };
        self.send(ipc::set_property(ipc::track_property(kind), json!(value)))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.send(ipc::quit()) {
            tracing::debug!("could not send quit to mpv: {e}");
        }
        self.released = true;
        // Stop reading first so the closing socket is not reported as a
        // playback failure.
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        // Dropping the only sender lets the writer flush `quit` and exit.
        let (closed, _) = mpsc::unbounded_channel();
        self.commands = closed;
        if let Some(mut process) = self.process.take() {
            process.start_kill();
        }
    }
}

impl Drop for MpvBackend {
    fn drop(&mut self) {
        self.release();
    }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut lines: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = lines.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::warn!("mpv IPC write failed: {e}");
            break;
        }
    }
    let _ = writer.shutdown().await;
}

async fn read_loop(reader: OwnedReadHalf, state: Arc<Mutex<MpvState>>, events: BackendEventSender) {
    let mut lines = BufReader::new(reader).lines();
    let reason = loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let message = match ipc::parse_message(&line) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::debug!("skipping mpv line: {e}");
                        continue;
                    }
                };
                let emitted = lock(&state).apply(message);
                for event in emitted {
                    let _ = events.send(event);
                }
            }
            Ok(None) => break "mpv IPC connection closed".to_string(),
            Err(e) => break format!("mpv IPC read failed: {e}"),
        }
    };
    tracing::warn!("{reason}");
    let _ = events.send(BackendEvent::Failed { reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::Lines;

    type FakeMpv = (Lines<BufReader<OwnedReadHalf>>, OwnedWriteHalf);

    async fn attach() -> (MpvBackend, FakeMpv, mpsc::UnboundedReceiver<BackendEvent>) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = MpvBackend::from_stream(ours, tx);
        let (read, write) = theirs.into_split();
        let mut lines = BufReader::new(read).lines();
        for (id, name) in OBSERVED_PROPERTIES {
            let command = next_command(&mut lines).await;
            assert_eq!(command, json!(["observe_property", id, name]));
        }
        (backend, (lines, write), rx)
    }

    async fn next_command(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> Value {
        let line = lines.next_line().await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        value["command"].clone()
    }

    #[tokio::test]
    async fn load_and_play_reaches_mpv_and_metadata_flows_back() {
        let (mut backend, (mut lines, mut mpv), mut events) = attach().await;
        let locator = SourceLocator::parse("/srv/media/river.mkv").unwrap();

        backend.load_source(&locator).unwrap();
        backend.prepare().unwrap();
        backend.play().unwrap();
        assert_eq!(
            next_command(&mut lines).await,
            json!(["loadfile", "/srv/media/river.mkv", "replace"])
        );
        assert_eq!(
            next_command(&mut lines).await,
            json!(["set_property", "pause", false])
        );

        mpv.write_all(
            concat!(
                r#"{"event":"property-change","id":1,"name":"pause","data":false}"#, "\n",
                r#"{"event":"start-file"}"#, "\n",
                r#"{"event":"file-loaded"}"#, "\n",
                r#"{"event":"property-change","id":3,"name":"duration","data":5400.5}"#, "\n",
                r#"{"event":"property-change","id":4,"name":"track-list","data":[{"id":1,"type":"audio","lang":"ben","codec":"ac3","selected":true},{"id":1,"type":"sub","title":"English","codec":"subrip"}]}"#, "\n",
            )
            .as_bytes(),
        )
        .await
        .unwrap();

        assert_eq!(
            events.recv().await,
            Some(BackendEvent::SourceReady {
                locator: locator.clone()
            })
        );
        assert_eq!(events.recv().await, Some(BackendEvent::PlayingChanged(true)));
        assert_eq!(events.recv().await, Some(BackendEvent::TracksChanged));

        assert!(backend.is_playing());
        assert_eq!(backend.duration_ms(), Some(5_400_500));
        let groups = backend.track_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].kind, TrackKind::Subtitle);
        assert_eq!(groups[1].tracks[0].label.as_deref(), Some("English"));
    }

    #[tokio::test]
    async fn end_file_error_is_a_load_failure() {
        let (mut backend, (mut lines, mut mpv), mut events) = attach().await;
        let locator = SourceLocator::parse("https://cdn.example.com/missing.mp4").unwrap();
        backend.load_source(&locator).unwrap();
        assert_eq!(
            next_command(&mut lines).await,
            json!(["loadfile", "https://cdn.example.com/missing.mp4", "replace"])
        );

        mpv.write_all(
            b"{\"event\":\"start-file\"}\n{\"event\":\"end-file\",\"reason\":\"error\",\"file_error\":\"loading failed\"}\n",
        )
        .await
        .unwrap();
        assert_eq!(
            events.recv().await,
            Some(BackendEvent::LoadFailed {
                locator,
                reason: "loading failed".into()
            })
        );
    }

    async fn feed(mpv: &mut OwnedWriteHalf, lines: &[&str]) {
        for line in lines {
            mpv.write_all(line.as_bytes()).await.unwrap();
            mpv.write_all(b"\n").await.unwrap();
        }
    }

    /// Collect backend events up to and including the first load failure.
    async fn until_load_failed(events: &mut mpsc::UnboundedReceiver<BackendEvent>) -> Vec<BackendEvent> {
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            let done = matches!(event, BackendEvent::LoadFailed { .. });
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn overlapping_loads_are_credited_to_their_own_file() {
        let (mut backend, (mut lines, mut mpv), mut events) = attach().await;
        let first = SourceLocator::parse("https://cdn.example.com/a.mp4").unwrap();
        let second = SourceLocator::parse("https://cdn.example.com/b.mp4").unwrap();
        backend.load_source(&first).unwrap();
        backend.load_source(&second).unwrap();
        next_command(&mut lines).await;
        next_command(&mut lines).await;

        // Request ids 1-5 went to the property observers.
        feed(
            &mut mpv,
            &[
                r#"{"request_id":6,"error":"success","data":{"playlist_entry_id":1}}"#,
                r#"{"request_id":7,"error":"success","data":{"playlist_entry_id":2}}"#,
                r#"{"event":"start-file","playlist_entry_id":1}"#,
                r#"{"event":"file-loaded"}"#,
                r#"{"event":"end-file","reason":"stop","playlist_entry_id":1}"#,
                r#"{"event":"start-file","playlist_entry_id":2}"#,
                r#"{"event":"end-file","reason":"error","file_error":"loading failed","playlist_entry_id":2}"#,
            ],
        )
        .await;

        let seen = until_load_failed(&mut events).await;
        assert_eq!(
            seen,
            vec![
                BackendEvent::SourceReady {
                    locator: first.clone()
                },
                BackendEvent::PlayingChanged(true),
                BackendEvent::PlayingChanged(false),
                BackendEvent::LoadFailed {
                    locator: second,
                    reason: "loading failed".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn loads_start_in_order_without_playlist_ids() {
        let (mut backend, (mut lines, mut mpv), mut events) = attach().await;
        let first = SourceLocator::parse("https://cdn.example.com/a.mp4").unwrap();
        let second = SourceLocator::parse("https://cdn.example.com/b.mp4").unwrap();
        backend.load_source(&first).unwrap();
        backend.load_source(&second).unwrap();
        next_command(&mut lines).await;
        next_command(&mut lines).await;

        feed(
            &mut mpv,
            &[
                r#"{"event":"start-file"}"#,
                r#"{"event":"file-loaded"}"#,
                r#"{"event":"start-file"}"#,
                r#"{"event":"end-file","reason":"error","file_error":"loading failed"}"#,
            ],
        )
        .await;

        let seen = until_load_failed(&mut events).await;
        assert_eq!(
            seen.first(),
            Some(&BackendEvent::SourceReady { locator: first })
        );
        assert_eq!(
            seen.last(),
            Some(&BackendEvent::LoadFailed {
                locator: second,
                reason: "loading failed".into()
            })
        );
    }

    #[tokio::test]
    async fn replaced_load_mpv_never_started_is_skipped() {
        let (mut backend, (mut lines, mut mpv), mut events) = attach().await;
        let first = SourceLocator::parse("https://cdn.example.com/a.mp4").unwrap();
        let second = SourceLocator::parse("https://cdn.example.com/b.mp4").unwrap();
        backend.load_source(&first).unwrap();
        backend.load_source(&second).unwrap();
        next_command(&mut lines).await;
        next_command(&mut lines).await;

        feed(
            &mut mpv,
            &[
                r#"{"request_id":6,"error":"success","data":{"playlist_entry_id":1}}"#,
                r#"{"request_id":7,"error":"success","data":{"playlist_entry_id":2}}"#,
                r#"{"event":"start-file","playlist_entry_id":2}"#,
                r#"{"event":"file-loaded"}"#,
            ],
        )
        .await;

        assert_eq!(
            events.recv().await,
            Some(BackendEvent::SourceReady { locator: second })
        );
    }

    #[tokio::test]
    async fn rejected_loadfile_is_a_load_failure() {
        let (mut backend, (mut lines, mut mpv), mut events) = attach().await;
        let locator = SourceLocator::parse("rtsp://camera.local/stream").unwrap();
        backend.load_source(&locator).unwrap();
        next_command(&mut lines).await;

        feed(&mut mpv, &[r#"{"request_id":6,"error":"invalid parameter","data":null}"#]).await;
        assert_eq!(
            events.recv().await,
            Some(BackendEvent::LoadFailed {
                locator,
                reason: "invalid parameter".into()
            })
        );
    }

    #[tokio::test]
    async fn content_locators_are_unsupported() {
        let (mut backend, _mpv, _events) = attach().await;
        let locator = SourceLocator::parse("content://media/external/video/media/31").unwrap();
        assert!(matches!(
            backend.load_source(&locator),
            Err(BackendError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn superseded_load_failure_still_reaches_the_ui() {
        use aparajito_bridge::{Bridge, BridgeConfig, EventBus};
        use aparajito_models::gateway::{PlaybackErrorKind, UiCommand, UiEvent};

        let (ours, theirs) = UnixStream::pair().unwrap();
        let (tx, mut events) = mpsc::unbounded_channel();
        let backend = MpvBackend::from_stream(ours, tx);
        let (read, mut mpv) = theirs.into_split();
        let mut lines = BufReader::new(read).lines();
        for _ in OBSERVED_PROPERTIES {
            next_command(&mut lines).await;
        }

        let mut bridge = Bridge::new(Box::new(backend), EventBus::new(32), BridgeConfig::default());
        let mut ui = bridge.bus().subscribe();
        bridge.handle(UiCommand::LoadAndPlay {
            uri: "https://cdn.example.com/a.mp4".into(),
        });
        bridge.handle(UiCommand::LoadAndPlay {
            uri: "https://cdn.example.com/b.mp4".into(),
        });

        feed(
            &mut mpv,
            &[
                r#"{"event":"start-file"}"#,
                r#"{"event":"file-loaded"}"#,
                r#"{"event":"end-file","reason":"stop"}"#,
                r#"{"event":"start-file"}"#,
                r#"{"event":"end-file","reason":"error","file_error":"loading failed"}"#,
            ],
        )
        .await;
        for event in until_load_failed(&mut events).await {
            bridge.on_backend_event(event);
        }

        let mut failures = Vec::new();
        while let Ok(event) = ui.try_recv() {
            if let UiEvent::PlaybackError { kind, uri, .. } = event {
                failures.push((kind, uri));
            }
        }
        assert_eq!(
            failures,
            vec![(
                PlaybackErrorKind::SourceLoadFailure,
                Some("https://cdn.example.com/b.mp4".into())
            )]
        );
        assert_eq!(bridge.snapshot().current_source_uri, None);
    }

    #[tokio::test]
    async fn track_commands_use_mpv_ids() {
        let (mut backend, (mut lines, _mpv), _events) = attach().await;
        backend
            .set_track_override(TrackKind::Audio, GroupRef(2), 0)
            .unwrap();
        backend.set_kind_disabled(TrackKind::Subtitle, true).unwrap();
        backend.set_kind_disabled(TrackKind::Subtitle, false).unwrap();
        backend.seek_to(61_250).unwrap();

        assert_eq!(
            next_command(&mut lines).await,
            json!(["set_property", "aid", 2])
        );
        assert_eq!(
            next_command(&mut lines).await,
            json!(["set_property", "sid", "no"])
        );
        assert_eq!(
            next_command(&mut lines).await,
            json!(["set_property", "sid", "auto"])
        );
        assert_eq!(
            next_command(&mut lines).await,
            json!(["seek", 61.25, "absolute"])
        );
        assert_eq!(backend.position_ms(), 61_250);
    }

    #[tokio::test]
    async fn release_sends_quit_and_refuses_further_commands() {
        let (mut backend, (mut lines, _mpv), mut events) = attach().await;
        backend.release();
        assert_eq!(next_command(&mut lines).await, json!(["quit"]));
        assert_eq!(lines.next_line().await.unwrap(), None);
        assert_eq!(backend.play(), Err(BackendError::Released));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn lost_connection_is_reported() {
        let (_backend, (lines, mpv), mut events) = attach().await;
        drop(lines);
        drop(mpv);
        match events.recv().await {
            Some(BackendEvent::Failed { reason }) => assert!(reason.contains("closed")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn idle_mpv_is_not_playing() {
        let mut state = MpvState {
            loaded: true,
            ..Default::default()
        };
        let events = state.apply(MpvMessage::PropertyChange {
            name: "idle-active".into(),
            data: json!(false),
        });
        assert_eq!(events, vec![BackendEvent::PlayingChanged(true)]);
        let events = state.apply(MpvMessage::PropertyChange {
            name: "idle-active".into(),
            data: json!(true),
        });
        assert_eq!(events, vec![BackendEvent::PlayingChanged(false)]);
    }
}
