//! Messages exchanged between the UI surface and the playback bridge.
//!
//! Both directions are JSON objects. UI commands are tagged by `op`, bridge
//! notifications by `event`.

use serde::{Deserialize, Serialize};

use crate::layout::LayoutInstruction;
use crate::track::{TrackEntry, TrackKind};

/// `selectTrack` group index that disables the kind entirely.
pub const GROUP_INDEX_NONE: i64 = -1;

/// MIME filter passed to the file picker for local media.
pub const VIDEO_MIME_FILTER: &str = "video/*";

// UI -> bridge command names
pub const OP_LOAD_AND_PLAY: &str = "loadAndPlay";
pub const OP_HIDE: &str = "hide";
pub const OP_PLAY: &str = "play";
pub const OP_PAUSE: &str = "pause";
pub const OP_SEEK: &str = "seek";
pub const OP_SET_ORIENTATION: &str = "setOrientation";
pub const OP_LIST_TRACKS: &str = "listTracks";
pub const OP_SELECT_TRACK: &str = "selectTrack";
pub const OP_NEXT_TRACK: &str = "nextTrack";
pub const OP_PICK_LOCAL_FILE: &str = "pickLocalFile";

// Bridge -> UI event names
pub const EVENT_READY: &str = "ready";
pub const EVENT_UPDATE_TIMELINE: &str = "updateTimeline";
pub const EVENT_SET_PLAY_STATE: &str = "setPlayState";
pub const EVENT_HANDLE_LOCAL_FILE_SELECTION: &str = "handleLocalFileSelection";
pub const EVENT_PLAYBACK_ERROR: &str = "playbackError";
pub const EVENT_APPLY_LAYOUT: &str = "applyLayout";
pub const EVENT_TRACK_LIST: &str = "trackList";

/// A command issued by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiCommand {
    LoadAndPlay {
        uri: String,
    },
    Hide,
    Play,
    Pause,
    /// Signed so that a negative target can be rejected instead of failing
    /// to parse.
    Seek {
        ms: i64,
    },
    SetOrientation {
        is_landscape: bool,
    },
    ListTracks {
        kind: TrackKind,
    },
    SelectTrack {
        kind: TrackKind,
        group_index: i64,
        track_index: i64,
    },
    /// Advance to the next playable group of `kind`.
    NextTrack {
        kind: TrackKind,
    },
    PickLocalFile,
}

impl UiCommand {
    pub fn name(&self) -> &'static str {
        match self {
            UiCommand::LoadAndPlay { .. } => OP_LOAD_AND_PLAY,
            UiCommand::Hide => OP_HIDE,
            UiCommand::Play => OP_PLAY,
            UiCommand::Pause => OP_PAUSE,
            UiCommand::Seek { .. } => OP_SEEK,
            UiCommand::SetOrientation { .. } => OP_SET_ORIENTATION,
            UiCommand::ListTracks { .. } => OP_LIST_TRACKS,
            UiCommand::SelectTrack { .. } => OP_SELECT_TRACK,
            UiCommand::NextTrack { .. } => OP_NEXT_TRACK,
            UiCommand::PickLocalFile => OP_PICK_LOCAL_FILE,
        }
    }
}

/// Envelope for a UI command. `nonce` is echoed on replies so the UI can
/// match a `trackList` to the `listTracks` that asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(flatten)]
    pub command: UiCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackErrorKind {
    /// The source could not be opened. The session keeps its previous source.
    SourceLoadFailure,
    /// The engine rejected a transport command or failed mid-playback.
    Backend,
}

/// What a freshly connected UI needs to render the current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_source_uri: Option<String>,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub is_native_mode_active: bool,
    pub layout: LayoutInstruction,
}

/// A notification from the bridge to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiEvent {
    Ready {
        session: SessionSnapshot,
    },
    UpdateTimeline {
        position_ms: u64,
        duration_ms: u64,
    },
    SetPlayState {
        is_playing: bool,
    },
    HandleLocalFileSelection {
        uri: String,
    },
    PlaybackError {
        kind: PlaybackErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
    },
    ApplyLayout(LayoutInstruction),
    TrackList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
        kind: TrackKind,
        tracks: Vec<TrackEntry>,
    },
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::Ready { .. } => EVENT_READY,
            UiEvent::UpdateTimeline { .. } => EVENT_UPDATE_TIMELINE,
            UiEvent::SetPlayState { .. } => EVENT_SET_PLAY_STATE,
            UiEvent::HandleLocalFileSelection { .. } => EVENT_HANDLE_LOCAL_FILE_SELECTION,
            UiEvent::PlaybackError { .. } => EVENT_PLAYBACK_ERROR,
            UiEvent::ApplyLayout(_) => EVENT_APPLY_LAYOUT,
            UiEvent::TrackList { .. } => EVENT_TRACK_LIST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutMode, SystemBars};
    use serde_json::json;

    #[test]
    fn parse_select_track_with_nonce() {
        let raw = json!({
            "op": "selectTrack",
            "nonce": "n-1",
            "kind": "sub",
            "groupIndex": -1,
            "trackIndex": 0
        });
        let msg: InboundMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.nonce.as_deref(), Some("n-1"));
        assert_eq!(
            msg.command,
            UiCommand::SelectTrack {
                kind: TrackKind::Subtitle,
                group_index: GROUP_INDEX_NONE,
                track_index: 0,
            }
        );
    }

    #[test]
    fn parse_unit_commands_without_nonce() {
        let msg: InboundMessage = serde_json::from_str(r#"{"op":"hide"}"#).unwrap();
        assert_eq!(msg.nonce, None);
        assert_eq!(msg.command, UiCommand::Hide);

        let msg: InboundMessage =
            serde_json::from_str(r#"{"op":"setOrientation","isLandscape":true}"#).unwrap();
        assert_eq!(
            msg.command,
            UiCommand::SetOrientation { is_landscape: true }
        );
    }

    #[test]
    fn unknown_op_is_rejected() {
        let parsed = serde_json::from_str::<InboundMessage>(r#"{"op":"rewind"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn command_names_match_wire_tags() {
        let cmd = UiCommand::Seek { ms: 1500 };
        let v = serde_json::to_value(&cmd).unwrap();
        assert_eq!(v["op"], cmd.name());
        assert_eq!(v["ms"], 1500);
    }

    #[test]
    fn timeline_event_shape() {
        let event = UiEvent::UpdateTimeline {
            position_ms: 1200,
            duration_ms: 60_000,
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(
            v,
            json!({"event": "updateTimeline", "positionMs": 1200, "durationMs": 60000})
        );
    }

    #[test]
    fn layout_event_flattens_instruction() {
        let event = UiEvent::ApplyLayout(LayoutInstruction {
            mode: LayoutMode::Landscape,
            orientation_lock: LayoutMode::Landscape,
            player_height_fraction: 1.0,
            system_bars: SystemBars::Immersive {
                transient_reveal: true,
            },
        });
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["event"], EVENT_APPLY_LAYOUT);
        assert_eq!(v["mode"], "landscape");
        assert_eq!(v["orientationLock"], "landscape");
        assert_eq!(v["playerHeightFraction"], 1.0);
        assert_eq!(v["systemBars"]["state"], "immersive");
    }

    #[test]
    fn playback_error_omits_missing_uri() {
        let event = UiEvent::PlaybackError {
            kind: PlaybackErrorKind::Backend,
            message: "engine stalled".into(),
            uri: None,
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["kind"], "backend");
        assert!(v.get("uri").is_none());
    }
}
