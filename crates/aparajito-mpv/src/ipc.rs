//! mpv JSON IPC framing: one JSON object per line in each direction.

use aparajito_bridge::backend::{GroupRef, TrackDescriptor, TrackGroupDescriptor};
use aparajito_models::track::TrackKind;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::MpvError;

/// Properties the backend observes, with the observer ids it registers.
pub const OBSERVED_PROPERTIES: [(u64, &str); 5] = [
    (1, "pause"),
    (2, "time-pos"),
    (3, "duration"),
    (4, "track-list"),
    (5, "idle-active"),
];

/// Encode one command line, newline included.
pub fn encode(command: &[Value], request_id: u64) -> String {
    let mut line = json!({ "command": command, "request_id": request_id }).to_string();
    line.push('\n');
    line
}

pub fn loadfile(target: &str) -> Vec<Value> {
    vec![json!("loadfile"), json!(target), json!("replace")]
}

pub fn set_property(name: &str, value: Value) -> Vec<Value> {
    vec![json!("set_property"), json!(name), value]
}

pub fn observe_property(id: u64, name: &str) -> Vec<Value> {
    vec![json!("observe_property"), json!(id), json!(name)]
}

pub fn seek_absolute(position_ms: u64) -> Vec<Value> {
    vec![
        json!("seek"),
        json!(position_ms as f64 / 1000.0),
        json!("absolute"),
    ]
}

pub fn quit() -> Vec<Value> {
    vec![json!("quit")]
}

/// The per-kind track property (`aid` / `sid`).
pub fn track_property(kind: TrackKind) -> &'static str {
    match kind {
        TrackKind::Audio => "aid",
        TrackKind::Subtitle => "sid",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MpvMessage {
    Reply {
        request_id: u64,
        error: String,
        data: Value,
    },
    PropertyChange {
        name: String,
        data: Value,
    },
    /// mpv began opening a playlist entry. Older mpv omits the id.
    StartFile {
        playlist_entry_id: Option<i64>,
    },
    FileLoaded,
    EndFile {
        reason: String,
        file_error: Option<String>,
        playlist_entry_id: Option<i64>,
    },
    /// Any other event, by name.
    Event(String),
}

#[derive(Deserialize)]
struct RawMessage {
    event: Option<String>,
    name: Option<String>,
    #[serde(default)]
    data: Value,
    request_id: Option<u64>,
    error: Option<String>,
    reason: Option<String>,
    file_error: Option<String>,
    playlist_entry_id: Option<i64>,
}

pub fn parse_message(line: &str) -> Result<MpvMessage, MpvError> {
    let raw: RawMessage =
        serde_json::from_str(line.trim()).map_err(|e| MpvError::Protocol(e.to_string()))?;

    match raw.event.as_deref() {
        Some("property-change") => Ok(MpvMessage::PropertyChange {
            name: raw
                .name
                .ok_or_else(|| MpvError::Protocol("property-change without name".into()))?,
            data: raw.data,
        }),
        Some("start-file") => Ok(MpvMessage::StartFile {
            playlist_entry_id: raw.playlist_entry_id,
        }),
        Some("file-loaded") => Ok(MpvMessage::FileLoaded),
        Some("end-file") => Ok(MpvMessage::EndFile {
            reason: raw.reason.unwrap_or_default(),
            file_error: raw.file_error,
            playlist_entry_id: raw.playlist_entry_id,
        }),
        Some(other) => Ok(MpvMessage::Event(other.to_string())),
        None => match (raw.request_id, raw.error) {
            (Some(request_id), Some(error)) => Ok(MpvMessage::Reply {
                request_id,
                error,
                data: raw.data,
            }),
            _ => Err(MpvError::Protocol(format!("unrecognised message {line:?}"))),
        },
    }
}

/// One entry of mpv's `track-list` property.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MpvTrack {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub lang: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub selected: bool,
    pub codec: Option<String>,
}

pub fn parse_track_list(data: &Value) -> Vec<MpvTrack> {
    match serde_json::from_value::<Vec<MpvTrack>>(data.clone()) {
        Ok(tracks) => tracks,
        Err(e) => {
            tracing::warn!("ignoring malformed track-list: {e}");
            Vec::new()
        }
    }
}

fn kind_of(track: &MpvTrack) -> Option<TrackKind> {
    match track.kind.as_str() {
        "audio" => Some(TrackKind::Audio),
        "sub" => Some(TrackKind::Subtitle),
        _ => None,
    }
}

/// mpv has no track groups; every audio or subtitle track becomes a
/// one-track group keyed by its mpv id. Tracks without a codec can't be
/// decoded.
pub fn track_groups(tracks: &[MpvTrack]) -> Vec<TrackGroupDescriptor> {
    tracks
        .iter()
        .filter_map(|track| {
            let kind = kind_of(track)?;
            Some(TrackGroupDescriptor {
                kind,
                group_ref: GroupRef(track.id),
                tracks: vec![TrackDescriptor {
                    label: track.title.clone(),
                    language: track.lang.clone(),
                    supported: track.codec.is_some(),
                    selected: track.selected,
                }],
            })
        })
        .collect()
}
