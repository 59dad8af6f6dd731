//! Track enumeration and selection.
//!
//! Track groups are re-projected from the backend on every request; nothing
//! here caches engine metadata. Selection state only remembers what the UI
//! asked for so that cyclic advance knows where to continue from.

use aparajito_models::track::{TrackEntry, TrackKind};

use crate::backend::{GroupRef, TrackGroupDescriptor};
use crate::error::BridgeError;

/// Language tag engines use for "unknown".
const UNDETERMINED_LANGUAGE: &str = "und";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub index: usize,
    pub label: String,
    pub is_supported: bool,
    pub is_selected: bool,
}

/// Read-only view of one backend group, indexed among groups of its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackGroup {
    pub kind: TrackKind,
    pub group_index: usize,
    pub group_ref: GroupRef,
    pub tracks: Vec<TrackInfo>,
    pub is_currently_selected: bool,
}

impl TrackGroup {
    /// A group is playable when the device can decode at least one of its
    /// tracks.
    pub fn is_supported(&self) -> bool {
        self.tracks.iter().any(|t| t.is_supported)
    }
}

/// Display label: explicit label, else language code, else `"<kind> <n>"`
/// where `n` is the 1-based position of the track within its kind.
pub fn derive_label(
    kind: TrackKind,
    label: Option<&str>,
    language: Option<&str>,
    ordinal: usize,
) -> String {
    let usable = |s: &&str| !s.trim().is_empty();
    if let Some(label) = label.filter(usable) {
        return label.trim().to_string();
    }
    if let Some(language) = language
        .filter(usable)
        .filter(|l| !l.eq_ignore_ascii_case(UNDETERMINED_LANGUAGE))
    {
        return language.trim().to_string();
    }
    format!("{kind} {ordinal}")
}

/// Project the backend's groups of `kind` into [`TrackGroup`]s.
pub fn project(kind: TrackKind, groups: &[TrackGroupDescriptor]) -> Vec<TrackGroup> {
    let mut ordinal = 0;
    groups
        .iter()
        .filter(|g| g.kind == kind)
        .enumerate()
        .map(|(group_index, group)| {
            let tracks: Vec<TrackInfo> = group
                .tracks
                .iter()
                .enumerate()
                .map(|(index, track)| {
                    ordinal += 1;
                    TrackInfo {
                        index,
                        label: derive_label(
                            kind,
                            track.label.as_deref(),
                            track.language.as_deref(),
                            ordinal,
                        ),
                        is_supported: track.supported,
                        is_selected: track.selected,
                    }
                })
                .collect();
            TrackGroup {
                kind,
                group_index,
                group_ref: group.group_ref,
                is_currently_selected: tracks.iter().any(|t| t.is_selected),
                tracks,
            }
        })
        .collect()
}

/// Flatten groups into the rows the UI renders.
pub fn entries(groups: &[TrackGroup]) -> Vec<TrackEntry> {
    groups
        .iter()
        .flat_map(|group| {
            group.tracks.iter().map(move |track| TrackEntry {
                group_index: group.group_index,
                track_index: track.index,
                label: track.label.clone(),
                selected: track.is_selected,
            })
        })
        .collect()
}

/// What the UI last asked for, per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackSelection {
    /// No explicit choice; the engine picks.
    #[default]
    Automatic,
    Disabled,
    Enabled {
        group_index: usize,
        track_index: usize,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    audio: TrackSelection,
    subtitle: TrackSelection,
}

impl SelectionState {
    pub fn get(&self, kind: TrackKind) -> TrackSelection {
        match kind {
            TrackKind::Audio => self.audio,
            TrackKind::Subtitle => self.subtitle,
        }
    }

    pub fn set(&mut self, kind: TrackKind, selection: TrackSelection) {
        match kind {
            TrackKind::Audio => self.audio = selection,
            TrackKind::Subtitle => self.subtitle = selection,
        }
    }

    /// Drop pinned groups after the track topology changed. Disablement
    /// survives because it does not refer to a group.
    pub fn forget_pinned(&mut self) {
        for kind in TrackKind::ALL {
            if matches!(self.get(kind), TrackSelection::Enabled { .. }) {
                self.set(kind, TrackSelection::Automatic);
            }
        }
    }
}

/// The change the router has to apply to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Disable,
    /// Re-enable the kind and let the engine choose.
    Automatic,
    Enable {
        group_index: usize,
        track_index: usize,
        group_ref: GroupRef,
    },
}

impl Resolution {
    pub fn selection(&self) -> TrackSelection {
        match *self {
            Resolution::Disable => TrackSelection::Disabled,
            Resolution::Automatic => TrackSelection::Automatic,
            Resolution::Enable {
                group_index,
                track_index,
                ..
            } => TrackSelection::Enabled {
                group_index,
                track_index,
            },
        }
    }
}

/// Explicit `selectTrack`. `group_index == -1` disables the kind.
pub fn resolve_explicit(
    kind: TrackKind,
    group_index: i64,
    track_index: i64,
    groups: &[TrackGroup],
) -> Result<Resolution, BridgeError> {
    if group_index == aparajito_models::gateway::GROUP_INDEX_NONE {
        return Ok(Resolution::Disable);
    }

    let group = usize::try_from(group_index)
        .ok()
        .and_then(|gi| groups.get(gi))
        .ok_or_else(|| {
            BridgeError::InvalidCommandArgument(format!(
                "{kind} group {group_index} out of range ({} groups)",
                groups.len()
            ))
        })?;
    let track = usize::try_from(track_index)
        .ok()
        .and_then(|ti| group.tracks.get(ti))
        .ok_or_else(|| {
            BridgeError::InvalidCommandArgument(format!(
                "{kind} track {track_index} out of range in group {group_index} ({} tracks)",
                group.tracks.len()
            ))
        })?;

    Ok(Resolution::Enable {
        group_index: group.group_index,
        track_index: track.index,
        group_ref: group.group_ref,
    })
}

/// Index of the next supported group after `current`, wrapping around.
fn next_supported_group(
    kind: TrackKind,
    current: Option<usize>,
    groups: &[TrackGroup],
) -> Result<usize, BridgeError> {
    let start = current.map_or(0, |c| c + 1).min(groups.len());
    (start..groups.len())
        .chain(0..start)
        .find(|&i| groups[i].is_supported())
        .ok_or(BridgeError::TrackResolutionEmpty(kind))
}

/// Cyclic advance. Never a no-op: with nothing playable it toggles the
/// kind's disablement instead.
pub fn resolve_next(kind: TrackKind, current: TrackSelection, groups: &[TrackGroup]) -> Resolution {
    let current_group = match current {
        TrackSelection::Enabled { group_index, .. } => Some(group_index),
        _ => None,
    };

    match next_supported_group(kind, current_group, groups) {
        Ok(group_index) => Resolution::Enable {
            group_index,
            track_index: 0,
            group_ref: groups[group_index].group_ref,
        },
        Err(e) => {
            tracing::debug!(kind = %kind, "{e}; toggling instead");
            match current {
                TrackSelection::Disabled => Resolution::Automatic,
                _ => Resolution::Disable,
            }
        }
    }
}
