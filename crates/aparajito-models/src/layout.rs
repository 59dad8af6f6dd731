use serde::{Deserialize, Serialize};

/// Share of the screen height the player keeps in portrait mode. The rest is
/// left to the web UI underneath it.
pub const DEFAULT_PORTRAIT_HEIGHT_FRACTION: f32 = 0.40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Portrait,
    Landscape,
}

impl LayoutMode {
    pub fn from_landscape_flag(is_landscape: bool) -> Self {
        if is_landscape {
            LayoutMode::Landscape
        } else {
            LayoutMode::Portrait
        }
    }
}

/// Visibility of the status and navigation bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SystemBars {
    Visible,
    /// Hidden; an edge swipe reveals them temporarily when `transient_reveal`.
    Immersive { transient_reveal: bool },
}

/// Everything the host window has to change for one layout mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInstruction {
    pub mode: LayoutMode,
    pub orientation_lock: LayoutMode,
    pub player_height_fraction: f32,
    pub system_bars: SystemBars,
}
