use aparajito_models::layout::{
    LayoutInstruction, LayoutMode, SystemBars, DEFAULT_PORTRAIT_HEIGHT_FRACTION,
};

/// Portrait/landscape switch driven only by explicit UI requests. Physical
/// rotation is ignored because the UI's own layout has to change with it.
#[derive(Debug, Clone)]
pub struct LayoutController {
    mode: LayoutMode,
    portrait_height_fraction: f32,
}

impl LayoutController {
    pub fn new(portrait_height_fraction: f32) -> Self {
        let fraction = if portrait_height_fraction > 0.0 && portrait_height_fraction < 1.0 {
            portrait_height_fraction
        } else {
            tracing::warn!(
                "portrait height fraction {portrait_height_fraction} outside (0, 1), using {DEFAULT_PORTRAIT_HEIGHT_FRACTION}"
            );
            DEFAULT_PORTRAIT_HEIGHT_FRACTION
        };
        Self {
            mode: LayoutMode::Portrait,
            portrait_height_fraction: fraction,
        }
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    /// The instruction describing the current mode.
    pub fn instruction(&self) -> LayoutInstruction {
        match self.mode {
            LayoutMode::Landscape => LayoutInstruction {
                mode: LayoutMode::Landscape,
                orientation_lock: LayoutMode::Landscape,
                player_height_fraction: 1.0,
                system_bars: SystemBars::Immersive {
                    transient_reveal: true,
                },
            },
            LayoutMode::Portrait => LayoutInstruction {
                mode: LayoutMode::Portrait,
                orientation_lock: LayoutMode::Portrait,
                player_height_fraction: self.portrait_height_fraction,
                system_bars: SystemBars::Visible,
            },
        }
    }

    /// Move to `mode`. Returns the instruction to apply, or `None` when
    /// already there.
    pub fn request(&mut self, mode: LayoutMode) -> Option<LayoutInstruction> {
        if self.mode == mode {
            return None;
        }
        tracing::info!(from = ?self.mode, to = ?mode, "layout mode change");
        self.mode = mode;
        Some(self.instruction())
    }
}

impl Default for LayoutController {
    fn default() -> Self {
        Self::new(DEFAULT_PORTRAIT_HEIGHT_FRACTION)
    }
}
