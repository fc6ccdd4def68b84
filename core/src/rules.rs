use serde::{Deserialize, Serialize};

pub const SNAP_DISTANCE_RATIO_DEFAULT: f32 = 0.22;
pub const SNAP_DISTANCE_RATIO_MIN: f32 = 0.05;
pub const SNAP_DISTANCE_RATIO_MAX: f32 = 0.35;

pub const TRAY_WIDTH_RATIO_DEFAULT: f32 = 0.32;
pub const TRAY_WIDTH_RATIO_MIN: f32 = 0.15;
pub const TRAY_WIDTH_RATIO_MAX: f32 = 0.5;

pub const WORKSPACE_WIDTH_DEFAULT: f32 = 1280.0;
pub const WORKSPACE_HEIGHT_DEFAULT: f32 = 720.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayRules {
    /// Snap tolerance as a fraction of the smaller piece side.
    pub snap_distance_ratio: f32,
    pub tray_width_ratio: f32,
    pub workspace_width: f32,
    pub workspace_height: f32,
}

impl PlayRules {
    pub fn sanitized(self) -> Self {
        Self {
            snap_distance_ratio: clamp_or(
                self.snap_distance_ratio,
                SNAP_DISTANCE_RATIO_MIN,
                SNAP_DISTANCE_RATIO_MAX,
                SNAP_DISTANCE_RATIO_DEFAULT,
            ),
            tray_width_ratio: clamp_or(
                self.tray_width_ratio,
                TRAY_WIDTH_RATIO_MIN,
                TRAY_WIDTH_RATIO_MAX,
                TRAY_WIDTH_RATIO_DEFAULT,
            ),
            workspace_width: positive_or(self.workspace_width, WORKSPACE_WIDTH_DEFAULT),
            workspace_height: positive_or(self.workspace_height, WORKSPACE_HEIGHT_DEFAULT),
        }
    }
}

impl Default for PlayRules {
    fn default() -> Self {
        Self {
            snap_distance_ratio: SNAP_DISTANCE_RATIO_DEFAULT,
            tray_width_ratio: TRAY_WIDTH_RATIO_DEFAULT,
            workspace_width: WORKSPACE_WIDTH_DEFAULT,
            workspace_height: WORKSPACE_HEIGHT_DEFAULT,
        }
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}
