use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
///
/// Every section falls back to its defaults, so a config file only needs to
/// name the values it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gesture: GestureConfig,
    pub detection: DetectionConfig,
    pub carousel: CarouselConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Thresholds used by the gesture classifier. Distances are in input units
/// (screen points), times in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Displacement a contact must exceed before its axis is decided.
    pub lock_distance: f32,
    /// Accumulated horizontal travel that produces one swipe.
    pub swipe_distance: f32,
    /// Vertical displacement that produces a scroll event.
    pub vertical_distance: f32,
    /// Squared acceleration magnitude that counts as a shake.
    pub shake_threshold: f32,
    pub shakes_to_delete: u32,
    /// Maximum quiet time between shakes of one delete gesture.
    pub shake_window_seconds: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            lock_distance: 200.0,
            swipe_distance: 500.0,
            vertical_distance: 700.0,
            shake_threshold: 50.0,
            shakes_to_delete: 2,
            shake_window_seconds: 1.0,
        }
    }
}

/// Timings of the detection session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub fade_in_seconds: f32,
    /// How long the camera fade lock stays held after streaming begins.
    pub reveal_seconds: f32,
    pub first_capture_delay_seconds: f32,
    pub retry_delay_seconds: f32,
    pub cooldown_seconds: f32,
    pub fade_out_seconds: f32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fade_in_seconds: 0.5,
            reveal_seconds: 2.0,
            first_capture_delay_seconds: 3.0,
            retry_delay_seconds: 2.0,
            cooldown_seconds: 2.0,
            fade_out_seconds: 2.0,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

/// Layout and animation settings for the page carousel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    /// Page spacing at the reference width of 1080 points.
    pub base_page_spacing: f32,
    pub viewport_width: f32,
    pub transition_seconds: f32,
    pub shift_seconds: f32,
}

impl CarouselConfig {
    pub const REFERENCE_WIDTH: f32 = 1080.0;

    /// Page spacing scaled to the configured viewport.
    pub fn page_spacing(&self) -> f32 {
        self.base_page_spacing * (self.viewport_width / Self::REFERENCE_WIDTH)
    }
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            base_page_spacing: 1200.0,
            viewport_width: Self::REFERENCE_WIDTH,
            transition_seconds: 0.8,
            shift_seconds: 0.5,
        }
    }
}

/// Orchestrator-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Input is ignored for this long after startup.
    pub warmup_seconds: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warmup_seconds: 1.0,
        }
    }
}
