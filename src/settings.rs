//! Solver settings and precision presets
//!
//! Loaded from JSON by the host game; every field has a default so partial
//! documents are accepted.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Precision preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PrecisionPreset {
    Low,
    Medium,
    #[default]
    High,
}

impl PrecisionPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecisionPreset::Low => "Low",
            PrecisionPreset::Medium => "Medium",
            PrecisionPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(PrecisionPreset::Low),
            "medium" | "med" => Some(PrecisionPreset::Medium),
            "high" => Some(PrecisionPreset::High),
            _ => None,
        }
    }

    /// Sub-steps per frame for this preset
    pub fn sub_steps(&self) -> u32 {
        match self {
            PrecisionPreset::Low => 2,
            PrecisionPreset::Medium => 4,
            PrecisionPreset::High => DEFAULT_SUB_STEPS,
        }
    }
}

/// Solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Precision preset the sub-step count was derived from
    pub precision: PrecisionPreset,

    // === Timing ===
    /// Frames per second; one `update()` advances 1 / frame_rate seconds
    pub frame_rate: u32,
    /// Sub-steps per `update()`
    pub sub_steps: u32,

    // === Forces ===
    /// Constant acceleration applied to every particle
    pub gravity: Vec2,
    /// Multiplier on the radial push force
    pub push_strength: f32,
    /// Wind zones only act while enabled
    pub wind_enabled: bool,

    // === Constraints ===
    /// Strength used when a constraint is added without one
    pub constraint_strength: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            precision: PrecisionPreset::High,

            frame_rate: DEFAULT_FRAMERATE,
            sub_steps: DEFAULT_SUB_STEPS,

            gravity: DEFAULT_GRAVITY,
            push_strength: 1.0,
            wind_enabled: false,

            constraint_strength: 1.0,
        }
    }
}

impl SolverSettings {
    /// Create settings from a precision preset (applies preset defaults)
    pub fn from_preset(preset: PrecisionPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a precision preset (updates the sub-step count)
    pub fn apply_preset(&mut self, preset: PrecisionPreset) {
        self.precision = preset;
        self.sub_steps = preset.sub_steps();
    }

    /// Seconds per frame
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.frame_rate.max(1) as f32
    }

    /// Seconds per sub-step
    pub fn step_dt(&self) -> f32 {
        self.frame_dt() / self.sub_steps.max(1) as f32
    }

    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize settings to a JSON document
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse settings, falling back to defaults on malformed input
    pub fn load_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(settings) => {
                log::info!(
                    "Loaded solver settings ({} Hz, {} sub-steps)",
                    settings.frame_rate,
                    settings.sub_steps
                );
                settings
            }
            Err(e) => {
                log::warn!("Invalid solver settings ({}), using defaults", e);
                Self::default()
            }
        }
    }
}
