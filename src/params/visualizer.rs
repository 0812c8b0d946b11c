//! Lyric visualizer configuration.
//!
//! The visualizer settings are persisted as a versioned JSON document. Older
//! installs stored them as flat `lyricVisualizer*` keys inside the player
//! state; both shapes go through the same default-fill and clamping step on
//! load, so a partially written or hand-edited file never yields values the
//! analyser cannot use.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::Result;

/// Current on-disk schema version
pub const CONFIG_VERSION: u32 = 1;

/// Highest frequency a bar range may reach (Hz)
const MAX_FREQUENCY_HZ: f32 = 22050.0;

/// Visual layout of the bars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizerStyle {
    #[default]
    Bars,
    Radial,
}

/// Visualizer settings read by the analysis core
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerConfig {
    pub enabled: bool,

    /// Canvas height (pixels), 60..=600
    pub height: f32,

    /// Lowest frequency shown (Hz)
    pub frequency_min: f32,

    /// Highest frequency shown (Hz)
    pub frequency_max: f32,

    /// Analyser smoothing between frames, 0.0..=0.99
    pub transition_delay: f32,

    /// Number of bars, 1..=256
    pub bar_count: u32,

    /// Bar width as a percentage of its slot, 1..=100
    pub bar_width: f32,

    pub color: String,

    /// Opacity percentage, 0..=100
    pub opacity: f32,

    pub style: VisualizerStyle,

    /// Radial layout size percentage, 10..=300
    pub radial_size: f32,

    /// Radial center offset (percent of canvas), -100..=100
    pub radial_offset_x: f32,
    pub radial_offset_y: f32,

    /// Inner radius as a percentage of the radial size, 0..=100
    pub radial_core_size: f32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            height: 220.0,
            frequency_min: 20.0,
            frequency_max: 8000.0,
            transition_delay: 0.75,
            bar_count: 48,
            bar_width: 55.0,
            color: "black".to_string(),
            opacity: 100.0,
            style: VisualizerStyle::Bars,
            radial_size: 100.0,
            radial_offset_x: 0.0,
            radial_offset_y: 0.0,
            radial_core_size: 62.0,
        }
    }
}

/// Versioned document with every field optional
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredConfig {
    version: Option<u32>,
    enabled: Option<bool>,
    height: Option<f32>,
    frequency_min: Option<f32>,
    frequency_max: Option<f32>,
    transition_delay: Option<f32>,
    bar_count: Option<u32>,
    bar_width: Option<f32>,
    color: Option<String>,
    opacity: Option<f32>,
    style: Option<VisualizerStyle>,
    radial_size: Option<f32>,
    radial_offset_x: Option<f32>,
    radial_offset_y: Option<f32>,
    radial_core_size: Option<f32>,
}

/// Unversioned player state; unrelated player keys are ignored
#[derive(Debug, Default, Deserialize)]
struct LegacyPlayerState {
    #[serde(rename = "lyricVisualizer")]
    enabled: Option<bool>,
    #[serde(rename = "lyricVisualizerHeight")]
    height: Option<f32>,
    #[serde(rename = "lyricVisualizerFrequencyMin")]
    frequency_min: Option<f32>,
    #[serde(rename = "lyricVisualizerFrequencyMax")]
    frequency_max: Option<f32>,
    #[serde(rename = "lyricVisualizerTransitionDelay")]
    transition_delay: Option<f32>,
    #[serde(rename = "lyricVisualizerBarCount")]
    bar_count: Option<u32>,
    #[serde(rename = "lyricVisualizerBarWidth")]
    bar_width: Option<f32>,
    #[serde(rename = "lyricVisualizerColor")]
    color: Option<String>,
    #[serde(rename = "lyricVisualizerOpacity")]
    opacity: Option<f32>,
    #[serde(rename = "lyricVisualizerStyle")]
    style: Option<VisualizerStyle>,
    #[serde(rename = "lyricVisualizerRadialSize")]
    radial_size: Option<f32>,
    #[serde(rename = "lyricVisualizerRadialOffsetX")]
    radial_offset_x: Option<f32>,
    #[serde(rename = "lyricVisualizerRadialOffsetY")]
    radial_offset_y: Option<f32>,
    #[serde(rename = "lyricVisualizerRadialCoreSize")]
    radial_core_size: Option<f32>,
}

impl From<LegacyPlayerState> for StoredConfig {
    fn from(legacy: LegacyPlayerState) -> Self {
        Self {
            version: Some(0),
            enabled: legacy.enabled,
            height: legacy.height,
            frequency_min: legacy.frequency_min,
            frequency_max: legacy.frequency_max,
            transition_delay: legacy.transition_delay,
            bar_count: legacy.bar_count,
            bar_width: legacy.bar_width,
            color: legacy.color,
            opacity: legacy.opacity,
            style: legacy.style,
            radial_size: legacy.radial_size,
            radial_offset_x: legacy.radial_offset_x,
            radial_offset_y: legacy.radial_offset_y,
            radial_core_size: legacy.radial_core_size,
        }
    }
}

impl VisualizerConfig {
    /// Parse a versioned document or a legacy flat player state
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let stored = if value.get("version").is_some() {
            serde_json::from_value::<StoredConfig>(value)?
        } else {
            serde_json::from_value::<LegacyPlayerState>(value)?.into()
        };
        Ok(Self::migrate(stored))
    }

    /// Serialize as the current document version
    pub fn to_json(&self) -> Result<String> {
        let stored = StoredConfig {
            version: Some(CONFIG_VERSION),
            enabled: Some(self.enabled),
            height: Some(self.height),
            frequency_min: Some(self.frequency_min),
            frequency_max: Some(self.frequency_max),
            transition_delay: Some(self.transition_delay),
            bar_count: Some(self.bar_count),
            bar_width: Some(self.bar_width),
            color: Some(self.color.clone()),
            opacity: Some(self.opacity),
            style: Some(self.style),
            radial_size: Some(self.radial_size),
            radial_offset_x: Some(self.radial_offset_x),
            radial_offset_y: Some(self.radial_offset_y),
            radial_core_size: Some(self.radial_core_size),
        };
        Ok(serde_json::to_string_pretty(&stored)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Fill missing fields with defaults and clamp everything into range
    fn migrate(stored: StoredConfig) -> Self {
        let version = stored.version.unwrap_or(0);
        if version > CONFIG_VERSION {
            warn!(
                "Visualizer config version {} is newer than {}, reading known fields only",
                version, CONFIG_VERSION
            );
        }

        let defaults = Self::default();
        Self {
            enabled: stored.enabled.unwrap_or(defaults.enabled),
            height: stored.height.unwrap_or(defaults.height),
            frequency_min: stored.frequency_min.unwrap_or(defaults.frequency_min),
            frequency_max: stored.frequency_max.unwrap_or(defaults.frequency_max),
            transition_delay: stored.transition_delay.unwrap_or(defaults.transition_delay),
            bar_count: stored.bar_count.unwrap_or(defaults.bar_count),
            bar_width: stored.bar_width.unwrap_or(defaults.bar_width),
            color: stored.color.unwrap_or(defaults.color),
            opacity: stored.opacity.unwrap_or(defaults.opacity),
            style: stored.style.unwrap_or(defaults.style),
            radial_size: stored.radial_size.unwrap_or(defaults.radial_size),
            radial_offset_x: stored.radial_offset_x.unwrap_or(defaults.radial_offset_x),
            radial_offset_y: stored.radial_offset_y.unwrap_or(defaults.radial_offset_y),
            radial_core_size: stored.radial_core_size.unwrap_or(defaults.radial_core_size),
        }
        .clamped()
    }

    /// Clamp every numeric field into its documented range
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        self.height = clamp_or(self.height, 60.0, 600.0, defaults.height);
        self.frequency_min = clamp_or(self.frequency_min, 0.0, 20000.0, defaults.frequency_min);
        self.frequency_max = clamp_or(
            self.frequency_max,
            self.frequency_min + 1.0,
            MAX_FREQUENCY_HZ,
            defaults.frequency_max.max(self.frequency_min + 1.0),
        );
        self.transition_delay =
            clamp_or(self.transition_delay, 0.0, 0.99, defaults.transition_delay);
        self.bar_count = self.bar_count.clamp(1, 256);
        self.bar_width = clamp_or(self.bar_width, 1.0, 100.0, defaults.bar_width);
        self.opacity = clamp_or(self.opacity, 0.0, 100.0, defaults.opacity);
        self.radial_size = clamp_or(self.radial_size, 10.0, 300.0, defaults.radial_size);
        self.radial_offset_x = clamp_or(self.radial_offset_x, -100.0, 100.0, 0.0);
        self.radial_offset_y = clamp_or(self.radial_offset_y, -100.0, 100.0, 0.0);
        self.radial_core_size =
            clamp_or(self.radial_core_size, 0.0, 100.0, defaults.radial_core_size);
        if self.color.trim().is_empty() {
            self.color = defaults.color;
        }
        self
    }
}

/// Clamp a value into range; non-finite values fall back to `fallback`
fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback.clamp(min, max)
    }
}
