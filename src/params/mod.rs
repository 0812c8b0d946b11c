//! Parameter definitions with physical units and documented semantics.
//!
//! All tunable numbers live here with:
//! - Physical units (Hz, dB, seconds, pixels)
//! - Documented ranges and meanings
//! - Validation or clamping where a bad value would break analysis

mod audio;
mod output;
mod visualizer;

// Re-export all types
pub use audio::{audio_constants, AnalyserConfig};
pub use output::{OutputBackend, OutputConfig};
pub use visualizer::{VisualizerConfig, VisualizerStyle, CONFIG_VERSION};
