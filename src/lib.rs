//! Lyricscope library - shared audio analysis for lyric visualizers

pub mod audio;
pub mod cli;
pub mod error;
pub mod params;
pub mod visualizer;

pub use audio::{get_environment, AudioEnvironment, EnvironmentRegistry, MediaElement};
pub use error::{AudioError, Result};
pub use visualizer::Visualizer;
