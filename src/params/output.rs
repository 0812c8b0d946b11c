//! Output destination configuration.

use std::path::PathBuf;

use super::audio::audio_constants::DEFAULT_SAMPLE_RATE_HZ;

/// Where the analyser's pass-through audio goes
#[derive(Debug, Clone, PartialEq)]
pub enum OutputBackend {
    /// Default cpal output device
    Device,
    /// Discard audio (headless)
    Null,
    /// Record to a mono float WAV file
    Wav(PathBuf),
}

/// Output destination configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub backend: OutputBackend,

    /// Sample rate for headless destinations (Hz).
    /// Device output uses the device's own rate.
    pub sample_rate_hz: u32,

    /// Device ring buffer length (seconds)
    pub ring_buffer_secs: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: OutputBackend::Device,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            ring_buffer_secs: 2.0,
        }
    }
}

impl OutputConfig {
    pub fn null() -> Self {
        Self {
            backend: OutputBackend::Null,
            ..Default::default()
        }
    }

    pub fn wav(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: OutputBackend::Wav(path.into()),
            ..Default::default()
        }
    }

    /// Ring buffer capacity in samples at the given rate
    pub fn ring_buffer_len(&self, sample_rate_hz: u32) -> usize {
        ((sample_rate_hz as f32 * self.ring_buffer_secs).ceil() as usize).max(1)
    }
}
