//! Audio analysis configuration and constants.

use crate::error::{AudioError, Result};

/// Analyser configuration with Web-analyser style byte scaling
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// FFT window size (must be power of 2, 32..=32768)
    pub fft_size: usize,

    /// Exponential smoothing between snapshots (0.0 = none, 1.0 = frozen)
    pub smoothing_time_constant: f32,

    /// Level mapped to byte 0 (dBFS)
    pub min_decibels: f32,

    /// Level mapped to byte 255 (dBFS)
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins in a snapshot (half the FFT size)
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Convert frequency (Hz) to FFT bin index at the given sample rate
    pub fn hz_to_bin(&self, hz: f32, sample_rate_hz: u32) -> usize {
        ((hz.max(0.0) * self.fft_size as f32) / sample_rate_hz as f32) as usize
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(AudioError::InvalidConfig(format!(
                "FFT size must be a power of 2 in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(AudioError::InvalidConfig(format!(
                "Smoothing time constant must be in 0..=1, got {}",
                self.smoothing_time_constant
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(AudioError::InvalidConfig(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

/// Audio constants shared by elements and contexts
pub mod audio_constants {
    /// Sample rate used by headless destinations (Hz)
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44100;

    /// Upper bound on samples queued in one element between pumps
    /// (~3s @ 44.1kHz); the oldest samples are dropped first
    pub const MAX_PENDING_SAMPLES: usize = 131_072;
}
