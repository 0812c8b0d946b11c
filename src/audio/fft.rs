//! Shared analyser node and FFT utilities.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

use crate::error::{AudioError, Result};
use crate::params::AnalyserConfig;

/// Frequency analyser fed by every source in the environment.
///
/// Keeps the most recent `fft_size` samples and turns them into byte
/// snapshots the way a Web Audio analyser does: windowed FFT, magnitude
/// normalized by N, exponential smoothing, then dB mapped onto `0..=255`.
pub struct AnalyserNode {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    time_domain: VecDeque<f32>,
    fft_buffer: Vec<Complex<f32>>,
    /// Smoothed linear magnitudes, one per bin
    smoothed: Vec<f32>,
    /// Set once the node is wired to the destination
    connected: bool,
}

impl AnalyserNode {
    pub fn new(config: AnalyserConfig) -> Result<Self> {
        config.validate()?;

        let size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        Ok(Self {
            fft,
            window: (0..size).map(|i| hann_window(i, size)).collect(),
            time_domain: std::iter::repeat(0.0).take(size).collect(),
            fft_buffer: vec![Complex::new(0.0, 0.0); size],
            smoothed: vec![0.0; config.frequency_bin_count()],
            connected: false,
            config,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Change smoothing between snapshots (clamped to 0..=1)
    pub fn set_smoothing_time_constant(&mut self, value: f32) {
        if value.is_finite() {
            self.config.smoothing_time_constant = value.clamp(0.0, 1.0);
        }
    }

    /// Mark the node as wired downstream. A second call is illegal.
    pub(crate) fn connect_downstream(&mut self) -> Result<()> {
        if self.connected {
            return Err(AudioError::AlreadyConnected);
        }
        self.connected = true;
        Ok(())
    }

    /// Undo a connection whose destination refused to attach
    pub(crate) fn abort_downstream(&mut self) {
        self.connected = false;
    }

    /// Append samples to the sliding analysis window
    pub fn write_time_domain(&mut self, samples: &[f32]) {
        let size = self.config.fft_size;
        let tail = &samples[samples.len().saturating_sub(size)..];
        self.time_domain.drain(..tail.len());
        self.time_domain.extend(tail.iter().copied());
    }

    /// Fill `out` with the current byte spectrum.
    ///
    /// Writes `min(out.len(), frequency_bin_count)` values.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.analyse();

        let min_db = self.config.min_decibels;
        let range_scale = 255.0 / (self.config.max_decibels - min_db);
        for (byte, &magnitude) in out.iter_mut().zip(&self.smoothed) {
            let db = 20.0 * magnitude.log10();
            *byte = ((db - min_db) * range_scale).floor().clamp(0.0, 255.0) as u8;
        }
    }

    /// Run the FFT over the current window and update smoothed magnitudes
    fn analyse(&mut self) {
        let size = self.config.fft_size;

        // Apply window
        for (slot, (sample, window)) in self
            .fft_buffer
            .iter_mut()
            .zip(self.time_domain.iter().zip(&self.window))
        {
            *slot = Complex::new(sample * window, 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let tau = self.config.smoothing_time_constant;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.fft_buffer) {
            let magnitude = bin.norm() / size as f32;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }
    }
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
