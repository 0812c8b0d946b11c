//! Lyric visualizer front end: reduces analyser snapshots to bar levels.

use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

use crate::audio::{AudioEnvironment, EnvironmentRegistry, MediaElement, SourceNode};
use crate::error::Result;
use crate::params::{AnalyserConfig, VisualizerConfig};

/// Per-view consumer of the shared environment.
///
/// Cheap to drop and rebuild: the environment and its source nodes belong to
/// the registry, not to the visualizer.
pub struct Visualizer {
    environment: Rc<AudioEnvironment>,
    config: VisualizerConfig,
    /// FFT bin range covered by each bar
    bar_bins: Vec<Range<usize>>,
    spectrum: Vec<u8>,
    levels: Vec<f32>,
}

impl Visualizer {
    /// Attach to the registry's environment and apply `config`
    pub fn new(registry: &EnvironmentRegistry, config: VisualizerConfig) -> Result<Self> {
        let environment = registry.get_environment()?;
        let config = config.clamped();

        // Transition delay drives the shared analyser's smoothing
        environment.set_smoothing_time_constant(config.transition_delay);

        let bar_bins = bar_ranges(
            &config,
            &environment.analyser_config(),
            environment.sample_rate_hz(),
        );

        Ok(Self {
            spectrum: vec![0; environment.frequency_bin_count()],
            levels: vec![0.0; bar_bins.len()],
            bar_bins,
            environment,
            config,
        })
    }

    pub fn environment(&self) -> &Rc<AudioEnvironment> {
        &self.environment
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    /// Route `element` into the analyser (idempotent per element)
    pub fn attach(&self, element: &Arc<MediaElement>) -> Result<Arc<SourceNode>> {
        self.environment.get_or_create_source(element)
    }

    /// Read one snapshot and return bar levels in `0.0..=1.0`.
    ///
    /// Each bar takes the loudest bin in its range. Only reads the analyser;
    /// call `AudioEnvironment::pump` first to move new audio through it.
    pub fn frame(&mut self) -> &[f32] {
        self.environment.read_frequencies_into(&mut self.spectrum);

        for (level, bins) in self.levels.iter_mut().zip(&self.bar_bins) {
            let peak = self.spectrum[bins.clone()].iter().copied().max().unwrap_or(0);
            *level = peak as f32 / 255.0;
        }
        &self.levels
    }

    /// Lowest and highest frequency (Hz) covered by bar `index`
    pub fn bar_frequency_range(&self, index: usize) -> Option<(f32, f32)> {
        let bins = self.bar_bins.get(index)?;
        let fft_size = self.environment.analyser_config().fft_size;
        let hz_per_bin = self.environment.sample_rate_hz() as f32 / fft_size as f32;
        Some((bins.start as f32 * hz_per_bin, bins.end as f32 * hz_per_bin))
    }
}

/// Split `frequency_min..frequency_max` into `bar_count` log-spaced bin ranges.
///
/// Every range holds at least one bin; adjacent low-frequency bars may share
/// a bin when the FFT is too coarse to separate them.
fn bar_ranges(
    config: &VisualizerConfig,
    analyser: &AnalyserConfig,
    sample_rate_hz: u32,
) -> Vec<Range<usize>> {
    let bins = analyser.frequency_bin_count();
    let nyquist = sample_rate_hz as f32 / 2.0;
    let low = config.frequency_min.max(1.0).min(nyquist);
    let high = config.frequency_max.min(nyquist).max(low);

    let count = config.bar_count.max(1) as usize;
    let ratio = (high / low).powf(1.0 / count as f32);

    (0..count)
        .map(|i| {
            let start_hz = low * ratio.powi(i as i32);
            let end_hz = low * ratio.powi(i as i32 + 1);
            let start = analyser.hz_to_bin(start_hz, sample_rate_hz).min(bins - 1);
            let end = analyser
                .hz_to_bin(end_hz, sample_rate_hz)
                .clamp(start + 1, bins);
            start..end
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::OutputConfig;
    use std::f32::consts::PI;

    fn registry() -> EnvironmentRegistry {
        EnvironmentRegistry::new(OutputConfig::null(), AnalyserConfig::default())
    }

    #[test]
    fn test_bar_ranges_cover_configured_span() {
        let config = VisualizerConfig::default();
        let analyser = AnalyserConfig::default();
        let ranges = bar_ranges(&config, &analyser, 44100);

        assert_eq!(ranges.len(), 48);
        assert!(ranges.iter().all(|r| r.start < r.end));
        assert!(ranges.windows(2).all(|w| w[0].start <= w[1].start));
        assert_eq!(ranges[0].start, analyser.hz_to_bin(20.0, 44100));
        assert!(ranges[47].end <= analyser.hz_to_bin(8000.0, 44100) + 1);
    }

    #[test]
    fn test_frequency_max_above_nyquist_is_capped() {
        let config = VisualizerConfig {
            frequency_max: 22050.0,
            bar_count: 4,
            ..Default::default()
        };
        let analyser = AnalyserConfig::default();
        let ranges = bar_ranges(&config, &analyser, 16000);
        assert!(ranges.iter().all(|r| r.end <= analyser.frequency_bin_count()));
    }

    #[test]
    fn test_frame_is_silent_before_attach() {
        let registry = registry();
        let mut visualizer = Visualizer::new(&registry, VisualizerConfig::default()).unwrap();
        let levels = visualizer.frame();
        assert_eq!(levels.len(), 48);
        assert!(levels.iter().all(|&l| l == 0.0));
    }

    #[test]
    fn test_tone_lights_matching_bar() {
        let registry = registry();
        let config = VisualizerConfig {
            transition_delay: 0.0,
            bar_count: 8,
            ..Default::default()
        };
        let mut visualizer = Visualizer::new(&registry, config).unwrap();
        let element = MediaElement::new("tone");
        visualizer.attach(&element).unwrap();

        let tone: Vec<f32> = (0..4096)
            .map(|i| 0.5 * (2.0 * PI * 1000.0 * i as f32 / 44100.0).sin())
            .collect();
        element.push_samples(&tone);
        visualizer.environment().pump().unwrap();

        let levels = visualizer.frame().to_vec();
        let loudest = (0..levels.len())
            .max_by(|&a, &b| levels[a].total_cmp(&levels[b]))
            .unwrap();
        let (low, high) = visualizer.bar_frequency_range(loudest).unwrap();
        assert!(low <= 1000.0 && 1000.0 <= high + 50.0, "{}..{}", low, high);
        assert!(levels[loudest] > 0.5);
    }

    #[test]
    fn test_rebuilt_visualizer_reuses_environment() {
        let registry = registry();
        let element = MediaElement::new("track");

        let first = Visualizer::new(&registry, VisualizerConfig::default()).unwrap();
        let node = first.attach(&element).unwrap();
        let environment = Rc::clone(first.environment());
        drop(first);

        let second = Visualizer::new(&registry, VisualizerConfig::default()).unwrap();
        assert!(Rc::ptr_eq(&environment, second.environment()));
        assert!(Arc::ptr_eq(&node, &second.attach(&element).unwrap()));
        assert_eq!(environment.context().sources_created(), 1);
    }
}
