//! Command-line argument parsing and terminal helpers.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;
use crate::params::{AnalyserConfig, OutputBackend, OutputConfig, VisualizerConfig};

/// Glyphs for one bar, quietest first
const BAR_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "lyricscope")]
#[command(about = "Terminal lyric visualizer driven by a shared audio analyser", long_about = None)]
pub struct Args {
    /// WAV file to analyse
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output backend: device (default), null, wav
    #[arg(long, value_name = "BACKEND", default_value = "device")]
    pub backend: String,

    /// Record the analysed mix to this WAV file (implies --backend wav)
    #[arg(long, value_name = "PATH")]
    pub record: Option<PathBuf>,

    /// Visualizer settings (versioned JSON or legacy player state)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Frames per second
    #[arg(long, value_name = "FPS", default_value = "30")]
    pub fps: u32,

    /// Stop after this many frames
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<usize>,

    /// Analyser FFT size (power of 2)
    #[arg(long, value_name = "SAMPLES", default_value = "2048")]
    pub fft_size: usize,
}

impl Args {
    /// Parse output backend from command-line arguments
    pub fn output_config(&self, sample_rate_hz: u32) -> OutputConfig {
        let backend = match (self.record.as_ref(), self.backend.to_lowercase().as_str()) {
            (Some(path), _) => OutputBackend::Wav(path.clone()),
            (None, "device") => OutputBackend::Device,
            (None, "null") => OutputBackend::Null,
            (None, "wav") => OutputBackend::Wav(PathBuf::from("recording.wav")),
            (None, other) => {
                warn!("Unknown backend '{}', using device", other);
                OutputBackend::Device
            }
        };

        OutputConfig {
            backend,
            sample_rate_hz,
            ..Default::default()
        }
    }

    pub fn analyser_config(&self) -> AnalyserConfig {
        AnalyserConfig {
            fft_size: self.fft_size,
            ..Default::default()
        }
    }

    /// Load visualizer settings, or defaults when no file was given
    pub fn load_visualizer_config(&self) -> Result<VisualizerConfig> {
        match &self.config {
            Some(path) => VisualizerConfig::load(path),
            None => Ok(VisualizerConfig::default()),
        }
    }

    /// Interleaved samples per frame for the given stream layout
    pub fn samples_per_frame(&self, sample_rate_hz: u32, channels: usize) -> usize {
        (sample_rate_hz / self.fps.max(1)).max(1) as usize * channels.max(1)
    }
}

/// Decoded WAV file: interleaved samples in -1.0..=1.0
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate_hz: u32,
}

/// Read a WAV file, converting integer PCM to float
pub fn read_wav(path: &Path) -> Result<DecodedAudio> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(DecodedAudio {
        samples,
        channels: spec.channels as usize,
        sample_rate_hz: spec.sample_rate,
    })
}

/// Render bar levels as one line of block glyphs
pub fn render_bars(levels: &[f32]) -> String {
    let top = (BAR_GLYPHS.len() - 1) as f32;
    levels
        .iter()
        .map(|level| BAR_GLYPHS[(level.clamp(0.0, 1.0) * top).round() as usize])
        .collect()
}
