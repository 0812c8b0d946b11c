//! Output destinations for the analyser's pass-through audio.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, error, info};

use crate::error::{AudioError, Result};
use crate::params::OutputConfig;

/// Sink at the end of the audio graph
pub trait Destination {
    fn name(&self) -> &str;

    fn sample_rate_hz(&self) -> u32;

    /// Called once, when the analyser is wired to this destination
    fn attach(&mut self) -> Result<()> {
        Ok(())
    }

    /// Consume one block of mono samples
    fn render(&mut self, samples: &[f32]) -> Result<()>;
}

/// Discards audio; used headless
#[derive(Debug)]
pub struct NullDestination {
    sample_rate_hz: u32,
    rendered: usize,
}

impl NullDestination {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz,
            rendered: 0,
        }
    }

    /// Total samples rendered so far
    pub fn rendered_samples(&self) -> usize {
        self.rendered
    }
}

impl Destination for NullDestination {
    fn name(&self) -> &str {
        "null"
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    fn render(&mut self, samples: &[f32]) -> Result<()> {
        self.rendered += samples.len();
        Ok(())
    }
}

/// Records the mix to a mono 32-bit float WAV file
pub struct WavDestination {
    name: String,
    sample_rate_hz: u32,
    writer: hound::WavWriter<BufWriter<File>>,
}

impl WavDestination {
    pub fn create(path: &Path, sample_rate_hz: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: sample_rate_hz,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(path, spec)?;
        Ok(Self {
            name: format!("wav:{}", path.display()),
            sample_rate_hz,
            writer,
        })
    }
}

impl Destination for WavDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    fn render(&mut self, samples: &[f32]) -> Result<()> {
        for &sample in samples {
            self.writer.write_sample(sample)?;
        }
        // Keep the header valid if the process exits without dropping us
        self.writer.flush()?;
        Ok(())
    }
}

/// Plays the mix on the default cpal output device.
///
/// The stream is built on open and started on `attach`; the device callback
/// owns the consumer half of the ring buffer.
pub struct DeviceDestination {
    name: String,
    sample_rate_hz: u32,
    producer: HeapProd<f32>,
    /// Audio output stream (kept alive)
    stream: cpal::Stream,
}

impl DeviceDestination {
    pub fn open(config: &OutputConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            AudioError::ContextUnavailable("No audio output device found".to_string())
        })?;

        let default = device.default_output_config().map_err(|e| {
            AudioError::ContextUnavailable(format!("Failed to get audio config: {}", e))
        })?;

        let supported = if default.sample_format() == cpal::SampleFormat::F32 {
            default
        } else {
            let ranges: Vec<_> = device
                .supported_output_configs()
                .map_err(|e| {
                    AudioError::ContextUnavailable(format!("Failed to list audio configs: {}", e))
                })?
                .collect();
            let summary: Vec<_> = ranges
                .iter()
                .map(|r| (r.sample_format(), r.min_sample_rate().0, r.max_sample_rate().0))
                .collect();
            let (index, rate) = pick_f32_rate(default.sample_rate().0, &summary).ok_or_else(|| {
                AudioError::ContextUnavailable(format!(
                    "Device has no f32 output config (default is {:?})",
                    default.sample_format()
                ))
            })?;
            debug!("Default format {:?}, using f32 @ {}Hz", default.sample_format(), rate);
            ranges[index].clone().with_sample_rate(cpal::SampleRate(rate))
        };

        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels().max(1) as usize;
        info!("Audio: {} @ {}Hz ({} channels)", name, sample_rate_hz, channels);

        let ring = HeapRb::<f32>::new(config.ring_buffer_len(sample_rate_hz));
        let (producer, mut consumer) = ring.split();

        let stream = device
            .build_output_stream(
                &supported.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Same mono sample on every channel; silence on underrun
                    for frame in data.chunks_mut(channels) {
                        frame.fill(consumer.try_pop().unwrap_or(0.0));
                    }
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| {
                AudioError::ContextUnavailable(format!("Failed to build audio stream: {}", e))
            })?;

        Ok(Self {
            name,
            sample_rate_hz,
            producer,
            stream,
        })
    }
}

/// Pick an f32 config from `(format, min_rate, max_rate)` ranges.
///
/// Prefers a range that covers `preferred_hz`, else the first f32 range at
/// its highest rate. Returns the range index and the chosen rate.
fn pick_f32_rate(preferred_hz: u32, ranges: &[(cpal::SampleFormat, u32, u32)]) -> Option<(usize, u32)> {
    let mut f32_ranges = ranges
        .iter()
        .enumerate()
        .filter(|(_, (format, _, _))| *format == cpal::SampleFormat::F32);

    if let Some((index, _)) = f32_ranges
        .clone()
        .find(|(_, range)| (range.1..=range.2).contains(&preferred_hz))
    {
        return Some((index, preferred_hz));
    }
    f32_ranges.next().map(|(index, range)| (index, range.2))
}

impl Destination for DeviceDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    fn attach(&mut self) -> Result<()> {
        self.stream.play().map_err(|e| {
            AudioError::ContextUnavailable(format!("Failed to start audio stream: {}", e))
        })
    }

    fn render(&mut self, samples: &[f32]) -> Result<()> {
        let written = self.producer.push_slice(samples);
        if written < samples.len() {
            debug!("Ring buffer full, dropped {} samples", samples.len() - written);
        }
        Ok(())
    }
}
