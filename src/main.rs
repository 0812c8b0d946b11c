//! Lyricscope - terminal lyric visualizer
//!
//! Decodes a WAV file, feeds it through the shared analysis environment the
//! same way the player feeds its audio element, and prints one line of bars
//! per frame.

use clap::Parser;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use lyricscope::cli::{read_wav, render_bars, Args};
use lyricscope::params::OutputBackend;
use lyricscope::{EnvironmentRegistry, MediaElement, Result, Visualizer};

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let audio = read_wav(&args.input)?;
    info!(
        "Input: {} ({} Hz, {} channels, {} samples)",
        args.input.display(),
        audio.sample_rate_hz,
        audio.channels,
        audio.samples.len()
    );

    let output = args.output_config(audio.sample_rate_hz);
    let realtime = output.backend == OutputBackend::Device;
    let registry = EnvironmentRegistry::new(output, args.analyser_config());

    let mut visualizer = Visualizer::new(&registry, args.load_visualizer_config()?)?;
    let rate = visualizer.environment().sample_rate_hz();
    if rate != audio.sample_rate_hz {
        warn!(
            "Output runs at {} Hz, input is {} Hz; playback speed will differ",
            rate, audio.sample_rate_hz
        );
    }

    let element = MediaElement::new(args.input.display().to_string());
    visualizer.attach(&element)?;

    let frame_len = args.samples_per_frame(audio.sample_rate_hz, audio.channels);
    let frame_time = Duration::from_secs_f32(1.0 / args.fps.max(1) as f32);

    for (index, chunk) in audio.samples.chunks(frame_len).enumerate() {
        if args.frames.is_some_and(|max| index >= max) {
            break;
        }

        element.push_interleaved(chunk, audio.channels);
        if let Err(e) = visualizer.environment().pump() {
            warn!("Frame {}: {}", index, e);
        }
        println!("{}", render_bars(visualizer.frame()));

        if realtime {
            thread::sleep(frame_time);
        }
    }

    Ok(())
}
