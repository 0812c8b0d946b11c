//! Shared audio-analysis environment.
//!
//! Media elements are wrapped in source nodes (at most one per element),
//! mixed into a single FFT analyser and passed through to an output
//! destination. One environment serves every visualizer on a thread.

mod context;
mod destination;
mod element;
mod fft;
mod registry;
mod source;
mod system;

// Re-export public types
pub use context::AudioContext;
pub use destination::{Destination, DeviceDestination, NullDestination, WavDestination};
pub use element::{ElementId, MediaElement};
pub use fft::{hann_window, AnalyserNode};
pub use registry::{get_environment, EnvironmentRegistry};
pub use source::{SourceCache, SourceNode};
pub use system::AudioEnvironment;
