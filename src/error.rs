//! Error types for the audio-analysis environment.

use thiserror::Error;

use crate::audio::ElementId;

/// Main error type for lyricscope
#[derive(Error, Debug)]
pub enum AudioError {
    /// The audio context (output destination) could not be created
    #[error("Audio context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("{0} is already wrapped by a source node outside the cache")]
    SourceConflict(ElementId),

    #[error("Analyser is already connected to the destination")]
    AlreadyConnected,

    #[error("Invalid analyser config: {0}")]
    InvalidConfig(String),

    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for lyricscope
pub type Result<T> = std::result::Result<T, AudioError>;
