// Error type shared by the decoder, DSP, rendering and server layers.

use std::path::PathBuf;

/// Everything that can go wrong between reading an audio file and handing back PNGs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("no audio tracks found")]
    NoAudioTrack,

    #[error("no audio samples to analyze")]
    EmptyAudio,

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the caller supplied bad input (as opposed to an internal failure).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Decode(_)
                | Error::NoAudioTrack
                | Error::EmptyAudio
                | Error::InvalidFilter(_)
                | Error::InvalidParameter(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
