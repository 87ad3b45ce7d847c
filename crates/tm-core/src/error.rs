//! Error types for TrackMix

use thiserror::Error;

use crate::{ClipId, TrackId};

/// Clip loading failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),
}

/// Live capture failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    #[error("A recording is already in progress on this track")]
    AlreadyRecording,

    #[error("No recording is in progress on this track")]
    NotRecording,

    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Recorded audio could not be loaded: {0}")]
    Load(#[from] LoadError),
}

/// Mixdown/export failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixError {
    #[error("Nothing to mix: the session has no clips")]
    EmptyMix,

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Sample rate mismatch: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    #[error("Encode error: {0}")]
    Encode(String),
}

/// Error surfaced by session-level operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Track not found: {0:?}")]
    TrackNotFound(TrackId),

    #[error("Clip not found: {0:?}")]
    ClipNotFound(ClipId),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Mix(#[from] MixError),
}

/// Result type aliases
pub type LoadResult<T> = Result<T, LoadError>;
pub type MixResult<T> = Result<T, MixError>;
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MixError::SampleRateMismatch {
            expected: 48000,
            found: 44100,
        };
        assert_eq!(
            err.to_string(),
            "Sample rate mismatch: expected 48000 Hz, found 44100 Hz"
        );
        assert_eq!(
            LoadError::InvalidSource("empty recording".into()).to_string(),
            "Invalid source: empty recording"
        );
    }

    #[test]
    fn test_session_error_conversion() {
        let err: SessionError = MixError::EmptyMix.into();
        assert!(matches!(err, SessionError::Mix(MixError::EmptyMix)));

        let err: RecordingError = LoadError::DecodeFailure("bad".into()).into();
        assert!(matches!(err, RecordingError::Load(LoadError::DecodeFailure(_))));
    }
}
