//! Error types for the output crate

use crate::state::PlaybackState;

/// Failure reported by a media backend
///
/// Backends only describe what went wrong; the engine decides whether a
/// failure reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BackendFailure(pub String);

impl BackendFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors returned by playback commands and backend selection
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Malformed URI or out-of-range value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Command not valid in the current playback state
    #[error("{command} is not valid while {state}")]
    InvalidState {
        command: &'static str,
        state: PlaybackState,
    },

    /// The backend rejected or failed the operation
    #[error("Backend error: {0}")]
    Backend(#[from] BackendFailure),

    /// No compiled-in backend has this name
    #[error("No such output: '{0}'")]
    UnknownBackend(String),

    /// The registry is empty
    #[error("No outputs available")]
    NoBackends,

    /// Invalid output configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend event loop thread could not be started
    #[error("Failed to start output event loop: {0}")]
    EventLoop(#[from] std::io::Error),
}

/// Result type for output operations
pub type Result<T> = std::result::Result<T, OutputError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PauseReason;

    #[test]
    fn test_error_messages() {
        let err = OutputError::InvalidState {
            command: "pause",
            state: PlaybackState::Paused(PauseReason::User),
        };
        assert_eq!(err.to_string(), "pause is not valid while PAUSED (user)");

        let err: OutputError = BackendFailure::new("pipeline refused").into();
        assert_eq!(err.to_string(), "Backend error: pipeline refused");

        assert_eq!(
            OutputError::UnknownBackend("alsa".to_string()).to_string(),
            "No such output: 'alsa'"
        );
    }
}
