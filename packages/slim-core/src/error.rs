//! Centralized error types for the slim-core library.
//!
//! Mirrors the shape of a typical application error: a single `thiserror`
//! enum with a stable, machine-readable `code()` for log correlation plus
//! `From` conversions from the narrower error types raised by individual
//! components.

use thiserror::Error;

use crate::backend::BackendErrorKind;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs/metrics.
    fn code(&self) -> &'static str;
}

impl ErrorCode for BackendErrorKind {
    fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::Timeout => "timeout",
            Self::QueueFull => "queue_full",
            Self::InvalidState => "invalid_state",
            Self::Unknown(_) => "backend_error",
        }
    }
}

/// Application-wide error type for the pipeline and coordinator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SlimError {
    /// The decoder backend rejected the requested format outright.
    ///
    /// Terminal for the current track per the spec's error taxonomy.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoder creation or a backend operation timed out.
    ///
    /// Transient; the coordinator may request a minimal server-side seek.
    #[error("backend timeout: {0}")]
    Timeout(String),

    /// `push_pcm` exceeded the configured hard push limit.
    #[error("push limit exceeded: {0}")]
    PushLimitExceeded(String),

    /// The decoder reported a hard, unrecoverable error.
    #[error("decoder error: {0}")]
    DecoderError(String),

    /// A position or boundary query observed an output stream that is not
    /// in a state that can report a meaningful position.
    #[error("invalid output stream state: {0}")]
    InvalidState(String),

    /// A caller violated a component invariant (e.g. boundary marked without
    /// a prior `pending_boundary_mark`). Logged and treated as a no-op by
    /// the caller; never surfaced to the server.
    #[error("programmer error: {0}")]
    Invariant(String),

    /// Generic backend failure that doesn't map to a more specific variant.
    #[error("backend error ({0}): {1}")]
    Backend(i32, String),
}

impl SlimError {
    /// Returns a machine-readable error code for logs/metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::Timeout(_) => "timeout",
            Self::PushLimitExceeded(_) => "push_limit_exceeded",
            Self::DecoderError(_) => "decoder_error",
            Self::InvalidState(_) => "invalid_state",
            Self::Invariant(_) => "invariant_violation",
            Self::Backend(_, _) => "backend_error",
        }
    }

    /// True if this error is terminal for the current track (spec §7).
    pub fn is_terminal_for_track(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_) | Self::PushLimitExceeded(_) | Self::DecoderError(_)
        )
    }

    /// True if this error is transient and outside-track-transition
    /// recoverable via a minimal server-side seek (spec §4.5, §7).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<crate::backend::BackendError> for SlimError {
    fn from(err: crate::backend::BackendError) -> Self {
        match err.kind {
            BackendErrorKind::UnsupportedFormat => Self::UnsupportedFormat(err.message),
            BackendErrorKind::Timeout => Self::Timeout(err.message),
            BackendErrorKind::QueueFull => Self::PushLimitExceeded(err.message),
            BackendErrorKind::InvalidState => Self::InvalidState(err.message),
            BackendErrorKind::Unknown(code) => Self::Backend(code, err.message),
        }
    }
}

/// Convenience Result alias for library-wide operations.
pub type SlimResult<T> = Result<T, SlimError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;

    #[test]
    fn unsupported_format_is_terminal() {
        let err = SlimError::UnsupportedFormat("flac".into());
        assert!(err.is_terminal_for_track());
        assert!(!err.is_transient());
        assert_eq!(err.code(), "unsupported_format");
    }

    #[test]
    fn timeout_is_transient_not_terminal() {
        let err = SlimError::Timeout("decoder create".into());
        assert!(err.is_transient());
        assert!(!err.is_terminal_for_track());
    }

    #[test]
    fn backend_error_converts() {
        let backend_err = BackendError::new(BackendErrorKind::Timeout, "slow server");
        let err: SlimError = backend_err.into();
        assert_eq!(err, SlimError::Timeout("slow server".into()));
    }
}
