//! Protocol Event Emitter (PEE): maps pipeline events to server status
//! codes.
//!
//! This module provides:
//! - [`PipelineEvent`], the typed event set the pipeline raises.
//! - [`ServerStatusCode`], the four-character tags the external protocol
//!   layer is responsible for framing onto the wire.
//! - [`PipelineEventEmitter`] (in [`emitter`]), the trait services depend on
//!   to emit events without knowing how they are transported.

mod emitter;

pub use emitter::{LoggingPipelineEventEmitter, NoopPipelineEventEmitter, PipelineEventEmitter};
#[cfg(test)]
pub(crate) use emitter::test_support;

use crate::protocol_constants::{
    STATUS_BUFFER_READY, STATUS_STREAM_CONNECTED, STATUS_TRACK_DECODE_COMPLETE,
    STATUS_TRACK_DECODE_ERROR, STATUS_TRACK_STARTED,
};

/// Four-character server status codes (spec §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatusCode {
    /// `STMc` — stream connected.
    Stmc,
    /// `STMl` — buffer ready.
    Stml,
    /// `STMs` — track started (first audible sample).
    Stms,
    /// `STMd` — track decode complete.
    Stmd,
    /// `STMn` — decoder error / unsupported format.
    Stmn,
}

impl ServerStatusCode {
    /// Returns the literal four-character wire tag.
    pub const fn as_tag(&self) -> &'static str {
        match self {
            Self::Stmc => STATUS_STREAM_CONNECTED,
            Self::Stml => STATUS_BUFFER_READY,
            Self::Stms => STATUS_TRACK_STARTED,
            Self::Stmd => STATUS_TRACK_DECODE_COMPLETE,
            Self::Stmn => STATUS_TRACK_DECODE_ERROR,
        }
    }
}

/// Events the pipeline raises, consumed by [`PipelineEventEmitter`]
/// implementations and mapped 1:1 onto [`ServerStatusCode`] (spec §4.4).
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Decoder created successfully after negotiation.
    StreamConnected {
        /// Opaque identifier of the track this event concerns.
        track_id: u64,
    },
    /// Crossed the buffer-ready threshold for the current track.
    BufferReady {
        /// Opaque identifier of the track this event concerns.
        track_id: u64,
    },
    /// The boundary sync fired (or a deferred track committed): the track
    /// is now audible.
    TrackStarted {
        /// Opaque identifier of the track this event concerns.
        track_id: u64,
        /// True if this is a deferred-track commit (spec §4.4, P5): exempt
        /// from the preceding `STMl`.
        deferred: bool,
    },
    /// Natural decode end with the transport closed; not a manual stop.
    TrackDecodeComplete {
        /// Opaque identifier of the track this event concerns.
        track_id: u64,
    },
    /// Decoder reported a hard error mid-track.
    TrackDecodeError {
        /// Opaque identifier of the track this event concerns.
        track_id: u64,
        /// Machine-readable error code (see [`crate::error::ErrorCode`]).
        code: &'static str,
    },
    /// Decoder creation failed with an unsupported format.
    StreamFailed {
        /// Opaque identifier of the track this event concerns.
        track_id: u64,
        /// Machine-readable error code.
        code: &'static str,
    },
}

impl PipelineEvent {
    /// Opaque identifier of the track this event concerns.
    pub fn track_id(&self) -> u64 {
        match self {
            Self::StreamConnected { track_id }
            | Self::BufferReady { track_id }
            | Self::TrackStarted { track_id, .. }
            | Self::TrackDecodeComplete { track_id }
            | Self::TrackDecodeError { track_id, .. }
            | Self::StreamFailed { track_id, .. } => *track_id,
        }
    }

    /// Maps this event to the server status code it causes (spec §4.4).
    pub fn status_code(&self) -> ServerStatusCode {
        match self {
            Self::StreamConnected { .. } => ServerStatusCode::Stmc,
            Self::BufferReady { .. } => ServerStatusCode::Stml,
            Self::TrackStarted { .. } => ServerStatusCode::Stms,
            Self::TrackDecodeComplete { .. } => ServerStatusCode::Stmd,
            Self::TrackDecodeError { .. } | Self::StreamFailed { .. } => ServerStatusCode::Stmn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_spec_tags() {
        assert_eq!(ServerStatusCode::Stmc.as_tag(), "STMc");
        assert_eq!(ServerStatusCode::Stml.as_tag(), "STMl");
        assert_eq!(ServerStatusCode::Stms.as_tag(), "STMs");
        assert_eq!(ServerStatusCode::Stmd.as_tag(), "STMd");
        assert_eq!(ServerStatusCode::Stmn.as_tag(), "STMn");
    }

    #[test]
    fn track_decode_error_and_stream_failed_both_map_to_stmn() {
        let a = PipelineEvent::TrackDecodeError {
            track_id: 1,
            code: "decoder_error",
        };
        let b = PipelineEvent::StreamFailed {
            track_id: 1,
            code: "unsupported_format",
        };
        assert_eq!(a.status_code(), ServerStatusCode::Stmn);
        assert_eq!(b.status_code(), ServerStatusCode::Stmn);
    }

    #[test]
    fn deferred_track_started_still_maps_to_stms() {
        let event = PipelineEvent::TrackStarted {
            track_id: 2,
            deferred: true,
        };
        assert_eq!(event.status_code(), ServerStatusCode::Stms);
    }
}
