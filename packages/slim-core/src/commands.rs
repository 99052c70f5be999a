//! Upstream server commands and downstream requests crossing the
//! Coordinator ↔ Protocol boundary (spec §6.3).
//!
//! The SlimProto wire framing of these commands/requests is out of scope
//! for this crate (spec §1) and owned by `apps/slim-player`; this module
//! only defines the typed shapes the coordinator consumes and produces.

use std::time::Instant;

use crate::backend::DeclaredFormat;

/// A command received from the server, already decoded from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerCommand {
    /// `strm_start`: begin (or schedule) a new track.
    StrmStart {
        url: String,
        format: DeclaredFormat,
        start_time_offset_seconds: f64,
        replay_gain_linear: f32,
        is_gapless: bool,
        target_start_jiffies: Option<Instant>,
    },
    StrmPause,
    StrmResume,
    StrmStop,
    SkipAhead { seconds: f64 },
    PlaySilence { seconds: f64 },
    SetVolume { volume: f32 },
    SetReplayGain { gain: f32 },
    RequestFreshMetadata,
}

/// A request the coordinator raises toward the protocol layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DownstreamRequest {
    /// Ask the server for a minimal seek (spec §6.3, §4.5): issued when
    /// decoder creation timed out outside a track transition.
    MinimalSeek { seconds: f64 },
    /// Forward a freshly observed ICY tag, or the current stream's tag in
    /// response to `request_fresh_metadata`, to the server layer (spec
    /// §4.5 `metadata_request_from_icy`).
    MetadataUpdate {
        track_id: u64,
        artist: Option<String>,
        title: Option<String>,
    },
}
