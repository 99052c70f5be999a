//! Fixed protocol and pipeline constants.
//!
//! Values here either come directly from the SlimProto/PCM wire contract
//! (the 4-character status tags, 32-bit float sample width) or are the
//! spec-mandated defaults for pipeline tuning (soft/hard buffer thresholds,
//! chunk size). Changing the former breaks protocol compliance; the latter
//! are exposed as overridable fields on [`crate::state::PipelineConfig`] and
//! these constants are only the fallback values.

// ─────────────────────────────────────────────────────────────────────────────
// Audio Format
// ─────────────────────────────────────────────────────────────────────────────

/// Output sample width in bytes: 32-bit float PCM, per spec §3/§6.4.
pub const SAMPLE_WIDTH_BYTES: u64 = 4;

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline Tuning Defaults (spec §4.2, §5)
// ─────────────────────────────────────────────────────────────────────────────

/// Default hard push limit for the output queue (600 MiB).
///
/// `push_pcm` returns an error once the queue would exceed this; the
/// producer treats that as a fatal, per-track condition.
pub const DEFAULT_HARD_PUSH_LIMIT_BYTES: u64 = 600 * 1024 * 1024;

/// Default soft throttle threshold (100 MiB).
///
/// Crossing this pauses the producer for 100ms between pulls.
pub const DEFAULT_SOFT_THROTTLE_BYTES: u64 = 100 * 1024 * 1024;

/// Default per-track soft ceiling, expressed in seconds of buffered audio
/// (≈4s). Crossing this paces decode to playback once steady-state is
/// reached.
pub const DEFAULT_PER_TRACK_SOFT_CEILING_SECONDS: f64 = 4.0;

/// Default buffer-ready threshold in seconds of audio (2s), after which
/// `STMl` is emitted once per track.
pub const DEFAULT_BUFFER_READY_THRESHOLD_SECONDS: f64 = 2.0;

/// Default fixed-size PCM chunk pulled from the decoder per iteration
/// (16 KiB of 32-bit float samples).
pub const DEFAULT_DECODER_CHUNK_BYTES: usize = 16 * 1024;

/// Default bounded look-ahead for synchronized starts (10s). A
/// `start_at(target_time)` further out than this is treated as
/// misconfiguration and started immediately.
pub const DEFAULT_SYNC_START_LOOK_AHEAD_SECONDS: f64 = 10.0;

/// Default poll interval for the synchronized-start monitor (100ms).
pub const DEFAULT_SYNC_START_POLL_INTERVAL_MS: u64 = 100;

/// Sleep duration when the ABA queue depth exceeds the soft throttle
/// (spec §4.2.a).
pub const SOFT_THROTTLE_SLEEP_MS: u64 = 100;

/// Sleep duration when the ABA queue depth exceeds the per-track soft
/// ceiling (spec §4.2.b).
pub const SOFT_CEILING_SLEEP_MS: u64 = 50;

/// Sleep duration on a decoder `ended` result with the transport still
/// connected (spec §4.2.c).
pub const DECODER_ENDED_RETRY_SLEEP_MS: u64 = 10;

/// Sleep duration on a zero-byte decode result (spec §4.2.c).
pub const ZERO_BYTE_RETRY_SLEEP_MS: u64 = 1;

/// Minimum interval between repeated soft-throttle log lines, to avoid
/// flooding logs while the producer is paced (spec §4.2.a: "log at most
/// every ~5s").
pub const THROTTLE_LOG_INTERVAL_SECS: u64 = 5;

/// Magnitude of the minimal server-side seek requested on a decoder-create
/// timeout outside a track transition (spec §6.3).
pub const MINIMAL_SEEK_SECONDS: f64 = 0.05;

// ─────────────────────────────────────────────────────────────────────────────
// Server Status Codes (spec §6.1)
// ─────────────────────────────────────────────────────────────────────────────

/// Stream connected successfully after negotiation.
pub const STATUS_STREAM_CONNECTED: &str = "STMc";
/// Buffered threshold crossed.
pub const STATUS_BUFFER_READY: &str = "STMl";
/// First audible sample of the (new) track.
pub const STATUS_TRACK_STARTED: &str = "STMs";
/// Natural decode end with transport closed, no manual stop.
pub const STATUS_TRACK_DECODE_COMPLETE: &str = "STMd";
/// Decoder error or unsupported format.
pub const STATUS_TRACK_DECODE_ERROR: &str = "STMn";

// ─────────────────────────────────────────────────────────────────────────────
// Server Time Tracker (spec §4.6)
// ─────────────────────────────────────────────────────────────────────────────

/// A server time snapshot older than this is considered stale.
pub const SERVER_TIME_FRESHNESS_SECS: u64 = 30;
