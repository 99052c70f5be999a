//! Pipeline tuning configuration.
//!
//! Groups the buffer-threshold and timing tunables named throughout the
//! spec (`spec.md` §4.2, §5) into a single validated, serde-deserializable
//! struct, following the shape of `StreamingConfig` in the teacher repo.

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_BUFFER_READY_THRESHOLD_SECONDS, DEFAULT_DECODER_CHUNK_BYTES,
    DEFAULT_HARD_PUSH_LIMIT_BYTES, DEFAULT_PER_TRACK_SOFT_CEILING_SECONDS,
    DEFAULT_SOFT_THROTTLE_BYTES, DEFAULT_SYNC_START_LOOK_AHEAD_SECONDS,
    DEFAULT_SYNC_START_POLL_INTERVAL_MS,
};

/// Tuning configuration for the push-stream decoder pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard push limit for the output queue; `push_pcm` errors past this.
    pub hard_push_limit_bytes: u64,

    /// Soft throttle threshold; the producer sleeps 100ms past this.
    pub soft_throttle_bytes: u64,

    /// Per-track soft ceiling, in seconds of buffered audio.
    pub per_track_soft_ceiling_seconds: f64,

    /// Buffer-ready threshold, in seconds of audio written.
    pub buffer_ready_threshold_seconds: f64,

    /// Fixed PCM chunk size pulled from the decoder per loop iteration.
    pub decoder_chunk_bytes: usize,

    /// Bounded look-ahead for synchronized starts, in seconds.
    pub sync_start_look_ahead_seconds: f64,

    /// Poll interval for the synchronized-start monitor, in milliseconds.
    pub sync_start_poll_interval_ms: u64,
}

impl PipelineConfig {
    /// Creates a new `PipelineConfig`, validating the supplied values.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field encountered.
    pub fn new(
        hard_push_limit_bytes: u64,
        soft_throttle_bytes: u64,
        per_track_soft_ceiling_seconds: f64,
        buffer_ready_threshold_seconds: f64,
        decoder_chunk_bytes: usize,
        sync_start_look_ahead_seconds: f64,
        sync_start_poll_interval_ms: u64,
    ) -> Result<Self, String> {
        let config = Self {
            hard_push_limit_bytes,
            soft_throttle_bytes,
            per_track_soft_ceiling_seconds,
            buffer_ready_threshold_seconds,
            decoder_chunk_bytes,
            sync_start_look_ahead_seconds,
            sync_start_poll_interval_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.hard_push_limit_bytes == 0 {
            return Err("hard_push_limit_bytes must be >= 1".to_string());
        }
        if self.soft_throttle_bytes == 0 {
            return Err("soft_throttle_bytes must be >= 1".to_string());
        }
        if self.soft_throttle_bytes >= self.hard_push_limit_bytes {
            return Err("soft_throttle_bytes must be < hard_push_limit_bytes".to_string());
        }
        if self.per_track_soft_ceiling_seconds <= 0.0 {
            return Err("per_track_soft_ceiling_seconds must be > 0".to_string());
        }
        if self.buffer_ready_threshold_seconds <= 0.0 {
            return Err("buffer_ready_threshold_seconds must be > 0".to_string());
        }
        if self.decoder_chunk_bytes == 0 {
            return Err("decoder_chunk_bytes must be >= 1".to_string());
        }
        if self.sync_start_look_ahead_seconds <= 0.0 {
            return Err("sync_start_look_ahead_seconds must be > 0".to_string());
        }
        if self.sync_start_poll_interval_ms == 0 {
            return Err("sync_start_poll_interval_ms must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hard_push_limit_bytes: DEFAULT_HARD_PUSH_LIMIT_BYTES,
            soft_throttle_bytes: DEFAULT_SOFT_THROTTLE_BYTES,
            per_track_soft_ceiling_seconds: DEFAULT_PER_TRACK_SOFT_CEILING_SECONDS,
            buffer_ready_threshold_seconds: DEFAULT_BUFFER_READY_THRESHOLD_SECONDS,
            decoder_chunk_bytes: DEFAULT_DECODER_CHUNK_BYTES,
            sync_start_look_ahead_seconds: DEFAULT_SYNC_START_LOOK_AHEAD_SECONDS,
            sync_start_poll_interval_ms: DEFAULT_SYNC_START_POLL_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_hard_limit() {
        let mut config = PipelineConfig::default();
        config.hard_push_limit_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_soft_above_hard() {
        let mut config = PipelineConfig::default();
        config.soft_throttle_bytes = config.hard_push_limit_bytes;
        assert!(config.validate().is_err());
    }
}
