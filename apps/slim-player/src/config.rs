//! Player configuration.
//!
//! Supports loading from YAML files with environment variable overrides,
//! the way `apps/server/src/config.rs` does for Thaumic Cast.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use slim_core::PipelineConfig;

/// Player configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Lyrion/Squeezebox server hostname or IP address.
    /// Override: `SLIM_SERVER_HOST`
    pub server_host: String,

    /// SlimProto TCP port.
    /// Override: `SLIM_SERVER_PORT`
    pub server_port: u16,

    /// Player name advertised to the server during the SlimProto handshake.
    /// Override: `SLIM_PLAYER_NAME`
    pub player_name: String,

    /// Hard push limit for the output queue, in bytes.
    pub hard_push_limit_bytes: u64,

    /// Soft throttle threshold for the output queue, in bytes.
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

impl Default for PlayerConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            server_host: "localhost".to_string(),
            server_port: 3483,
            player_name: "slim-player".to_string(),
            hard_push_limit_bytes: pipeline.hard_push_limit_bytes,
            soft_throttle_bytes: pipeline.soft_throttle_bytes,
            per_track_soft_ceiling_seconds: pipeline.per_track_soft_ceiling_seconds,
            buffer_ready_threshold_seconds: pipeline.buffer_ready_threshold_seconds,
            decoder_chunk_bytes: pipeline.decoder_chunk_bytes,
            sync_start_look_ahead_seconds: pipeline.sync_start_look_ahead_seconds,
            sync_start_poll_interval_ms: pipeline.sync_start_poll_interval_ms,
        }
    }
}

impl PlayerConfig {
    /// Loads configuration from a YAML file, then applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SLIM_SERVER_HOST") {
            self.server_host = val;
        }
        if let Ok(val) = std::env::var("SLIM_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server_port = port;
            }
        }
        if let Ok(val) = std::env::var("SLIM_PLAYER_NAME") {
            self.player_name = val;
        }
    }

    /// Converts to slim-core's `PipelineConfig` type.
    pub fn to_core_config(&self) -> Result<PipelineConfig> {
        PipelineConfig::new(
            self.hard_push_limit_bytes,
            self.soft_throttle_bytes,
            self.per_track_soft_ceiling_seconds,
            self.buffer_ready_threshold_seconds,
            self.decoder_chunk_bytes,
            self.sync_start_look_ahead_seconds,
            self.sync_start_poll_interval_ms,
        )
        .map_err(anyhow::Error::msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_converts_to_valid_pipeline_config() {
        let config = PlayerConfig::default();
        assert!(config.to_core_config().is_ok());
    }
}
