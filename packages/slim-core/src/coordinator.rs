//! Playback Coordinator (PC): receives server commands, drives PSD, feeds
//! PEE (spec §4.5).

use tokio::sync::mpsc;

use crate::backend::AudioBackend;
use crate::commands::{DownstreamRequest, ServerCommand};
use crate::error::{SlimError, SlimResult};
use crate::events::PipelineEventEmitter;
use crate::pipeline::{Pipeline, TrackState};
use crate::protocol_constants::MINIMAL_SEEK_SECONDS;
use crate::runtime::TaskSpawner;
use crate::server_time::ServerTimeTracker;
use crate::state::PipelineConfig;
use std::sync::Arc;

/// Default output format assumed for the very first track of a session,
/// before any decoder has reported its real format. `start_track` detects
/// the mismatch against the first real decoder and recreates the output
/// stream to match, so this only needs to be *a* valid format.
const INITIAL_SAMPLE_RATE: u32 = 44_100;
const INITIAL_CHANNELS: u16 = 2;

/// Translates server commands into PSD operations and owns the channel PSD
/// events are forwarded to the protocol layer through (via the supplied
/// [`PipelineEventEmitter`]), plus the channel downstream requests (like a
/// minimal-seek ask) are raised on.
pub struct PlaybackCoordinator {
    pipeline: Pipeline,
    server_time: ServerTimeTracker,
    downstream_tx: mpsc::UnboundedSender<DownstreamRequest>,
}

impl PlaybackCoordinator {
    /// Builds a coordinator and its owned pipeline, returning the receiver
    /// for downstream requests (minimal-seek asks) alongside it.
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        emitter: Arc<dyn PipelineEventEmitter>,
        spawner: Arc<dyn TaskSpawner>,
        config: PipelineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DownstreamRequest>) {
        let (downstream_tx, downstream_rx) = mpsc::unbounded_channel();
        let pipeline = Pipeline::new(backend, emitter, spawner, config, downstream_tx.clone());
        (
            Self {
                pipeline,
                server_time: ServerTimeTracker::new(),
                downstream_tx,
            },
            downstream_rx,
        )
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn server_time(&self) -> &ServerTimeTracker {
        &self.server_time
    }

    /// True while a track transition (gapless or deferred) is in flight —
    /// used to decide whether a decoder-creation timeout should trigger a
    /// minimal server-side seek (spec §4.5, §7).
    fn mid_track_transition(&self) -> bool {
        matches!(
            self.pipeline.track_state(),
            TrackState::Decoding | TrackState::DrainingToBoundary | TrackState::Deferred
        )
    }

    /// Dispatches one server command, driving the pipeline and raising any
    /// resulting downstream request.
    pub async fn handle_command(&self, command: ServerCommand) -> SlimResult<()> {
        match command {
            ServerCommand::StrmStart {
                url,
                format,
                start_time_offset_seconds,
                replay_gain_linear,
                is_gapless,
                target_start_jiffies,
            } => {
                self.handle_strm_start(
                    &url,
                    format,
                    start_time_offset_seconds,
                    replay_gain_linear,
                    is_gapless,
                    target_start_jiffies,
                )
                .await
            }
            ServerCommand::StrmPause => self.pipeline.pause(),
            ServerCommand::StrmResume => self.pipeline.resume(),
            ServerCommand::StrmStop => self.pipeline.stop_track().await,
            ServerCommand::SkipAhead { seconds } => self.pipeline.skip_ahead(seconds),
            ServerCommand::PlaySilence { seconds } => self.pipeline.play_silence(seconds),
            ServerCommand::SetVolume { volume } => {
                self.pipeline.volume_and_replay_gain().set_volume(volume);
                self.pipeline.refresh_volume_and_gain()
            }
            ServerCommand::SetReplayGain { gain } => {
                self.pipeline.volume_and_replay_gain().set_replay_gain(gain);
                self.pipeline.refresh_volume_and_gain()
            }
            ServerCommand::RequestFreshMetadata => {
                if let Some(info) = self.pipeline.metadata().current() {
                    let _ = self.downstream_tx.send(DownstreamRequest::MetadataUpdate {
                        track_id: self.pipeline.current_track_id(),
                        artist: info.artist,
                        title: info.title,
                    });
                }
                Ok(())
            }
        }
    }

    async fn handle_strm_start(
        &self,
        url: &str,
        format: crate::backend::DeclaredFormat,
        start_time_offset_seconds: f64,
        replay_gain_linear: f32,
        is_gapless: bool,
        target_start_jiffies: Option<std::time::Instant>,
    ) -> SlimResult<()> {
        if !is_gapless {
            self.pipeline.stop_track().await?;
            self.pipeline.flush_buffer()?;
            if self.pipeline.volume_and_replay_gain().is_silent_recovery() {
                self.pipeline.refresh_volume_and_gain()?;
            }
        }

        self.pipeline
            .ensure_output(INITIAL_SAMPLE_RATE, INITIAL_CHANNELS)
            .await?;

        let was_mid_transition = self.mid_track_transition();
        let result = self
            .pipeline
            .start_track(
                url,
                format,
                is_gapless,
                start_time_offset_seconds,
                replay_gain_linear,
            )
            .await;

        match &result {
            Ok(()) => {
                if let Some(target) = target_start_jiffies {
                    if !matches!(self.pipeline.track_state(), TrackState::Deferred) {
                        self.pipeline.start_at(target);
                    }
                }
            }
            Err(SlimError::Timeout(_)) if !was_mid_transition => {
                let _ = self.downstream_tx.send(DownstreamRequest::MinimalSeek {
                    seconds: MINIMAL_SEEK_SECONDS,
                });
            }
            Err(_) => {
                // unsupported_format / decoder errors already raised a
                // pipeline event inside `start_track`; the coordinator
                // just awaits the server's next command.
            }
        }
        result
    }
}
