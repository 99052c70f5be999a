//! Push-Stream Decoder Pipeline (PSD): the central subsystem (spec §4.2).
//!
//! Owns one long-lived output stream plus a transient per-track decoder,
//! runs the producer loop, computes track-boundary byte positions, handles
//! deferred starts, and exposes the drift-correction primitives.
//!
//! The spec's "pipeline main" single-task model is rendered here as a
//! `parking_lot::Mutex<PipelineInner>`: every mutation to the Track Frame
//! and output-stream bookkeeping happens while holding this lock, which
//! gives the same serialization guarantee (spec §5) without pinning all
//! callers to one executor task. Backend event callbacks are marshalled
//! onto a Tokio task (spawned once per output) that awaits the channel and
//! takes the same lock before touching state, so they are never invoked
//! from whatever thread the backend's own callback mechanism uses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;

use crate::backend::{
    AudioBackend, BackendAttr, BackendErrorKind, BackendEvent, DeclaredFormat, DecoderFlags,
    DecoderHandle, OutputHandle, ReadOutcome, StallDirection, SyncKind,
};
use crate::commands::DownstreamRequest;
use crate::error::{SlimError, SlimResult};
use crate::events::{PipelineEvent, PipelineEventEmitter};
use crate::metadata::StreamMetadataReader;
use crate::protocol_constants::{
    DECODER_ENDED_RETRY_SLEEP_MS, SOFT_CEILING_SLEEP_MS, SOFT_THROTTLE_SLEEP_MS,
    THROTTLE_LOG_INTERVAL_SECS, ZERO_BYTE_RETRY_SLEEP_MS,
};
use crate::runtime::TaskSpawner;
use crate::state::PipelineConfig;
use crate::volume::VolumeAndReplayGain;

use super::position::{self, OutputStreamState};
use super::track_frame::TrackFrame;

/// Per-track state machine (spec §4.2, "State machine").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Idle,
    Decoding,
    DrainingToBoundary,
    Playing,
    Completing,
    Deferred,
    Errored,
}

struct PendingDeferredTrack {
    decoder: DecoderHandle,
    sample_rate: u32,
    channels: u16,
}

struct SyncStartRequest {
    target_time: Instant,
}

struct PipelineInner {
    output: Option<OutputHandle>,
    output_sample_rate: u32,
    output_channels: u16,
    output_state: OutputStreamState,
    decoder: Option<DecoderHandle>,
    frame: TrackFrame,
    track_state: TrackState,
    manual_stop: bool,
    pending_deferred: Option<PendingDeferredTrack>,
    sync_start: Option<SyncStartRequest>,
    /// Bumped every time a new producer loop is started; a running
    /// producer checks this against the value it captured at spawn time
    /// to detect it has been superseded (stop/new-track/format-change)
    /// and should exit without touching state further.
    generation: u64,
    current_track_id: u64,
}

impl PipelineInner {
    fn new() -> Self {
        Self {
            output: None,
            output_sample_rate: 0,
            output_channels: 0,
            output_state: OutputStreamState::Stopped,
            decoder: None,
            frame: TrackFrame::fresh(0, 0.0),
            track_state: TrackState::Idle,
            manual_stop: false,
            pending_deferred: None,
            sync_start: None,
            generation: 0,
            current_track_id: 0,
        }
    }

    fn bytes_per_second(&self) -> f64 {
        position::bytes_per_second(self.output_sample_rate, self.output_channels)
    }
}

struct PipelineState {
    backend: Arc<dyn AudioBackend>,
    emitter: Arc<dyn PipelineEventEmitter>,
    spawner: Arc<dyn TaskSpawner>,
    config: PipelineConfig,
    vrg: VolumeAndReplayGain,
    metadata: StreamMetadataReader,
    downstream: UnboundedSender<DownstreamRequest>,
    next_track_id: AtomicU64,
    inner: Mutex<PipelineInner>,
}

/// Handle to the push-stream decoder pipeline. Cheaply `Clone`-able; every
/// clone refers to the same underlying state.
#[derive(Clone)]
pub struct Pipeline {
    state: Arc<PipelineState>,
}

impl Pipeline {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        emitter: Arc<dyn PipelineEventEmitter>,
        spawner: Arc<dyn TaskSpawner>,
        config: PipelineConfig,
        downstream: UnboundedSender<DownstreamRequest>,
    ) -> Self {
        Self {
            state: Arc::new(PipelineState {
                backend,
                emitter,
                spawner,
                config,
                vrg: VolumeAndReplayGain::new(),
                metadata: StreamMetadataReader::new(),
                downstream,
                next_track_id: AtomicU64::new(1),
                inner: Mutex::new(PipelineInner::new()),
            }),
        }
    }

    pub fn volume_and_replay_gain(&self) -> &VolumeAndReplayGain {
        &self.state.vrg
    }

    pub fn metadata(&self) -> &StreamMetadataReader {
        &self.state.metadata
    }

    /// Opaque id of the track currently selected (spec §4.5, used to stamp
    /// a `request_fresh_metadata` response with the right track).
    pub fn current_track_id(&self) -> u64 {
        self.state.inner.lock().current_track_id
    }

    /// Current track-relative playback position, in seconds (spec §4.3).
    /// Returns 0 if the output stream cannot report a meaningful position.
    pub fn current_position_seconds(&self) -> f64 {
        let inner = self.state.inner.lock();
        let Some(output) = inner.output else {
            return 0.0;
        };
        let playback_bytes = match self.state.backend.position_bytes(output) {
            Ok(bytes) => bytes,
            Err(_) => return 0.0,
        };
        position::current_position_seconds(
            inner.output_state,
            &inner.frame,
            playback_bytes,
            inner.output_sample_rate,
            inner.output_channels,
        )
    }

    pub fn track_state(&self) -> TrackState {
        self.state.inner.lock().track_state
    }

    /// Re-applies the stored volume/replay-gain to the current output, if
    /// one exists. Used when the coordinator handles a live
    /// `set_volume`/`set_replay_gain` command.
    pub fn refresh_volume_and_gain(&self) -> SlimResult<()> {
        let output = self.state.inner.lock().output;
        if let Some(output) = output {
            self.apply_volume_and_gain(output)?;
        }
        Ok(())
    }

    // ── 4.2.1: ensure_output ──────────────────────────────────────────

    /// Idempotent: creates the output stream if absent, applies stored
    /// volume/replay-gain, and starts the event-marshalling task for it.
    pub async fn ensure_output(&self, sample_rate: u32, channels: u16) -> SlimResult<()> {
        {
            let inner = self.state.inner.lock();
            if inner.output.is_some() {
                return Ok(());
            }
        }

        let (output, events) = self
            .state
            .backend
            .create_output(sample_rate, channels)
            .await?;

        {
            let mut inner = self.state.inner.lock();
            inner.output = Some(output);
            inner.output_sample_rate = sample_rate;
            inner.output_channels = channels;
            inner.output_state = OutputStreamState::Stopped;
        }

        self.apply_volume_and_gain(output)?;
        self.spawn_event_marshaller(output, events);
        Ok(())
    }

    fn apply_volume_and_gain(&self, output: OutputHandle) -> SlimResult<()> {
        self.state
            .backend
            .set_attr(output, BackendAttr::Volume, self.state.vrg.volume())?;
        self.state.backend.set_attr(
            output,
            BackendAttr::DspGain,
            self.state.vrg.effective_dsp_gain(),
        )?;
        Ok(())
    }

    fn spawn_event_marshaller(
        &self,
        output: OutputHandle,
        mut events: tokio::sync::mpsc::UnboundedReceiver<BackendEvent>,
    ) {
        let pipeline = self.clone();
        self.state.spawner.spawn_dyn(Box::pin(async move {
            while let Some(event) = events.recv().await {
                pipeline.handle_backend_event(output, event).await;
            }
        }));
    }

    async fn handle_backend_event(&self, output: OutputHandle, event: BackendEvent) {
        match event {
            BackendEvent::PositionReached { byte_position, .. } => {
                self.handle_boundary_fired(byte_position);
            }
            BackendEvent::Stall { direction } => {
                self.handle_stall(output, direction).await;
            }
            BackendEvent::End => {
                // Natural drain; the producer loop's own `ended` handling
                // is the authoritative source of `track_decode_complete`.
                // This arm exists for future consumers (e.g. the UI layer)
                // observing the raw device event.
            }
            BackendEvent::Meta(raw) => {
                if let Ok(text) = std::str::from_utf8(&raw) {
                    self.state.metadata.handle_icy_frame(text);
                    if let Some(info) = self.state.metadata.current() {
                        let track_id = self.current_track_id();
                        let _ = self.state.downstream.send(DownstreamRequest::MetadataUpdate {
                            track_id,
                            artist: info.artist,
                            title: info.title,
                        });
                    }
                }
            }
        }
    }

    // ── Boundary callback (spec §4.2, "Boundary callback") ────────────

    fn handle_boundary_fired(&self, _byte_position: u64) {
        let (track_id, deferred) = {
            let mut inner = self.state.inner.lock();
            if inner.frame.boundary_bytes.is_none() {
                // Already cleared (e.g. raced with a stop); ignore.
                return;
            }
            inner.frame.clear_boundary();
            inner.track_state = TrackState::Playing;
            (inner.current_track_id, false)
        };
        self.state.emitter.emit(PipelineEvent::TrackStarted {
            track_id,
            deferred,
        });
    }

    // ── Deferred-start handling (spec §4.2, "Deferred-start handling") ─

    async fn handle_stall(&self, output: OutputHandle, direction: StallDirection) {
        if !matches!(direction, StallDirection::Entered) {
            return;
        }
        let pending = {
            let mut inner = self.state.inner.lock();
            inner.pending_deferred.take()
        };
        let Some(pending) = pending else {
            return;
        };

        if let Err(err) = self.commit_deferred_track(output, pending).await {
            tracing::debug!(?err, "deferred track commit failed");
        }
    }

    async fn commit_deferred_track(
        &self,
        old_output: OutputHandle,
        pending: PendingDeferredTrack,
    ) -> SlimResult<()> {
        let _ = self.state.backend.free_output(old_output).await;

        let (new_output, events) = self
            .state
            .backend
            .create_output(pending.sample_rate, pending.channels)
            .await?;

        let track_id = self.next_track_id();
        {
            let mut inner = self.state.inner.lock();
            inner.output = Some(new_output);
            inner.output_sample_rate = pending.sample_rate;
            inner.output_channels = pending.channels;
            inner.output_state = OutputStreamState::Playing;
            inner.decoder = Some(pending.decoder);
            inner.frame = TrackFrame::fresh(0, 0.0);
            // A deferred commit bypasses the buffering-for-sync phase
            // entirely (spec §4.4, P5): it must never emit `STMl` for this
            // track, not merely emit it late.
            inner.frame.sent_buffer_ready = true;
            inner.track_state = TrackState::Playing;
            inner.sync_start = None; // deferred start is never a synced start
            inner.current_track_id = track_id;
            inner.generation += 1;
        }

        self.apply_volume_and_gain(new_output)?;
        self.spawn_event_marshaller(new_output, events);
        self.state.backend.channel_play(new_output, true)?;

        self.state.emitter.emit(PipelineEvent::TrackStarted {
            track_id,
            deferred: true,
        });

        self.spawn_producer(new_output, pending.decoder, track_id);
        Ok(())
    }

    fn next_track_id(&self) -> u64 {
        self.state.next_track_id.fetch_add(1, Ordering::Relaxed)
    }

    // ── 4.2.2: start_track ─────────────────────────────────────────────

    pub async fn start_track(
        &self,
        url: &str,
        format: DeclaredFormat,
        is_new_track: bool,
        start_time_offset_seconds: f64,
        replay_gain_linear: f32,
    ) -> SlimResult<()> {
        self.state.vrg.set_replay_gain(replay_gain_linear);

        let decoder = match self
            .state
            .backend
            .create_decoder(url, format, DecoderFlags::default())
            .await
        {
            Ok(decoder) => decoder,
            Err(err) => {
                let track_id = self.next_track_id();
                let slim_err: SlimError = err.into();
                if matches!(slim_err, SlimError::UnsupportedFormat(_)) {
                    self.state.emitter.emit(PipelineEvent::StreamFailed {
                        track_id,
                        code: slim_err.code(),
                    });
                }
                return Err(slim_err);
            }
        };

        let stream_info = self.state.backend.stream_info(decoder).await?;
        self.state.metadata.observe_stream_info(stream_info);

        let track_id = self.next_track_id();
        self.state
            .emitter
            .emit(PipelineEvent::StreamConnected { track_id });

        let (current_output, current_sample_rate, current_channels) = {
            let inner = self.state.inner.lock();
            (
                inner.output,
                inner.output_sample_rate,
                inner.output_channels,
            )
        };
        let format_matches = current_output.is_some()
            && current_sample_rate == stream_info.sample_rate
            && current_channels == stream_info.channels;
        // A true gapless continuation must NOT fence off the previous
        // track's still-draining producer (spec §5: "start_track() for a
        // new track may run while the previous producer is still
        // draining"). Every other path either already stopped that
        // producer (manual skip, via `stop_track`) or never started one
        // for the held decoder (deferred), so bumping `generation` there
        // is safe and necessary to supersede it.
        let gapless_continuation = is_new_track && format_matches;

        if is_new_track && current_output.is_some() && !format_matches {
            // Format-mismatched gapless transition: hold the decoder,
            // don't start its producer, let the current track finish.
            let mut inner = self.state.inner.lock();
            inner.pending_deferred = Some(PendingDeferredTrack {
                decoder,
                sample_rate: stream_info.sample_rate,
                channels: stream_info.channels,
            });
            inner.track_state = TrackState::Deferred;
            return Ok(());
        }

        let output = if !format_matches {
            // Manual skip with a mismatched format (or no output yet):
            // (re)create the output stream to match.
            if let Some(old_output) = current_output {
                let _ = self.state.backend.free_output(old_output).await;
            }
            let (output, events) = self
                .state
                .backend
                .create_output(stream_info.sample_rate, stream_info.channels)
                .await?;
            {
                let mut inner = self.state.inner.lock();
                inner.output = Some(output);
                inner.output_sample_rate = stream_info.sample_rate;
                inner.output_channels = stream_info.channels;
                inner.output_state = OutputStreamState::Stopped;
            }
            self.apply_volume_and_gain(output)?;
            self.spawn_event_marshaller(output, events);
            output
        } else {
            current_output.expect("format_matches implies an output exists")
        };

        // Gapless continuations wait for the boundary sync to fire before
        // announcing `track_started` (spec §4.2, "Boundary callback").
        // Every other path restarts playback from a freshly flushed
        // position with nothing left to wait for, so its first audible
        // sample is now, not some future callback.
        let starts_immediately = !is_new_track;

        {
            let mut inner = self.state.inner.lock();
            if is_new_track {
                inner.frame.arm_gapless_transition();
                inner.frame.track_start_time_offset_seconds = start_time_offset_seconds;
            } else {
                let playback_position = self
                    .state
                    .backend
                    .position_bytes(output)
                    .unwrap_or(0);
                inner.frame = TrackFrame::fresh(playback_position, start_time_offset_seconds);
            }
            inner.decoder = Some(decoder);
            inner.manual_stop = false;
            inner.track_state = if starts_immediately {
                TrackState::Playing
            } else {
                TrackState::Decoding
            };
            inner.output_state = OutputStreamState::Playing;
            inner.current_track_id = track_id;
            if !gapless_continuation {
                inner.generation += 1;
            }
        }

        self.apply_volume_and_gain(output)?;
        self.state.backend.channel_play(output, !is_new_track)?;

        if starts_immediately {
            self.state.emitter.emit(PipelineEvent::TrackStarted {
                track_id,
                deferred: false,
            });
        }

        self.spawn_producer(output, decoder, track_id);
        Ok(())
    }

    // ── 4.2.3 / 4.2.4: stop_track, pause, resume ───────────────────────

    pub async fn stop_track(&self) -> SlimResult<()> {
        let (output, decoder) = {
            let mut inner = self.state.inner.lock();
            inner.manual_stop = true;
            inner.pending_deferred = None;
            inner.sync_start = None;
            inner.generation += 1; // fence off the running producer
            (inner.output, inner.decoder.take())
        };
        if let Some(decoder) = decoder {
            let _ = self.state.backend.free_decoder(decoder).await;
        }
        if let Some(output) = output {
            self.state.backend.channel_stop(output)?;
        }
        Ok(())
    }

    pub fn pause(&self) -> SlimResult<()> {
        let output = {
            let mut inner = self.state.inner.lock();
            inner.output_state = OutputStreamState::Paused;
            inner.output
        };
        if let Some(output) = output {
            self.state.backend.channel_pause(output)?;
        }
        Ok(())
    }

    pub fn resume(&self) -> SlimResult<()> {
        let output = {
            let mut inner = self.state.inner.lock();
            inner.output_state = OutputStreamState::Playing;
            inner.output
        };
        if let Some(output) = output {
            if self.state.vrg.is_silent_recovery() {
                self.state
                    .backend
                    .set_attr(output, BackendAttr::DspGain, self.state.vrg.effective_dsp_gain())?;
            }
            self.state.backend.channel_play(output, false)?;
        }
        Ok(())
    }

    // ── 4.2.5: flush_buffer ────────────────────────────────────────────

    pub fn flush_buffer(&self) -> SlimResult<()> {
        let output = {
            let mut inner = self.state.inner.lock();
            inner.frame.reset();
            inner.output
        };
        if let Some(output) = output {
            self.state.backend.set_position_bytes(output, 0)?;
            self.state.backend.channel_play(output, true)?;
        }
        Ok(())
    }

    // ── 4.2.6: start_at ────────────────────────────────────────────────

    pub fn start_at(&self, target_time: Instant) {
        let look_ahead = Duration::from_secs_f64(self.state.config.sync_start_look_ahead_seconds);
        if target_time.saturating_duration_since(Instant::now()) > look_ahead {
            // Further out than the bounded look-ahead: treat as
            // misconfiguration, start immediately.
            let _ = self.resume();
            return;
        }
        {
            let mut inner = self.state.inner.lock();
            inner.sync_start = Some(SyncStartRequest { target_time });
        }
        self.spawn_sync_start_monitor(target_time);
    }

    fn spawn_sync_start_monitor(&self, target_time: Instant) {
        let pipeline = self.clone();
        let poll_interval = Duration::from_millis(self.state.config.sync_start_poll_interval_ms);
        self.state.spawner.spawn_dyn(Box::pin(async move {
            loop {
                let still_pending = {
                    let inner = pipeline.state.inner.lock();
                    matches!(&inner.sync_start, Some(req) if req.target_time == target_time)
                };
                if !still_pending {
                    return;
                }
                if Instant::now() >= target_time {
                    {
                        let mut inner = pipeline.state.inner.lock();
                        inner.sync_start = None;
                    }
                    let _ = pipeline.resume();
                    return;
                }
                sleep(poll_interval).await;
            }
        }));
    }

    // ── 4.2.7 / 4.2.8: skip_ahead, play_silence ─────────────────────────

    pub fn skip_ahead(&self, seconds: f64) -> SlimResult<()> {
        let mut inner = self.state.inner.lock();
        let bytes = skip_bytes(seconds, inner.bytes_per_second());
        inner.frame.skip_ahead_bytes_remaining += bytes;
        Ok(())
    }

    pub fn play_silence(&self, seconds: f64) -> SlimResult<()> {
        let (output, bytes_per_second) = {
            let inner = self.state.inner.lock();
            (inner.output, inner.bytes_per_second())
        };
        let Some(output) = output else {
            return Err(SlimError::InvalidState(
                "play_silence called with no output stream".to_string(),
            ));
        };
        let byte_count = skip_bytes(seconds, bytes_per_second);
        let silence = Bytes::from(vec![0u8; byte_count as usize]);
        self.state.backend.push_pcm(output, silence)?;
        let mut inner = self.state.inner.lock();
        inner.frame.total_bytes_written += byte_count;
        Ok(())
    }

    // ── Producer loop (spec §4.2, "Decoder loop (producer)") ───────────

    fn spawn_producer(&self, output: OutputHandle, decoder: DecoderHandle, track_id: u64) {
        let pipeline = self.clone();
        let generation = self.state.inner.lock().generation;
        self.state.spawner.spawn_dyn(Box::pin(async move {
            pipeline
                .run_producer_loop(output, decoder, track_id, generation)
                .await;
        }));
    }

    async fn run_producer_loop(
        &self,
        output: OutputHandle,
        decoder: DecoderHandle,
        track_id: u64,
        generation: u64,
    ) {
        let config = self.state.config.clone();
        let mut last_throttle_log = Instant::now() - Duration::from_secs(THROTTLE_LOG_INTERVAL_SECS);

        loop {
            if self.superseded(generation) {
                return;
            }

            let queued = match self.state.backend.queued_bytes(output) {
                Ok(bytes) => bytes,
                Err(_) => return,
            };

            // (a) soft throttle
            if queued > config.soft_throttle_bytes {
                if last_throttle_log.elapsed() >= Duration::from_secs(THROTTLE_LOG_INTERVAL_SECS) {
                    tracing::debug!(queued, "producer throttled: queue above soft threshold");
                    last_throttle_log = Instant::now();
                }
                sleep(Duration::from_millis(SOFT_THROTTLE_SLEEP_MS)).await;
                continue;
            }

            // (b) per-track soft ceiling, expressed in seconds of audio
            let bytes_per_second = self.state.inner.lock().bytes_per_second();
            let ceiling_bytes =
                (config.per_track_soft_ceiling_seconds * bytes_per_second) as u64;
            if queued > ceiling_bytes {
                sleep(Duration::from_millis(SOFT_CEILING_SLEEP_MS)).await;
                continue;
            }

            // (c) pull a fixed-size chunk
            let outcome = self
                .state
                .backend
                .read_chunk(decoder, config.decoder_chunk_bytes)
                .await;

            if self.superseded(generation) {
                return;
            }

            let chunk = match outcome {
                ReadOutcome::Data(data) if !data.is_empty() => data,
                ReadOutcome::Data(_) => {
                    sleep(Duration::from_millis(ZERO_BYTE_RETRY_SLEEP_MS)).await;
                    continue;
                }
                ReadOutcome::Ended {
                    transport_connected: true,
                } => {
                    sleep(Duration::from_millis(DECODER_ENDED_RETRY_SLEEP_MS)).await;
                    continue;
                }
                ReadOutcome::Ended {
                    transport_connected: false,
                } => {
                    let manual_stop = self.state.inner.lock().manual_stop;
                    if !manual_stop {
                        self.state
                            .emitter
                            .emit(PipelineEvent::TrackDecodeComplete { track_id });
                    }
                    self.state.inner.lock().track_state = TrackState::Completing;
                    return;
                }
                ReadOutcome::Error(kind) => {
                    let code = crate::error::ErrorCode::code(&kind);
                    self.state
                        .emitter
                        .emit(PipelineEvent::TrackDecodeError { track_id, code });
                    self.state.inner.lock().track_state = TrackState::Errored;
                    return;
                }
            };

            // (d) arm the boundary, if one is pending
            if self.state.inner.lock().frame.pending_boundary_mark {
                if let Err(err) = self.arm_boundary(output, track_id) {
                    tracing::debug!(?err, "failed to arm track boundary");
                }
            }

            // (e) drift: consume without emitting
            let chunk = {
                let mut inner = self.state.inner.lock();
                let remaining = inner.frame.skip_ahead_bytes_remaining;
                if remaining > 0 {
                    let consumed = remaining.min(chunk.len() as u64);
                    inner.frame.skip_ahead_bytes_remaining -= consumed;
                    inner.frame.total_bytes_written += consumed;
                    if consumed as usize == chunk.len() {
                        None
                    } else {
                        Some(chunk.slice(consumed as usize..))
                    }
                } else {
                    Some(chunk)
                }
            };
            let Some(chunk) = chunk else {
                continue;
            };

            // hard push limit check (spec §5, backpressure)
            if queued + chunk.len() as u64 > config.hard_push_limit_bytes {
                self.state.emitter.emit(PipelineEvent::TrackDecodeError {
                    track_id,
                    code: "push_limit_exceeded",
                });
                self.state.inner.lock().track_state = TrackState::Errored;
                return;
            }

            // (f) push and advance total_bytes_written
            if let Err(err) = self.state.backend.push_pcm(output, chunk.clone()) {
                tracing::debug!(?err, "push_pcm failed");
                self.state.emitter.emit(PipelineEvent::TrackDecodeError {
                    track_id,
                    code: "push_failed",
                });
                self.state.inner.lock().track_state = TrackState::Errored;
                return;
            }
            let chunk_len = chunk.len() as u64;
            let crossed_ready = {
                let mut inner = self.state.inner.lock();
                inner.frame.total_bytes_written += chunk_len;
                let bps = inner.bytes_per_second();
                let threshold_bytes = (config.buffer_ready_threshold_seconds * bps) as u64;
                // `total_bytes_written` is session-cumulative (spec §3), so
                // the threshold is measured against bytes written since
                // *this* track's own start, not the raw counter — otherwise
                // a gapless continuation inherits the old track's already-
                // crossed total and fires `STMl` immediately, mislabeled
                // for whichever producer happens to run next (spec §4.4).
                let track_bytes_written = inner
                    .frame
                    .total_bytes_written
                    .saturating_sub(inner.frame.track_start_bytes);
                let crossed =
                    !inner.frame.sent_buffer_ready && track_bytes_written >= threshold_bytes;
                if crossed {
                    inner.frame.sent_buffer_ready = true;
                }
                crossed
            };

            // (g) buffer-ready, once per track
            if crossed_ready {
                self.state
                    .emitter
                    .emit(PipelineEvent::BufferReady { track_id });
            }
        }
    }

    fn arm_boundary(&self, output: OutputHandle, _track_id: u64) -> SlimResult<()> {
        let playback_position = self.state.backend.position_bytes(output)?;
        let queued = self.state.backend.queued_bytes(output)?;
        let available = self.state.backend.available_playback_bytes(output)?;
        let boundary_bytes = playback_position + queued + available;

        self.state
            .backend
            .register_sync(output, SyncKind::PositionByte, boundary_bytes)?;

        let mut inner = self.state.inner.lock();
        inner.frame.commit_boundary(boundary_bytes);
        inner.track_state = TrackState::DrainingToBoundary;
        Ok(())
    }

    fn superseded(&self, generation: u64) -> bool {
        self.state.inner.lock().generation != generation
    }

    /// Test-only introspection: the output handle currently backing the
    /// pipeline, if any.
    #[cfg(test)]
    pub(crate) fn current_output(&self) -> Option<OutputHandle> {
        self.state.inner.lock().output
    }

    /// Test-only introspection: a snapshot of the current Track Frame.
    #[cfg(test)]
    pub(crate) fn frame_snapshot(&self) -> TrackFrame {
        self.state.inner.lock().frame.clone()
    }
}

/// `⌊seconds × bytes_per_second⌋`, shared by `skip_ahead` and
/// `play_silence` so both account identically (spec P6/P7).
fn skip_bytes(seconds: f64, bytes_per_second: f64) -> u64 {
    (seconds * bytes_per_second).floor() as u64
}
