//! [`NullAudioBackend`]: an in-memory [`AudioBackend`] double for tests.
//!
//! Mirrors the teacher's `sonos::test_fixtures` fake-client pattern: no
//! real audio device or network socket, just enough bookkeeping that the
//! pipeline's state machine can be exercised deterministically and its
//! test can drive playback progress and decoder output explicitly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{
    AudioBackend, BackendAttr, BackendError, BackendErrorKind, BackendEvent, BackendResult,
    DeclaredFormat, DecoderFlags, DecoderHandle, OutputHandle, ReadOutcome, StallDirection,
    StreamInfo, SyncId, SyncKind,
};
use super::types::HandleAllocator;

struct OutputState {
    position_bytes: u64,
    queued_bytes: u64,
    /// Bytes considered committed to the device's internal buffer beyond
    /// `queued_bytes`; zero unless a test opts in via
    /// [`NullAudioBackend::set_internal_buffered`].
    internal_buffer_bytes: u64,
    playing: bool,
    volume: f32,
    dsp_gain: f32,
    syncs: Vec<(SyncId, SyncKind, u64)>,
    events: mpsc::UnboundedSender<BackendEvent>,
}

struct DecoderState {
    info: StreamInfo,
    /// Preset chunk sequence a test pushes ahead of time; each `read_chunk`
    /// call pops the front entry, or returns `Ended { transport_connected:
    /// true }` once the script is exhausted and `exhausted_is_error` is
    /// unset.
    script: VecDeque<ReadOutcome>,
}

/// An in-memory [`AudioBackend`] with no real decode or audio device.
///
/// Tests configure a decoder's declared [`StreamInfo`] and chunk script up
/// front via [`NullAudioBackend::configure_decoder`], then drive audible
/// playback forward with [`NullAudioBackend::advance_playback`] to fire
/// registered syncs the way a real device's callback thread would.
pub struct NullAudioBackend {
    handles: HandleAllocator,
    outputs: DashMap<u64, OutputState>,
    decoders: DashMap<u64, DecoderState>,
    fail_next_decoder: AtomicBool,
    decoder_defaults: Mutex<StreamInfo>,
    /// Scripts queued ahead of time for decoders not yet created; each
    /// `create_decoder` call consumes the front entry (spec-test
    /// convenience, since `start_track` creates its own decoder handle
    /// internally before a caller could configure it by handle).
    queued_scripts: Mutex<VecDeque<Vec<ReadOutcome>>>,
}

impl Default for NullAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NullAudioBackend {
    pub fn new() -> Self {
        Self {
            handles: HandleAllocator::default(),
            outputs: DashMap::new(),
            decoders: DashMap::new(),
            fail_next_decoder: AtomicBool::new(false),
            decoder_defaults: Mutex::new(StreamInfo {
                codec: super::DiscoveredCodec::Flac,
                sample_rate: 44_100,
                channels: 2,
                bit_depth: 16,
                bitrate_bps: 900_000,
            }),
            queued_scripts: Mutex::new(VecDeque::new()),
        }
    }

    /// Queues a chunk script for the *next* `create_decoder` call,
    /// regardless of the handle it is assigned.
    pub fn queue_decoder_script(&self, script: Vec<ReadOutcome>) {
        self.queued_scripts.lock().push_back(script);
    }

    /// Makes the next `create_decoder` call fail with `UnsupportedFormat`.
    pub fn fail_next_decoder_creation(&self) {
        self.fail_next_decoder.store(true, Ordering::SeqCst);
    }

    /// Overrides the [`StreamInfo`] newly created decoders report.
    pub fn set_decoder_defaults(&self, info: StreamInfo) {
        *self.decoder_defaults.lock() = info;
    }

    /// Presets the chunk sequence a decoder's `read_chunk` will return, in
    /// order. Once exhausted, subsequent calls return
    /// `Ended { transport_connected: true }`.
    pub fn configure_decoder_script(&self, handle: DecoderHandle, script: Vec<ReadOutcome>) {
        if let Some(mut decoder) = self.decoders.get_mut(&handle.0) {
            decoder.script = script.into();
        }
    }

    /// Simulates the audio device's callback thread advancing audible
    /// playback by `bytes`, firing any due `PositionByte`/`End` syncs onto
    /// the output's event channel.
    pub fn advance_playback(&self, output: OutputHandle, bytes: u64) {
        let mut state = match self.outputs.get_mut(&output.0) {
            Some(s) => s,
            None => return,
        };
        state.position_bytes += bytes.min(state.queued_bytes);
        state.queued_bytes = state.queued_bytes.saturating_sub(bytes);

        let position = state.position_bytes;
        let mut fired = Vec::new();
        state.syncs.retain(|(id, kind, arg)| {
            if matches!(kind, SyncKind::PositionByte) && position >= *arg {
                fired.push(BackendEvent::PositionReached {
                    sync_id: *id,
                    byte_position: position,
                });
                false
            } else {
                true
            }
        });
        for event in fired {
            let _ = state.events.send(event);
        }
        if state.queued_bytes == 0 {
            let _ = state.events.send(BackendEvent::End);
        }
    }

    /// Simulates a stall transition on `output`.
    pub fn simulate_stall(&self, output: OutputHandle, direction: StallDirection) {
        if let Some(state) = self.outputs.get(&output.0) {
            let _ = state.events.send(BackendEvent::Stall { direction });
        }
    }

    /// Sets the simulated internal-buffer headroom reported by
    /// `available_playback_bytes`.
    pub fn set_internal_buffered(&self, output: OutputHandle, bytes: u64) {
        if let Some(mut state) = self.outputs.get_mut(&output.0) {
            state.internal_buffer_bytes = bytes;
        }
    }

    /// Simulates an ICY metadata frame arriving on `output`.
    pub fn simulate_meta(&self, output: OutputHandle, raw: Bytes) {
        if let Some(state) = self.outputs.get(&output.0) {
            let _ = state.events.send(BackendEvent::Meta(raw));
        }
    }
}

#[async_trait]
impl AudioBackend for NullAudioBackend {
    async fn create_output(
        &self,
        _sample_rate: u32,
        _channels: u16,
    ) -> BackendResult<(OutputHandle, mpsc::UnboundedReceiver<BackendEvent>)> {
        let id = self.handles.next();
        let (tx, rx) = mpsc::unbounded_channel();
        self.outputs.insert(
            id,
            OutputState {
                position_bytes: 0,
                queued_bytes: 0,
                internal_buffer_bytes: 0,
                playing: false,
                volume: 1.0,
                dsp_gain: 1.0,
                syncs: Vec::new(),
                events: tx,
            },
        );
        Ok((OutputHandle(id), rx))
    }

    async fn free_output(&self, handle: OutputHandle) -> BackendResult<()> {
        self.outputs.remove(&handle.0);
        Ok(())
    }

    async fn create_decoder(
        &self,
        _url: &str,
        _declared_format: DeclaredFormat,
        _flags: DecoderFlags,
    ) -> BackendResult<DecoderHandle> {
        if self.fail_next_decoder.swap(false, Ordering::SeqCst) {
            return Err(BackendError::new(
                BackendErrorKind::UnsupportedFormat,
                "mock configured to reject this decoder",
            ));
        }
        let id = self.handles.next();
        let script = self
            .queued_scripts
            .lock()
            .pop_front()
            .map(VecDeque::from)
            .unwrap_or_default();
        self.decoders.insert(
            id,
            DecoderState {
                info: *self.decoder_defaults.lock(),
                script,
            },
        );
        Ok(DecoderHandle(id))
    }

    async fn free_decoder(&self, handle: DecoderHandle) -> BackendResult<()> {
        self.decoders.remove(&handle.0);
        Ok(())
    }

    async fn stream_info(&self, handle: DecoderHandle) -> BackendResult<StreamInfo> {
        self.decoders
            .get(&handle.0)
            .map(|d| d.info)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown decoder"))
    }

    async fn read_chunk(&self, handle: DecoderHandle, _max_bytes: usize) -> ReadOutcome {
        match self.decoders.get_mut(&handle.0) {
            Some(mut decoder) => decoder
                .script
                .pop_front()
                .unwrap_or(ReadOutcome::Ended {
                    transport_connected: true,
                }),
            None => ReadOutcome::Error(BackendErrorKind::InvalidState),
        }
    }

    fn push_pcm(&self, output: OutputHandle, data: Bytes) -> BackendResult<u64> {
        let mut state = self
            .outputs
            .get_mut(&output.0)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))?;
        state.queued_bytes += data.len() as u64;
        Ok(state.queued_bytes)
    }

    fn channel_play(&self, output: OutputHandle, restart: bool) -> BackendResult<()> {
        let mut state = self
            .outputs
            .get_mut(&output.0)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))?;
        if restart {
            state.position_bytes = 0;
        }
        state.playing = true;
        Ok(())
    }

    fn channel_pause(&self, output: OutputHandle) -> BackendResult<()> {
        let mut state = self
            .outputs
            .get_mut(&output.0)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))?;
        state.playing = false;
        Ok(())
    }

    fn channel_stop(&self, output: OutputHandle) -> BackendResult<()> {
        let mut state = self
            .outputs
            .get_mut(&output.0)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))?;
        state.playing = false;
        state.queued_bytes = 0;
        state.syncs.clear();
        Ok(())
    }

    fn position_bytes(&self, output: OutputHandle) -> BackendResult<u64> {
        self.outputs
            .get(&output.0)
            .map(|s| s.position_bytes)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))
    }

    fn queued_bytes(&self, output: OutputHandle) -> BackendResult<u64> {
        self.outputs
            .get(&output.0)
            .map(|s| s.queued_bytes)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))
    }

    fn available_playback_bytes(&self, output: OutputHandle) -> BackendResult<u64> {
        self.outputs
            .get(&output.0)
            .map(|s| s.internal_buffer_bytes)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))
    }

    fn set_position_bytes(&self, output: OutputHandle, pos: u64) -> BackendResult<()> {
        let mut state = self
            .outputs
            .get_mut(&output.0)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))?;
        state.position_bytes = pos;
        Ok(())
    }

    fn register_sync(
        &self,
        output: OutputHandle,
        kind: SyncKind,
        arg: u64,
    ) -> BackendResult<SyncId> {
        let mut state = self
            .outputs
            .get_mut(&output.0)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))?;
        let id = SyncId(self.handles.next());
        state.syncs.push((id, kind, arg));
        Ok(id)
    }

    fn unregister_sync(&self, output: OutputHandle, sync_id: SyncId) -> BackendResult<()> {
        let mut state = self
            .outputs
            .get_mut(&output.0)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))?;
        state.syncs.retain(|(id, _, _)| *id != sync_id);
        Ok(())
    }

    fn set_attr(&self, output: OutputHandle, attr: BackendAttr, value: f32) -> BackendResult<()> {
        let mut state = self
            .outputs
            .get_mut(&output.0)
            .ok_or_else(|| BackendError::new(BackendErrorKind::InvalidState, "unknown output"))?;
        match attr {
            BackendAttr::Volume => state.volume = value,
            BackendAttr::DspGain => state.dsp_gain = value,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_output_then_push_and_advance_fires_position_sync() {
        let backend = NullAudioBackend::new();
        let (output, mut events) = backend.create_output(44_100, 2).await.unwrap();
        backend.push_pcm(output, Bytes::from(vec![0u8; 1024])).unwrap();
        let sync_id = backend
            .register_sync(output, SyncKind::PositionByte, 512)
            .unwrap();

        backend.advance_playback(output, 512);

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            BackendEvent::PositionReached {
                sync_id,
                byte_position: 512
            }
        );
    }

    #[tokio::test]
    async fn fully_drained_output_fires_end() {
        let backend = NullAudioBackend::new();
        let (output, mut events) = backend.create_output(44_100, 2).await.unwrap();
        backend.push_pcm(output, Bytes::from(vec![0u8; 128])).unwrap();

        backend.advance_playback(output, 128);

        assert_eq!(events.recv().await.unwrap(), BackendEvent::End);
    }

    #[tokio::test]
    async fn fail_next_decoder_creation_returns_unsupported_format() {
        let backend = NullAudioBackend::new();
        backend.fail_next_decoder_creation();
        let err = backend
            .create_decoder("http://example.invalid/track", DeclaredFormat::Flac, DecoderFlags::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::UnsupportedFormat);
    }

    #[tokio::test]
    async fn read_chunk_follows_configured_script() {
        let backend = NullAudioBackend::new();
        let decoder = backend
            .create_decoder("http://example.invalid/track", DeclaredFormat::Flac, DecoderFlags::default())
            .await
            .unwrap();
        backend.configure_decoder_script(
            decoder,
            vec![
                ReadOutcome::Data(Bytes::from(vec![1u8; 4])),
                ReadOutcome::Ended {
                    transport_connected: false,
                },
            ],
        );

        assert_eq!(
            backend.read_chunk(decoder, 4096).await,
            ReadOutcome::Data(Bytes::from(vec![1u8; 4]))
        );
        assert_eq!(
            backend.read_chunk(decoder, 4096).await,
            ReadOutcome::Ended {
                transport_connected: false
            }
        );
    }
}
