//! Audio Backend Adapter (ABA): the trait boundary between the pipeline and
//! whatever native audio library drives output (spec §4.1, §6.2).
//!
//! A real backend (BASS, `cpal`, or similar) lives outside this crate's
//! scope — this module defines the contract and ships [`mock::NullAudioBackend`],
//! an in-memory double used for pipeline tests.

pub mod mock;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

pub use types::{
    BackendAttr, BackendEvent, DeclaredFormat, DecoderFlags, DecoderHandle, DiscoveredCodec,
    OutputHandle, StallDirection, StreamInfo, SyncId, SyncKind,
};

/// Error kinds a backend call can fail with (spec §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The decoder rejected the declared/discovered format.
    UnsupportedFormat,
    /// The backend call did not complete within its allotted time.
    Timeout,
    /// The output queue is at its hard limit.
    QueueFull,
    /// The handle is not in a state that supports the requested operation.
    InvalidState,
    /// An opaque backend-specific error code.
    Unknown(i32),
}

/// Error returned by [`AudioBackend`] methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for BackendError {}

pub type BackendResult<T> = Result<T, BackendError>;

/// Outcome of pulling one chunk from a decoder (spec §4.2.c).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// PCM data was available.
    Data(Bytes),
    /// The decoder reached end-of-stream.
    Ended {
        /// Whether the underlying HTTP transport is still connected. A
        /// `false` here distinguishes a genuine decode-complete from a
        /// transport stall the producer should retry past.
        transport_connected: bool,
    },
    /// The decoder hit a hard error mid-track.
    Error(BackendErrorKind),
}

/// The Audio Backend Adapter contract (spec §4.1).
///
/// Implementations own the native audio library and are responsible for
/// marshalling any internal callback thread's events onto the channel
/// returned by [`create_output`](AudioBackend::create_output) rather than
/// invoking callbacks directly — pipeline main is the only task permitted
/// to touch pipeline state (spec §5).
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Creates an output stream at the given sample rate/channel count,
    /// returning its handle and the channel backend events for it arrive on.
    async fn create_output(
        &self,
        sample_rate: u32,
        channels: u16,
    ) -> BackendResult<(OutputHandle, mpsc::UnboundedReceiver<BackendEvent>)>;

    /// Releases an output stream and all its registered syncs.
    async fn free_output(&self, handle: OutputHandle) -> BackendResult<()>;

    /// Opens a decoder against `url`, declaring the expected format.
    async fn create_decoder(
        &self,
        url: &str,
        declared_format: DeclaredFormat,
        flags: DecoderFlags,
    ) -> BackendResult<DecoderHandle>;

    /// Releases a decoder.
    async fn free_decoder(&self, handle: DecoderHandle) -> BackendResult<()>;

    /// Reads the format/quality info discovered when the decoder opened.
    async fn stream_info(&self, handle: DecoderHandle) -> BackendResult<StreamInfo>;

    /// Pulls up to `max_bytes` of decoded PCM from `handle`.
    async fn read_chunk(&self, handle: DecoderHandle, max_bytes: usize) -> ReadOutcome;

    /// Pushes a chunk of PCM onto an output's queue, returning the new
    /// queued byte count.
    fn push_pcm(&self, output: OutputHandle, data: Bytes) -> BackendResult<u64>;

    /// Starts or restarts playback on an output.
    fn channel_play(&self, output: OutputHandle, restart: bool) -> BackendResult<()>;

    /// Pauses playback on an output without discarding its queue.
    fn channel_pause(&self, output: OutputHandle) -> BackendResult<()>;

    /// Stops playback and discards an output's queue.
    fn channel_stop(&self, output: OutputHandle) -> BackendResult<()>;

    /// Returns the audible playback position, in output bytes.
    fn position_bytes(&self, output: OutputHandle) -> BackendResult<u64>;

    /// Returns the number of bytes queued but not yet played.
    fn queued_bytes(&self, output: OutputHandle) -> BackendResult<u64>;

    /// Returns bytes already committed into the backend's internal mix
    /// buffer that are not reflected in `queued_bytes` — headroom between
    /// the app-level queue and what the device has actually latched for
    /// playback. Used alongside `position_bytes`/`queued_bytes` to predict
    /// boundary positions (spec §4.2.d).
    fn available_playback_bytes(&self, output: OutputHandle) -> BackendResult<u64>;

    /// Rebase the output's position counter to `pos` without touching its
    /// queue (used by boundary-crossing gapless joins, spec §4.3).
    fn set_position_bytes(&self, output: OutputHandle, pos: u64) -> BackendResult<()>;

    /// Registers a sync callback; fires once as a [`BackendEvent`] on the
    /// output's event channel.
    fn register_sync(
        &self,
        output: OutputHandle,
        kind: SyncKind,
        arg: u64,
    ) -> BackendResult<SyncId>;

    /// Cancels a previously registered sync that has not yet fired.
    fn unregister_sync(&self, output: OutputHandle, sync_id: SyncId) -> BackendResult<()>;

    /// Sets a float-valued attribute on an output (volume, DSP gain).
    fn set_attr(&self, output: OutputHandle, attr: BackendAttr, value: f32) -> BackendResult<()>;
}
