//! Handle, attribute, and event types shared by [`super::AudioBackend`]
//! implementations.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

/// Opaque handle to a created output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputHandle(pub u64);

/// Opaque handle to a created decoder stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderHandle(pub u64);

/// Opaque identifier for a registered sync callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncId(pub u64);

/// Monotonic handle/id allocator shared by backend implementations.
#[derive(Default)]
pub(crate) struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    pub(crate) fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Declared input audio format, as negotiated with the server (spec §6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredFormat {
    Mp3,
    Aac,
    OggVorbis,
    Opus,
    Flac,
    FlacInOgg,
    WavPcm,
    WavFloat,
    Aiff,
}

/// Discovered codec, reported by [`super::AudioBackend::stream_info`] and
/// mapped by the Stream Metadata Reader (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveredCodec {
    Mp3,
    OggVorbis,
    Opus,
    Flac,
    FlacInOgg,
    WavPcm,
    WavFloat,
    Aiff,
    Aac,
    Unknown(u32),
}

/// Flags passed to [`super::AudioBackend::create_decoder`] (spec §4.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderFlags {
    /// Decode without driving an output device directly.
    pub decode_only: bool,
    /// Request 32-bit float samples.
    pub float_samples: bool,
}

/// Format and quality information read from a decoder at creation time
/// (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub codec: DiscoveredCodec,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub bitrate_bps: u32,
}

/// Sync callback kinds (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    /// Fires once audible playback reaches a given output byte position.
    PositionByte,
    /// Fires on stall entered/exited.
    Stall,
    /// Fires when playback of the output stream naturally ends.
    End,
    /// Fires when the decoder reports an ICY/meta update.
    Meta,
}

/// Direction of a stall transition (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallDirection {
    Entered,
    Exited,
}

/// Settable attributes on a handle (spec §4.1, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendAttr {
    /// Linear user volume, `[0.0, 1.0]`.
    Volume,
    /// Linear DSP gain (replay gain / silent-recovery mute), `[0.0, 2.0]`.
    DspGain,
}

/// Events the backend marshals to pipeline main (spec §5, §9).
///
/// Delivered over the channel returned by
/// [`super::AudioBackend::create_output`], never invoked as a raw callback
/// from the audio thread — this is the Rust rendering of "serialize before
/// touching any state".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// A `position_byte` sync fired: audible playback reached `byte_position`.
    PositionReached {
        sync_id: SyncId,
        byte_position: u64,
    },
    /// A stall transition was observed.
    Stall { direction: StallDirection },
    /// The output stream's queued data fully drained and played out.
    End,
    /// An ICY metadata update arrived from the decoder's HTTP source,
    /// carrying the raw `StreamTitle='...';` frame.
    Meta(Bytes),
}
