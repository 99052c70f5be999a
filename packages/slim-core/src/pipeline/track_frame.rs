//! The Track Frame: byte-accounting state PSD holds for the current track
//! (spec §3).

/// Byte-accounting state for the currently selected decoder.
///
/// Every field here is owned exclusively by the pipeline's internal lock —
/// see [`super::psd::Pipeline`] for the serialization story.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFrame {
    /// Cumulative output-write byte offset at which this track begins
    /// being audible.
    pub track_start_bytes: u64,

    /// The prior track's start offset, kept until the boundary is crossed
    /// by playback.
    pub previous_track_start_bytes: u64,

    /// Set while a queued next track's first audible byte has been
    /// predicted but not yet reached.
    pub boundary_bytes: Option<u64>,

    /// Set when a new track has been scheduled but its first PCM byte has
    /// not yet been written to the output queue.
    pub pending_boundary_mark: bool,

    /// Non-zero when the server opened the stream at a seek point.
    pub track_start_time_offset_seconds: f64,

    /// Cumulative writes since output stream creation. Monotonic except
    /// when the output stream is recreated or the buffer is explicitly
    /// flushed (spec §9, ambiguity 1 — this crate picks "monotone except
    /// on recreate/flush").
    pub total_bytes_written: u64,

    /// PCM consumed from the decoder but not forwarded until this reaches
    /// zero (drift correction, spec §4.2.e).
    pub skip_ahead_bytes_remaining: u64,

    /// Whether `STMl` has been emitted for this track.
    pub sent_buffer_ready: bool,
}

impl TrackFrame {
    /// A frame for a brand-new, non-gapless track starting at
    /// `start_bytes` (the output stream's current playback position).
    pub fn fresh(start_bytes: u64, start_time_offset_seconds: f64) -> Self {
        Self {
            track_start_bytes: start_bytes,
            previous_track_start_bytes: 0,
            boundary_bytes: None,
            pending_boundary_mark: false,
            track_start_time_offset_seconds: start_time_offset_seconds,
            total_bytes_written: start_bytes,
            skip_ahead_bytes_remaining: 0,
            sent_buffer_ready: false,
        }
    }

    /// Arms a gapless transition: remembers where the current track
    /// started and marks that a boundary still needs to be predicted once
    /// the new decoder's first chunk is written.
    pub fn arm_gapless_transition(&mut self) {
        self.previous_track_start_bytes = self.track_start_bytes;
        self.pending_boundary_mark = true;
        self.sent_buffer_ready = false;
    }

    /// Commits a predicted boundary (spec §4.2.d): the new track's
    /// `track_start_bytes` becomes the predicted boundary, and
    /// `pending_boundary_mark` is cleared.
    pub fn commit_boundary(&mut self, boundary_bytes: u64) {
        self.boundary_bytes = Some(boundary_bytes);
        self.track_start_bytes = boundary_bytes;
        self.pending_boundary_mark = false;
    }

    /// Clears the boundary once the boundary sync has fired (spec §4.2,
    /// "Boundary callback").
    pub fn clear_boundary(&mut self) {
        self.boundary_bytes = None;
    }

    /// Resets all counters to zero, used by `flush_buffer` (spec §4.2.5).
    pub fn reset(&mut self) {
        *self = Self::fresh(0, self.track_start_time_offset_seconds);
    }
}
