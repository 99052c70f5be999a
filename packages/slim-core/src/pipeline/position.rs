//! Playback Position Model (PPM): pure functions turning byte offsets into
//! a current track second (spec §4.3).

use super::track_frame::TrackFrame;

/// Output stream playback state, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStreamState {
    Stopped,
    Playing,
    Paused,
    Stalled,
    Invalid,
}

impl OutputStreamState {
    fn reports_position(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// Bytes per second of audio for the given format (spec §4.3:
/// `sample_rate * channels * 4`, 32-bit float output).
pub fn bytes_per_second(sample_rate: u32, channels: u16) -> f64 {
    sample_rate as f64 * channels as f64 * crate::protocol_constants::SAMPLE_WIDTH_BYTES as f64
}

/// Computes the current track-relative position in seconds.
///
/// Pure: does not read or write any pipeline state beyond its arguments.
/// Saturates at 0 on underflow rather than returning a negative position
/// (spec §7, "programmer errors").
pub fn current_position_seconds(
    state: OutputStreamState,
    frame: &TrackFrame,
    playback_position_bytes: u64,
    sample_rate: u32,
    channels: u16,
) -> f64 {
    if !state.reports_position() {
        return 0.0;
    }

    let bps = bytes_per_second(sample_rate, channels);
    if bps <= 0.0 {
        return 0.0;
    }

    if let Some(boundary) = frame.boundary_bytes {
        if playback_position_bytes < boundary {
            if playback_position_bytes < frame.previous_track_start_bytes {
                return 0.0;
            }
            return (playback_position_bytes - frame.previous_track_start_bytes) as f64 / bps
                + frame.track_start_time_offset_seconds;
        }
    }

    if playback_position_bytes < frame.track_start_bytes {
        return 0.0;
    }
    (playback_position_bytes - frame.track_start_bytes) as f64 / bps
        + frame.track_start_time_offset_seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44_100;
    const CH: u16 = 2;

    #[test]
    fn stopped_stream_reports_zero() {
        let frame = TrackFrame::fresh(0, 0.0);
        let seconds = current_position_seconds(OutputStreamState::Stopped, &frame, 44_100 * 2 * 4, SR, CH);
        assert_eq!(seconds, 0.0);
    }

    #[test]
    fn mid_track_position_is_exact() {
        let frame = TrackFrame::fresh(0, 0.0);
        let bps = bytes_per_second(SR, CH);
        let playback = (bps * 3.0) as u64;
        let seconds = current_position_seconds(OutputStreamState::Playing, &frame, playback, SR, CH);
        assert!((seconds - 3.0).abs() < 1e-9);
    }

    #[test]
    fn before_boundary_uses_previous_track_start() {
        let mut frame = TrackFrame::fresh(0, 0.0);
        frame.previous_track_start_bytes = 1000;
        frame.boundary_bytes = Some(5000);
        frame.track_start_bytes = 5000;

        let seconds = current_position_seconds(OutputStreamState::Playing, &frame, 2000, SR, CH);
        let bps = bytes_per_second(SR, CH);
        assert!((seconds - (1000.0 / bps)).abs() < 1e-9);
    }

    #[test]
    fn before_previous_track_start_saturates_zero() {
        let mut frame = TrackFrame::fresh(0, 0.0);
        frame.previous_track_start_bytes = 1000;
        frame.boundary_bytes = Some(5000);

        let seconds = current_position_seconds(OutputStreamState::Playing, &frame, 500, SR, CH);
        assert_eq!(seconds, 0.0);
    }

    #[test]
    fn after_boundary_uses_track_start_bytes() {
        let mut frame = TrackFrame::fresh(0, 0.0);
        frame.previous_track_start_bytes = 1000;
        frame.boundary_bytes = Some(5000);
        frame.track_start_bytes = 5000;

        let bps = bytes_per_second(SR, CH);
        let playback = 5000 + bps as u64;
        let seconds = current_position_seconds(OutputStreamState::Playing, &frame, playback, SR, CH);
        assert!((seconds - 1.0).abs() < 1e-9);
    }

    #[test]
    fn start_time_offset_is_additive() {
        let frame = TrackFrame::fresh(0, 30.0);
        let seconds = current_position_seconds(OutputStreamState::Playing, &frame, 0, SR, CH);
        assert!((seconds - 30.0).abs() < 1e-9);
    }

    #[test]
    fn before_track_start_saturates_zero() {
        let frame = TrackFrame::fresh(10_000, 0.0);
        let seconds = current_position_seconds(OutputStreamState::Playing, &frame, 100, SR, CH);
        assert_eq!(seconds, 0.0);
    }
}
