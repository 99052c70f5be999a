//! Server Time Tracker (STT): interpolates a server-authoritative playhead
//! for display and fallback timing (spec §4.6).
//!
//! Never consulted by the pipeline for boundary decisions — UI/lock-screen
//! use only.

use std::time::Instant;

use parking_lot::Mutex;

use crate::protocol_constants::SERVER_TIME_FRESHNESS_SECS;

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    server_time_seconds: f64,
    snapshot_taken_at: Instant,
    is_playing: bool,
    duration_seconds: f64,
}

/// Tracks the most recent server-reported playhead and interpolates a
/// current position from it.
pub struct ServerTimeTracker {
    snapshot: Mutex<Option<Snapshot>>,
}

impl Default for ServerTimeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerTimeTracker {
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(None),
        }
    }

    /// Records a fresh status snapshot from the server.
    pub fn record(&self, server_time_seconds: f64, is_playing: bool, duration_seconds: f64) {
        *self.snapshot.lock() = Some(Snapshot {
            server_time_seconds,
            snapshot_taken_at: Instant::now(),
            is_playing,
            duration_seconds,
        });
    }

    /// Interpolated "now", in seconds: `server_time + elapsed` while
    /// playing, else the last reported `server_time` unchanged.
    pub fn current_time_seconds(&self) -> Option<f64> {
        let snapshot = (*self.snapshot.lock())?;
        if snapshot.is_playing {
            let elapsed = snapshot.snapshot_taken_at.elapsed().as_secs_f64();
            Some(snapshot.server_time_seconds + elapsed)
        } else {
            Some(snapshot.server_time_seconds)
        }
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.snapshot.lock().map(|s| s.duration_seconds)
    }

    /// True if the last recorded snapshot is younger than
    /// [`SERVER_TIME_FRESHNESS_SECS`].
    pub fn is_fresh(&self) -> bool {
        match *self.snapshot.lock() {
            Some(snapshot) => {
                snapshot.snapshot_taken_at.elapsed().as_secs() < SERVER_TIME_FRESHNESS_SECS
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_snapshot_yields_none() {
        let stt = ServerTimeTracker::new();
        assert_eq!(stt.current_time_seconds(), None);
        assert!(!stt.is_fresh());
    }

    #[test]
    fn paused_snapshot_does_not_advance() {
        let stt = ServerTimeTracker::new();
        stt.record(42.0, false, 300.0);
        assert_eq!(stt.current_time_seconds(), Some(42.0));
    }

    #[test]
    fn playing_snapshot_interpolates_forward() {
        let stt = ServerTimeTracker::new();
        stt.record(10.0, true, 300.0);
        std::thread::sleep(std::time::Duration::from_millis(20));
        let now = stt.current_time_seconds().unwrap();
        assert!(now >= 10.0);
        assert!(now < 10.0 + 1.0);
    }

    #[test]
    fn fresh_snapshot_reports_fresh() {
        let stt = ServerTimeTracker::new();
        stt.record(0.0, false, 0.0);
        assert!(stt.is_fresh());
    }
}
