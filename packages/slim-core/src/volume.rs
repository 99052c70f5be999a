//! Volume & ReplayGain (VRG): stored volume and per-track gain applied to
//! the output stream (spec §4.7).
//!
//! Clamping discipline mirrors the teacher's `services/volume.rs`: every
//! setter clamps on the way in so the stored value is always valid for the
//! backend's attribute range, rather than validating on read.

use parking_lot::Mutex;

/// Replay gain is a linear multiplier clamped to `[0, 2]` (≤ +6 dB).
pub const MAX_REPLAY_GAIN_LINEAR: f32 = 2.0;

/// DSP-gain value used while silent-recovery is active (≈ −60 dB).
pub const SILENT_RECOVERY_GAIN_LINEAR: f32 = 0.001;

/// Clamps a user volume to the valid `[0.0, 1.0]` range.
pub fn clamp_volume(volume: f32) -> f32 {
    volume.clamp(0.0, 1.0)
}

/// Clamps a replay-gain multiplier to the valid `[0.0, 2.0]` range.
pub fn clamp_replay_gain(gain: f32) -> f32 {
    gain.clamp(0.0, MAX_REPLAY_GAIN_LINEAR)
}

struct State {
    volume: f32,
    replay_gain: f32,
    silent_recovery: bool,
}

/// Stored volume and replay-gain state, applied to the output stream's
/// `Volume`/`DspGain` attributes by the pipeline.
///
/// Volume and replay gain are tracked as two distinct attributes because
/// they are distinct in the backend's sample pipeline: volume is the
/// user-facing control, DSP-gain is an internal multiplier also used for
/// silent-recovery muting.
pub struct VolumeAndReplayGain {
    state: Mutex<State>,
}

impl Default for VolumeAndReplayGain {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeAndReplayGain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                volume: 1.0,
                replay_gain: 1.0,
                silent_recovery: false,
            }),
        }
    }

    /// Stores a new user volume; callers apply it to the output stream
    /// separately (it is stored even when no output stream exists yet).
    pub fn set_volume(&self, volume: f32) {
        self.state.lock().volume = clamp_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    /// Stores a new replay-gain multiplier.
    pub fn set_replay_gain(&self, gain: f32) {
        self.state.lock().replay_gain = clamp_replay_gain(gain);
    }

    pub fn replay_gain(&self) -> f32 {
        self.state.lock().replay_gain
    }

    /// Enters silent-recovery mode: the DSP-gain attribute applied on the
    /// next stream create or resume will be
    /// [`SILENT_RECOVERY_GAIN_LINEAR`] instead of the stored replay gain.
    pub fn enter_silent_recovery(&self) {
        self.state.lock().silent_recovery = true;
    }

    /// Exits silent-recovery mode and resets the stored replay gain to
    /// unity, returning the value now in effect.
    pub fn restore_gain(&self) -> f32 {
        let mut state = self.state.lock();
        state.silent_recovery = false;
        state.replay_gain = 1.0;
        state.replay_gain
    }

    pub fn is_silent_recovery(&self) -> bool {
        self.state.lock().silent_recovery
    }

    /// The DSP-gain value that should currently be applied to the output
    /// stream.
    pub fn effective_dsp_gain(&self) -> f32 {
        let state = self.state.lock();
        if state.silent_recovery {
            SILENT_RECOVERY_GAIN_LINEAR
        } else {
            state.replay_gain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_clamps_above_and_below_range() {
        let vrg = VolumeAndReplayGain::new();
        vrg.set_volume(1.5);
        assert_eq!(vrg.volume(), 1.0);
        vrg.set_volume(-0.2);
        assert_eq!(vrg.volume(), 0.0);
    }

    #[test]
    fn replay_gain_clamps_to_plus_6db() {
        let vrg = VolumeAndReplayGain::new();
        vrg.set_replay_gain(3.0);
        assert_eq!(vrg.replay_gain(), MAX_REPLAY_GAIN_LINEAR);
    }

    #[test]
    fn silent_recovery_overrides_effective_gain_until_restored() {
        let vrg = VolumeAndReplayGain::new();
        vrg.set_replay_gain(1.8);
        vrg.enter_silent_recovery();
        assert_eq!(vrg.effective_dsp_gain(), SILENT_RECOVERY_GAIN_LINEAR);

        let restored = vrg.restore_gain();
        assert_eq!(restored, 1.0);
        assert!(!vrg.is_silent_recovery());
        assert_eq!(vrg.effective_dsp_gain(), 1.0);
    }
}
