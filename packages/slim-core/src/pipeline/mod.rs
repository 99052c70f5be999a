//! Push-Stream Decoder Pipeline (PSD) and its supporting pure models
//! (spec §4.2, §4.3).

pub mod position;
pub mod psd;
pub mod track_frame;

pub use position::{current_position_seconds, OutputStreamState};
pub use psd::{Pipeline, TrackState};
pub use track_frame::TrackFrame;
