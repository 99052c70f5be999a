//! Stream Metadata Reader (SMR): format/quality discovery plus ICY title
//! parsing (spec §4.8).

use parking_lot::RwLock;

use crate::backend::{DiscoveredCodec, StreamInfo};

/// Read-through snapshot of the current stream's format and ICY tags.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentStreamInfo {
    pub codec: DiscoveredCodec,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub bitrate_bps: u32,
    pub artist: Option<String>,
    pub title: Option<String>,
}

impl From<StreamInfo> for CurrentStreamInfo {
    fn from(info: StreamInfo) -> Self {
        Self {
            codec: info.codec,
            sample_rate: info.sample_rate,
            channels: info.channels,
            bit_depth: info.bit_depth,
            bitrate_bps: info.bitrate_bps,
            artist: None,
            title: None,
        }
    }
}

/// Extracts `(artist, title)` from a raw ICY `StreamTitle='...';` frame.
///
/// Splits the quoted value on the first occurrence of `" - "`; everything
/// before is the artist, everything after (including further `" - "`
/// occurrences) is the title. Returns `None` if the frame is not a
/// well-formed `StreamTitle` assignment.
pub fn parse_icy_stream_title(raw: &str) -> Option<(Option<String>, Option<String>)> {
    let start = raw.find("StreamTitle='")? + "StreamTitle='".len();
    let rest = &raw[start..];
    let end = rest.find("';")?;
    let value = &rest[..end];

    if value.is_empty() {
        return Some((None, None));
    }
    match value.split_once(" - ") {
        Some((artist, title)) => Some((Some(artist.to_string()), Some(title.to_string()))),
        None => Some((None, Some(value.to_string()))),
    }
}

/// Owns the current stream's discovered format and ICY tags, updated by
/// the pipeline as decoders open and metadata frames arrive.
pub struct StreamMetadataReader {
    current: RwLock<Option<CurrentStreamInfo>>,
}

impl Default for StreamMetadataReader {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamMetadataReader {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Records a freshly discovered decoder's format, clearing any
    /// previous track's ICY tags.
    pub fn observe_stream_info(&self, info: StreamInfo) {
        *self.current.write() = Some(info.into());
    }

    /// Parses and applies a raw ICY metadata frame to the current track.
    /// No-ops if no stream has been observed yet.
    pub fn handle_icy_frame(&self, raw: &str) {
        let Some((artist, title)) = parse_icy_stream_title(raw) else {
            return;
        };
        if let Some(current) = self.current.write().as_mut() {
            current.artist = artist;
            current.title = title;
        }
    }

    /// Returns a snapshot of the current stream info, if any.
    pub fn current(&self) -> Option<CurrentStreamInfo> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_artist_and_title() {
        let (artist, title) =
            parse_icy_stream_title("StreamTitle='Boards of Canada - Roygbiv';").unwrap();
        assert_eq!(artist.as_deref(), Some("Boards of Canada"));
        assert_eq!(title.as_deref(), Some("Roygbiv"));
    }

    #[test]
    fn first_separator_wins_rest_is_title() {
        let (artist, title) =
            parse_icy_stream_title("StreamTitle='A - B - C';").unwrap();
        assert_eq!(artist.as_deref(), Some("A"));
        assert_eq!(title.as_deref(), Some("B - C"));
    }

    #[test]
    fn no_separator_is_title_only() {
        let (artist, title) = parse_icy_stream_title("StreamTitle='Just A Title';").unwrap();
        assert_eq!(artist, None);
        assert_eq!(title.as_deref(), Some("Just A Title"));
    }

    #[test]
    fn malformed_frame_returns_none() {
        assert_eq!(parse_icy_stream_title("garbage"), None);
    }

    #[test]
    fn observe_then_handle_updates_snapshot() {
        let smr = StreamMetadataReader::new();
        smr.observe_stream_info(StreamInfo {
            codec: DiscoveredCodec::Flac,
            sample_rate: 44_100,
            channels: 2,
            bit_depth: 16,
            bitrate_bps: 900_000,
        });
        smr.handle_icy_frame("StreamTitle='Artist - Title';");

        let current = smr.current().unwrap();
        assert_eq!(current.artist.as_deref(), Some("Artist"));
        assert_eq!(current.title.as_deref(), Some("Title"));
    }

    #[test]
    fn handle_icy_frame_before_any_stream_is_a_no_op() {
        let smr = StreamMetadataReader::new();
        smr.handle_icy_frame("StreamTitle='Artist - Title';");
        assert!(smr.current().is_none());
    }
}
