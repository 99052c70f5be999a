//! Minimal SlimProto transport placeholder.
//!
//! The wire codec (opcode framing, `HELO`/`strm`/`STAT` payload layout) is
//! an external collaborator out of scope for this binary (`spec.md` §1).
//! This module only demonstrates the wiring: open a TCP connection to the
//! server and exchange the four-character status tags `slim_core` produces
//! as raw bytes, so `apps/slim-player` has something real to drive through
//! a `PlaybackCoordinator`.

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// A bare TCP connection to a Lyrion/Squeezebox server.
pub struct SlimProtoConnection {
    stream: TcpStream,
}

impl SlimProtoConnection {
    /// Opens a TCP connection to `host:port`.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("failed to connect to {host}:{port}"))?;
        Ok(Self { stream })
    }

    /// Writes a four-character status tag (e.g. `STMs`) as raw bytes.
    ///
    /// A real client frames this inside a `STAT` opcode payload; this
    /// placeholder writes the tag alone, which is enough to prove the
    /// coordinator's events reach the wire without implementing framing.
    pub async fn send_status_tag(&mut self, tag: &'static str) -> Result<()> {
        self.stream
            .write_all(tag.as_bytes())
            .await
            .context("failed to write status tag")?;
        Ok(())
    }
}
