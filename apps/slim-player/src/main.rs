//! slim-player — headless SlimProto client binary built on `slim-core`.
//!
//! Wires the library to a real TCP connection, parses CLI flags, loads a
//! config file, and runs the coordinator to completion. The wire codec and
//! native audio backend are out of scope for `slim-core` itself; this
//! binary is where those integration points live (`config.rs`,
//! `slimproto.rs`).

mod config;
mod slimproto;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use slim_core::backend::mock::NullAudioBackend;
use slim_core::events::PipelineEvent;
use slim_core::runtime::TokioSpawner;
use slim_core::{PipelineEventEmitter, PlaybackCoordinator};
use tokio::signal;
use tokio::sync::mpsc;

use crate::config::PlayerConfig;
use crate::slimproto::SlimProtoConnection;

/// slim-player — headless Lyrion/Squeezebox client.
#[derive(Parser, Debug)]
#[command(name = "slim-player")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "SLIM_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Server hostname or IP (overrides config file).
    #[arg(short = 's', long, env = "SLIM_SERVER_HOST")]
    server_host: Option<String>,

    /// Server SlimProto port (overrides config file).
    #[arg(short = 'p', long, env = "SLIM_SERVER_PORT")]
    server_port: Option<u16>,
}

/// Forwards pipeline events onto an unbounded channel so they can be
/// written to the wire from a plain async task, keeping `emit()` itself
/// synchronous and non-blocking (spec §5's marshalled hand-off, applied at
/// the protocol boundary rather than inside the pipeline).
struct SlimProtoEventEmitter {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl PipelineEventEmitter for SlimProtoEventEmitter {
    fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("slim-player v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.server_host {
        config.server_host = host;
    }
    if let Some(port) = args.server_port {
        config.server_port = port;
    }

    log::info!(
        "Configuration: server={}:{}, player_name={}",
        config.server_host,
        config.server_port,
        config.player_name
    );

    let pipeline_config = config.to_core_config()?;

    // `NullAudioBackend` is the only `AudioBackend` shipped with this crate;
    // a real BASS/cpal-backed implementation plugs in here (spec §1, §4.1).
    let backend = Arc::new(NullAudioBackend::new());

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let emitter = Arc::new(SlimProtoEventEmitter { tx: events_tx });
    let spawner = Arc::new(TokioSpawner::current());

    let (_coordinator, mut downstream_rx) =
        PlaybackCoordinator::new(backend, emitter, spawner, pipeline_config);

    let mut connection = SlimProtoConnection::connect(&config.server_host, config.server_port)
        .await
        .context("Failed to connect to server")?;

    log::info!(
        "Connected to {}:{}",
        config.server_host,
        config.server_port
    );

    let event_writer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let tag = event.status_code().as_tag();
            if let Err(err) = connection.send_status_tag(tag).await {
                log::warn!("failed to write status tag {tag}: {err}");
            }
        }
    });

    let downstream_logger = tokio::spawn(async move {
        while let Some(request) = downstream_rx.recv().await {
            log::info!("downstream request: {request:?}");
        }
    });

    shutdown_signal().await;
    log::info!("Shutdown signal received, cleaning up...");

    event_writer.abort();
    downstream_logger.abort();

    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
