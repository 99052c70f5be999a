//! Event emitter abstraction for decoupling PSD from the protocol transport.
//!
//! Services depend on [`PipelineEventEmitter`] rather than a concrete
//! channel or socket, enabling unit tests to assert on emitted events
//! without a live server connection.

use super::PipelineEvent;

/// Trait for emitting pipeline events without knowledge of transport.
pub trait PipelineEventEmitter: Send + Sync {
    /// Emits a pipeline event.
    fn emit(&self, event: PipelineEvent);
}

/// No-op emitter, useful when only the pipeline's internal state (not its
/// event stream) is under test.
pub struct NoopPipelineEventEmitter;

impl PipelineEventEmitter for NoopPipelineEventEmitter {
    fn emit(&self, _event: PipelineEvent) {
        // No-op.
    }
}

/// Logging emitter for debugging and development; logs every event at
/// debug level and otherwise discards it.
pub struct LoggingPipelineEventEmitter;

impl PipelineEventEmitter for LoggingPipelineEventEmitter {
    fn emit(&self, event: PipelineEvent) {
        tracing::debug!(?event, tag = event.status_code().as_tag(), "pipeline_event");
    }
}

/// Test-only emitter that records every event it receives, in order.
///
/// Exposed crate-wide (not just within this module's tests) so `pipeline`
/// tests can assert on the exact event sequence PSD produces.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::{Arc, Mutex};

    pub struct RecordingEmitter {
        pub events: Mutex<Vec<PipelineEvent>>,
    }

    impl RecordingEmitter {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl PipelineEventEmitter for RecordingEmitter {
        fn emit(&self, event: PipelineEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn recording_emitter_preserves_order() {
        let emitter = Arc::new(RecordingEmitter::new());

        emitter.emit(PipelineEvent::StreamConnected { track_id: 1 });
        emitter.emit(PipelineEvent::BufferReady { track_id: 1 });
        emitter.emit(PipelineEvent::TrackStarted {
            track_id: 1,
            deferred: false,
        });

        let events = emitter.events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].status_code().as_tag(), "STMc");
        assert_eq!(events[1].status_code().as_tag(), "STMl");
        assert_eq!(events[2].status_code().as_tag(), "STMs");
    }
}
