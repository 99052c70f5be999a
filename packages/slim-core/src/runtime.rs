//! Task spawning abstraction for runtime independence.
//!
//! The producer loop and the synchronized-start monitor need to run as
//! background tasks. Rather than hard-coding `tokio::spawn` throughout the
//! pipeline, components depend on this trait, which keeps `pipeline::psd`
//! testable with a synchronous spawner and leaves the door open for a host
//! application (e.g. an embedding GUI with its own executor) to supply its
//! own implementation.

use std::future::Future;
use std::pin::Pin;

/// Abstraction for spawning background tasks.
///
/// Implementations should ensure the spawned task keeps running even if the
/// spawner handle itself is dropped. `spawn_dyn` is the object-safe core
/// (so the pipeline can hold an `Arc<dyn TaskSpawner>`); `spawn` is the
/// ergonomic generic entry point for callers that have a concrete type.
pub trait TaskSpawner: Send + Sync {
    /// Spawns an already-boxed future as a background task.
    fn spawn_dyn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>);

    /// Spawns a future as a background task.
    fn spawn<F>(&self, future: F)
    where
        Self: Sized,
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_dyn(Box::pin(future));
    }
}

/// Tokio-based spawner, the default for `apps/slim-player`.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` bound to the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn_dyn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
        self.handle.spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn tokio_spawner_executes_task() {
        let spawner = TokioSpawner::current();
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();

        spawner.spawn(async move {
            executed_clone.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(executed.load(Ordering::SeqCst));
    }
}
