//! Concurrency harness — spec.md §4.G/§5: the ingest task and the viewport
//! loop, bridged by the shared [`LineStore`] plus a shutdown signal and a
//! join handle. Mirrors the teacher's `connection_task`/`ConnectionHandle`
//! split in `event_loop.rs`: a spawned task owns the blocking/async source,
//! the caller holds a lightweight handle to signal and join it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::IngestError;
use crate::linestore::LineStore;

/// A one-shot cooperative cancellation signal. `set` is idempotent; `wait`
/// resolves immediately if `set` was already called, so a task that checks
/// late never blocks past the point shutdown was requested.
#[derive(Default)]
pub struct ShutdownEvent {
    notify: Notify,
    flag: AtomicBool,
}

impl ShutdownEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Safe to call more than once.
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Resolve once `set` has been (or already was) called — the ingest
    /// task's "check it between reads" per spec.md §4.G.
    pub async fn wait(&self) {
        if self.is_set() {
            return;
        }
        self.notify.notified().await;
    }
}

/// The two participants from spec.md §4.G, bundled for `app.rs`'s main
/// loop: the shared line store, the shutdown signal the viewport raises on
/// exit, and the ingest task's observable termination (`ingest_thread_handle`).
pub struct IngestHarness {
    pub store: Arc<LineStore>,
    pub shutdown: Arc<ShutdownEvent>,
    handle: JoinHandle<Result<(), IngestError>>,
}

impl IngestHarness {
    /// Spawn `ingest` as its own task, sharing `store` and a fresh
    /// [`ShutdownEvent`] with it.
    pub fn spawn<F, Fut>(store: Arc<LineStore>, ingest: F) -> Self
    where
        F: FnOnce(Arc<LineStore>, Arc<ShutdownEvent>) -> Fut,
        Fut: Future<Output = Result<(), IngestError>> + Send + 'static,
    {
        let shutdown = Arc::new(ShutdownEvent::new());
        let handle = tokio::spawn(ingest(store.clone(), shutdown.clone()));
        Self { store, shutdown, handle }
    }

    /// True once the ingest task has finished, successfully or not
    /// (spec.md §4.G: "viewport waits on {..., `ingest_thread_handle`}").
    pub fn ingest_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Poll the join handle without consuming `self`, for use inside a
    /// `tokio::select!` alongside input and data-available waits.
    pub fn join_handle(&mut self) -> &mut JoinHandle<Result<(), IngestError>> {
        &mut self.handle
    }

    /// Request shutdown and join the ingest task (spec.md §5: "the
    /// viewport then joins it before releasing the store").
    pub async fn shutdown_and_join(self) -> Result<(), IngestError> {
        self.shutdown.set();
        self.handle.await.unwrap_or(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Attr;
    use crate::buffer::SharedLine;
    use std::sync::Arc as StdArc;

    #[tokio::test]
    async fn shutdown_event_wait_resolves_immediately_if_already_set() {
        let ev = ShutdownEvent::new();
        ev.set();
        // Would hang forever if `wait` didn't short-circuit on an
        // already-set flag.
        tokio::time::timeout(std::time::Duration::from_millis(50), ev.wait())
            .await
            .expect("wait() did not resolve promptly for an already-set event");
    }

    #[tokio::test]
    async fn shutdown_event_wait_resolves_after_set() {
        let ev = StdArc::new(ShutdownEvent::new());
        let ev2 = ev.clone();
        let waiter = tokio::spawn(async move { ev2.wait().await });
        ev.set();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn harness_joins_after_shutdown_is_requested() {
        let store = Arc::new(LineStore::new());
        let harness = IngestHarness::spawn(store.clone(), |store, shutdown| async move {
            while !shutdown.is_set() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            let mem: StdArc<str> = StdArc::from("done");
            store.append(SharedLine::whole(mem), Attr::DEFAULT);
            Ok(())
        });
        assert!(!harness.ingest_finished());
        harness.shutdown_and_join().await.unwrap();
        assert_eq!(store.total_count(), 1);
    }
}
