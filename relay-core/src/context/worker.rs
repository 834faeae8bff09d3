//! Worker Execution Contexts
//!
//! An `ExecutionContext` is a dedicated OS thread that drains its task queue
//! in FIFO order. It is the natural home for slots that must not run on the
//! emitting thread: connect from the worker (or enqueue the connect call onto
//! it) and every cross-thread emission is delivered to this thread's queue.
//!
//! # Lifecycle
//!
//! 1. `spawn` creates the queue, starts the thread, and registers it as the
//!    current context inside the new thread.
//!
//! 2. The run loop executes tasks one at a time, in submission order.
//!
//! 3. `shutdown` (or dropping the `ExecutionContext`) appends a stop marker
//!    and joins. Tasks queued before shutdown still run; tasks enqueued after
//!    are rejected with [`ContextError::Closed`].
//!
//! # Fault Policy
//!
//! A task that panics is caught and logged; the worker keeps draining. The
//! emitting side is never informed — queued delivery is fire-and-forget.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;

use tracing::{debug, error};

use super::handle::{install, next_context_id, ContextError, ContextHandle, Job};

/// A dedicated worker thread draining its own task queue.
///
/// # Example
///
/// ```rust,ignore
/// let worker = ExecutionContext::spawn("downloader")?;
/// worker.handle().enqueue(|| fetch_all())?;
/// worker.shutdown(); // drains pending tasks, then joins
/// ```
pub struct ExecutionContext {
    handle: ContextHandle,
    thread: Option<thread::JoinHandle<()>>,
}

impl ExecutionContext {
    /// Spawn a named worker thread with its own task queue.
    pub fn spawn(name: impl Into<String>) -> Result<Self, ContextError> {
        let name = name.into();
        let (tx, rx) = flume::unbounded();
        let handle = ContextHandle::new(next_context_id(), tx);

        let thread_handle = handle.clone();
        let thread = thread::Builder::new().name(name.clone()).spawn(move || {
            install(thread_handle.clone());
            debug!("context {:?} ({name}) started", thread_handle.id());

            while let Ok(job) = rx.recv() {
                match job {
                    Job::Run(task) => {
                        if catch_unwind(AssertUnwindSafe(task)).is_err() {
                            error!("task panicked on context {:?} ({name})", thread_handle.id());
                        }
                    }
                    Job::Stop => break,
                }
            }

            debug!("context {:?} ({name}) stopped", thread_handle.id());
        })?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Handle for enqueuing onto this context.
    pub fn handle(&self) -> ContextHandle {
        self.handle.clone()
    }

    /// Stop the worker after draining already-queued tasks, then join.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(thread) = self.thread.take() {
            // The stop marker sits behind every task queued so far.
            let _ = self.handle.send_stop();
            let _ = thread.join();
        }
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn tasks_run_on_the_worker_thread() {
        let worker = ExecutionContext::spawn("worker-test").unwrap();
        let handle = worker.handle();
        let (tx, rx) = flume::unbounded();

        let probe_handle = handle.clone();
        handle
            .enqueue(move || {
                tx.send(probe_handle.is_current()).unwrap();
            })
            .unwrap();

        let ran_on_worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(ran_on_worker);
        assert!(!handle.is_current());
    }

    #[test]
    fn tasks_run_in_submission_order() {
        let worker = ExecutionContext::spawn("order-test").unwrap();
        let handle = worker.handle();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (done_tx, done_rx) = flume::bounded(1);

        for i in 0..10 {
            let order = order.clone();
            handle.enqueue(move || order.lock().push(i)).unwrap();
        }
        handle.enqueue(move || done_tx.send(()).unwrap()).unwrap();

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(*order.lock(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn shutdown_drains_pending_tasks() {
        let worker = ExecutionContext::spawn("drain-test").unwrap();
        let handle = worker.handle();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let count = count.clone();
            handle
                .enqueue(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        worker.shutdown();
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn enqueue_after_shutdown_is_rejected() {
        let worker = ExecutionContext::spawn("closed-test").unwrap();
        let handle = worker.handle();
        worker.shutdown();

        // shutdown() joined the worker, so the receiving side is gone.
        let result = handle.enqueue(|| {});
        match result {
            Err(ContextError::Closed(id)) => assert_eq!(id, handle.id()),
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[test]
    fn panicking_task_does_not_kill_the_worker() {
        let worker = ExecutionContext::spawn("panic-test").unwrap();
        let handle = worker.handle();
        let (tx, rx) = flume::bounded(1);

        handle.enqueue(|| panic!("boom")).unwrap();
        handle.enqueue(move || tx.send(()).unwrap()).unwrap();

        // The second task still runs.
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
