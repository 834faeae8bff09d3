//! Execution Context Identity and Handles
//!
//! A `ContextHandle` names one unit of sequential execution: a thread that
//! drains its own ordered queue of tasks. Handles are the routing key for
//! signal dispatch — at connect time a slot captures the connecting thread's
//! handle, and at emit time the handle decides whether a callback runs inline
//! or gets queued.
//!
//! # How Handles Work
//!
//! 1. Every context owns an unbounded task channel. The handle wraps the
//!    sending side plus a unique ID; cloning a handle is cheap.
//!
//! 2. `ContextHandle::current()` returns the handle for the calling thread.
//!    Worker threads spawned through [`ExecutionContext`](super::ExecutionContext)
//!    are registered automatically. Any other thread is adopted lazily: the
//!    first call creates a queue for it, and [`poll_current`] drains it.
//!
//! 3. `enqueue` submits a task for later sequential execution on the target
//!    context. It never runs the task inline, even when the target is the
//!    calling thread.
//!
//! # Thread Safety
//!
//! Handles may be cloned, compared, and enqueued to from any thread. Identity
//! is stable for the lifetime of the context.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::trace;

/// Counter for generating unique context IDs.
static CONTEXT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique context ID.
pub(crate) fn next_context_id() -> ContextId {
    ContextId(CONTEXT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Unique identifier for an execution context.
///
/// Stable for the lifetime of the context and never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

/// A unit of work scheduled onto an execution context.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Messages carried by a context's queue.
pub(crate) enum Job {
    /// Run a task.
    Run(Task),
    /// Stop draining the queue (worker shutdown).
    Stop,
}

/// Errors from the execution-context surface.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The target context's queue is gone; the task was dropped.
    #[error("execution context {0:?} is no longer accepting tasks")]
    Closed(ContextId),

    /// The OS refused to spawn the worker thread.
    #[error("failed to spawn context thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to an execution context.
///
/// Comparable (`==` is identity), cheaply clonable, usable from any thread.
///
/// # Example
///
/// ```rust,ignore
/// let worker = ExecutionContext::spawn("audio")?;
/// let handle = worker.handle();
///
/// assert!(!handle.is_current());
/// handle.enqueue(|| println!("runs on the audio thread"))?;
/// ```
#[derive(Clone)]
pub struct ContextHandle {
    id: ContextId,
    tx: flume::Sender<Job>,
}

impl ContextHandle {
    pub(crate) fn new(id: ContextId, tx: flume::Sender<Job>) -> Self {
        Self { id, tx }
    }

    /// Get the handle for the calling thread's context.
    ///
    /// Threads not already registered as a context (i.e. not spawned through
    /// [`ExecutionContext`](super::ExecutionContext)) are adopted on first
    /// call: they get their own queue, which they must drain explicitly via
    /// [`poll_current`].
    pub fn current() -> ContextHandle {
        CURRENT.with(|current| {
            let mut current = current.borrow_mut();
            match &*current {
                Some(local) => local.handle.clone(),
                None => {
                    let (tx, rx) = flume::unbounded();
                    let handle = ContextHandle::new(next_context_id(), tx);
                    trace!("adopted thread as context {:?}", handle.id);
                    *current = Some(LocalContext {
                        handle: handle.clone(),
                        inbox: Some(rx),
                    });
                    handle
                }
            }
        })
    }

    /// Get the calling thread's handle without adopting the thread.
    pub fn try_current() -> Option<ContextHandle> {
        CURRENT.with(|current| current.borrow().as_ref().map(|local| local.handle.clone()))
    }

    /// The context's unique ID.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Check whether the calling thread is this context.
    pub fn is_current(&self) -> bool {
        CURRENT.with(|current| {
            current
                .borrow()
                .as_ref()
                .map_or(false, |local| local.handle.id == self.id)
        })
    }

    /// Schedule a task for later sequential execution on this context.
    ///
    /// The task is never run inline, even when the target context is the
    /// calling thread. Submission order is execution order per context.
    pub fn enqueue<F>(&self, task: F) -> Result<(), ContextError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx
            .send(Job::Run(Box::new(task)))
            .map_err(|_| ContextError::Closed(self.id))
    }

    /// Ask the context to stop draining its queue. Worker shutdown only.
    pub(crate) fn send_stop(&self) -> Result<(), ContextError> {
        self.tx
            .send(Job::Stop)
            .map_err(|_| ContextError::Closed(self.id))
    }
}

impl PartialEq for ContextHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContextHandle {}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle").field("id", &self.id).finish()
    }
}

/// Per-thread registration of the current context.
struct LocalContext {
    handle: ContextHandle,
    /// Receiving side of the queue for adopted threads. `None` on worker
    /// threads, whose run loop owns the receiver directly.
    inbox: Option<flume::Receiver<Job>>,
}

thread_local! {
    static CURRENT: RefCell<Option<LocalContext>> = RefCell::new(None);
}

/// Register the calling thread as the given context. Worker startup only.
pub(crate) fn install(handle: ContextHandle) {
    CURRENT.with(|current| {
        *current.borrow_mut() = Some(LocalContext { handle, inbox: None });
    });
}

/// Run the tasks currently queued for the calling (adopted) thread.
///
/// Runs everything that was pending when the call started and returns the
/// number of tasks executed. Tasks enqueued while polling are left for the
/// next call. Returns 0 on threads that were never adopted and on worker
/// threads (their run loop drains continuously).
pub fn poll_current() -> usize {
    let inbox = CURRENT.with(|current| {
        current
            .borrow()
            .as_ref()
            .and_then(|local| local.inbox.clone())
    });

    let Some(inbox) = inbox else {
        return 0;
    };

    let pending = inbox.len();
    let mut executed = 0;
    for _ in 0..pending {
        match inbox.try_recv() {
            Ok(Job::Run(task)) => {
                task();
                executed += 1;
            }
            Ok(Job::Stop) | Err(_) => break,
        }
    }
    executed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn current_is_stable_per_thread() {
        let first = ContextHandle::current();
        let second = ContextHandle::current();
        assert_eq!(first, second);
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn current_differs_across_threads() {
        let here = ContextHandle::current();
        let there = std::thread::spawn(ContextHandle::current).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn is_current_matches_calling_thread() {
        let here = ContextHandle::current();
        assert!(here.is_current());

        let seen_as_current = {
            let here = here.clone();
            std::thread::spawn(move || here.is_current()).join().unwrap()
        };
        assert!(!seen_as_current);
    }

    #[test]
    fn try_current_does_not_adopt() {
        std::thread::spawn(|| {
            assert!(ContextHandle::try_current().is_none());
            let handle = ContextHandle::current();
            assert_eq!(ContextHandle::try_current(), Some(handle));
        })
        .join()
        .unwrap();
    }

    #[test]
    fn enqueue_runs_on_poll_in_order() {
        std::thread::spawn(|| {
            let handle = ContextHandle::current();
            let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

            for i in 0..3 {
                let order = order.clone();
                handle.enqueue(move || order.lock().push(i)).unwrap();
            }

            // Nothing runs until the thread drains its own queue.
            assert!(order.lock().is_empty());
            assert_eq!(poll_current(), 3);
            assert_eq!(*order.lock(), vec![0, 1, 2]);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn poll_leaves_tasks_enqueued_while_polling() {
        std::thread::spawn(|| {
            let handle = ContextHandle::current();
            let count = Arc::new(AtomicUsize::new(0));

            let inner_handle = handle.clone();
            let inner_count = count.clone();
            handle
                .enqueue(move || {
                    inner_count.fetch_add(1, Ordering::SeqCst);
                    let late_count = inner_count.clone();
                    inner_handle
                        .enqueue(move || {
                            late_count.fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                })
                .unwrap();

            assert_eq!(poll_current(), 1);
            assert_eq!(count.load(Ordering::SeqCst), 1);

            assert_eq!(poll_current(), 1);
            assert_eq!(count.load(Ordering::SeqCst), 2);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn poll_on_unadopted_thread_is_noop() {
        std::thread::spawn(|| {
            assert_eq!(poll_current(), 0);
        })
        .join()
        .unwrap();
    }
}
