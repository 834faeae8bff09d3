//! Signal Implementation
//!
//! A Signal is a typed notification source. Components connect callbacks to
//! it without knowing who emits; emitters fire values into it without knowing
//! who listens. Per slot, at emit time, the signal decides whether the
//! callback runs inline (same execution context) or is queued onto the
//! context that connected it.
//!
//! # How Emission Works
//!
//! 1. `emit` clones the slot list under the registry's read lock and releases
//!    the lock before any callback runs.
//!
//! 2. Each slot is routed fresh: dead tracked receiver → skipped; owning
//!    context is the emitting thread → invoked inline with a clone of the
//!    value; anything else → a closure capturing a clone of the value is
//!    enqueued onto the owning context.
//!
//! 3. Direct invocations complete before `emit` returns, in connection
//!    order. Queued invocations are only submitted in connection order; when
//!    they run is up to the target context.
//!
//! # Thread Safety
//!
//! `connect*`, `disconnect`, and `emit` may be called concurrently from any
//! thread. Cloning a `Signal` yields a handle to the same registry.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::ContextHandle;

use super::registry::SlotRegistry;
use super::slot::{Callback, Dispatch, ReceiverWitness, Slot};

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A typed signal carrying values of type `T`.
///
/// Use a tuple for multi-argument notifications. `T` must be `Clone` because
/// every slot receives its own copy of the value, and `Send` because queued
/// deliveries cross threads.
///
/// # Example
///
/// ```rust,ignore
/// let finished: Signal<(String, u64)> = Signal::new();
///
/// finished.connect(|(path, bytes)| {
///     println!("wrote {bytes} bytes to {path}");
/// });
///
/// finished.emit(("a.log".into(), 512));
/// ```
pub struct Signal<T>
where
    T: Clone + Send + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    /// Shared core; clones of this `Signal` share it.
    core: Arc<SignalCore<T>>,
}

/// Registry plus emit logic, shared by all handles to one signal and held
/// weakly by forwarding connections.
pub(crate) struct SignalCore<T>
where
    T: Clone + Send + 'static,
{
    id: u64,
    registry: SlotRegistry<T>,
}

impl<T> SignalCore<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn emit(&self, value: T) {
        let slots = self.registry.snapshot();
        for slot in &slots {
            match slot.route() {
                Dispatch::Skip => {
                    trace!("signal {}: skipping dead receiver", self.id);
                }
                Dispatch::Direct => slot.invoke(value.clone()),
                Dispatch::Queued => slot.enqueue_invoke(value.clone()),
            }
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + 'static,
{
    /// Create a signal with no connections.
    pub fn new() -> Self {
        let id = next_signal_id();
        Self {
            id,
            core: Arc::new(SignalCore {
                id,
                registry: SlotRegistry::new(),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Register a callback with no receiver tracking.
    ///
    /// The connecting thread's context becomes the slot's owning context:
    /// emissions from that context invoke `f` inline, emissions from any
    /// other context queue the invocation onto it. Connecting the same
    /// callable twice yields two slots and two invocations per emit.
    pub fn connect<F>(&self, f: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.append(Slot::new(Arc::new(f), ContextHandle::current()));
    }

    /// Register a callback bound to an `Arc`-managed receiver.
    ///
    /// The slot holds only a weak reference: once the last `Arc<R>` outside
    /// this connection is dropped, deliveries are silently skipped. The check
    /// runs immediately before each invocation, on the owning context, so a
    /// receiver destroyed while a delivery sat in a queue is never called.
    pub fn connect_to<R, F>(&self, receiver: &Arc<R>, f: F)
    where
        R: Send + Sync + 'static,
        F: Fn(&R, T) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(receiver);
        let callback: Callback<T> = Arc::new(move |value: T| {
            if let Some(receiver) = weak.upgrade() {
                f(&receiver, value);
            }
        });
        let witness: ReceiverWitness = {
            let erased: Arc<dyn Any + Send + Sync> = Arc::clone(receiver) as Arc<dyn Any + Send + Sync>;
            Arc::downgrade(&erased)
        };
        self.append(Slot::tracked(callback, ContextHandle::current(), witness));
    }

    /// Forward every emission of this signal into `other`.
    ///
    /// The connection holds `other`'s core weakly: dropping every handle to
    /// `other` turns forwarded deliveries into silent skips rather than
    /// dangling calls. The forwarding slot's owning context is the connecting
    /// thread's, like any other slot; `other`'s own slots then route the
    /// re-emission as usual.
    pub fn connect_signal(&self, other: &Signal<T>) {
        let target = Arc::downgrade(&other.core);
        let callback: Callback<T> = Arc::new(move |value: T| {
            if let Some(core) = target.upgrade() {
                core.emit(value);
            }
        });
        let witness: ReceiverWitness = {
            let erased: Arc<dyn Any + Send + Sync> = Arc::clone(&other.core) as Arc<dyn Any + Send + Sync>;
            Arc::downgrade(&erased)
        };
        self.append(Slot::tracked(callback, ContextHandle::current(), witness));
    }

    /// Remove every connection. All-or-nothing.
    ///
    /// Deliveries already queued onto other contexts by earlier emits cannot
    /// be withdrawn; everything after this call delivers to nobody.
    pub fn disconnect(&self) {
        self.core.registry.clear();
        debug!("signal {}: disconnected all slots", self.id);
    }

    /// Emit a value to every connected slot.
    ///
    /// Slots on the emitting context run inline, in connection order, before
    /// this returns; a panic from one of them propagates to the caller.
    /// Slots on other contexts receive a queued clone of the value and run
    /// whenever their context gets to it. With no connections this is a
    /// no-op.
    pub fn emit(&self, value: T) {
        self.core.emit(value);
    }

    /// Number of registered slots, dead-receiver slots included.
    pub fn slot_count(&self) -> usize {
        self.core.registry.len()
    }

    fn append(&self, slot: Slot<T>) {
        self.core.registry.append(slot);
        debug!("signal {}: connected slot #{}", self.id, self.slot_count());
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("slot_count", &self.slot_count())
            .finish()
    }
}
