//! Slot Implementation
//!
//! A Slot is one registered callback plus the metadata needed to route it:
//! the context that owns it (captured at connect time, never re-resolved) and
//! an optional weak reference to a tracked receiver.
//!
//! # Routing
//!
//! Every emit evaluates each slot fresh — no state persists between emits:
//!
//! 1. Receiver present and dead? Skip.
//! 2. Owning context is the emitting thread? Invoke inline (Direct).
//! 3. Otherwise hand a closure to the owning context's queue (Queued).
//!
//! For queued delivery the payload is cloned into the closure, so its
//! lifetime is independent of the emitting call. Liveness is re-checked on
//! the owning context right before the callback would run; a receiver that
//! died while the task sat in the queue is skipped there too.

use std::any::Any;
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::context::ContextHandle;

/// Type-erased slot callback. One `Arc` per slot; queued deliveries clone it.
pub(crate) type Callback<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Liveness witness for a tracked receiver. The allocation it points into is
/// the receiver's own `Arc`, so it can never report alive after destruction.
pub(crate) type ReceiverWitness = Weak<dyn Any + Send + Sync>;

/// Routing decision for one slot at emit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Tracked receiver is gone; deliver nothing.
    Skip,
    /// Owning context is the emitting thread; invoke synchronously.
    Direct,
    /// Enqueue onto the owning context.
    Queued,
}

/// One registered callback plus its dispatch metadata.
pub(crate) struct Slot<T> {
    callback: Callback<T>,
    context: ContextHandle,
    receiver: Option<ReceiverWitness>,
}

impl<T> Slot<T>
where
    T: Clone + Send + 'static,
{
    /// Slot with no receiver tracking.
    pub(crate) fn new(callback: Callback<T>, context: ContextHandle) -> Self {
        Self {
            callback,
            context,
            receiver: None,
        }
    }

    /// Slot whose delivery is gated on the receiver staying alive.
    pub(crate) fn tracked(
        callback: Callback<T>,
        context: ContextHandle,
        receiver: ReceiverWitness,
    ) -> Self {
        Self {
            callback,
            context,
            receiver: Some(receiver),
        }
    }

    /// True when the slot has no tracked receiver or the receiver is alive.
    pub(crate) fn is_receiver_alive(&self) -> bool {
        match &self.receiver {
            None => true,
            Some(witness) => witness.strong_count() > 0,
        }
    }

    /// Decide how this emit reaches the slot. Evaluated fresh per emit.
    pub(crate) fn route(&self) -> Dispatch {
        if !self.is_receiver_alive() {
            Dispatch::Skip
        } else if self.context.is_current() {
            Dispatch::Direct
        } else {
            Dispatch::Queued
        }
    }

    /// Invoke the callback inline on the calling thread.
    pub(crate) fn invoke(&self, value: T) {
        (self.callback)(value);
    }

    /// Submit the invocation to the slot's owning context.
    ///
    /// The payload moves into the queued closure by value. A closed context
    /// drops the delivery; emission is fire-and-forget.
    pub(crate) fn enqueue_invoke(&self, value: T) {
        let callback = Arc::clone(&self.callback);
        let receiver = self.receiver.clone();
        let result = self.context.enqueue(move || {
            if let Some(witness) = &receiver {
                if witness.strong_count() == 0 {
                    return;
                }
            }
            callback(value);
        });
        if result.is_err() {
            debug!("dropped delivery: context {:?} closed", self.context.id());
        }
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            context: self.context.clone(),
            receiver: self.receiver.clone(),
        }
    }
}
