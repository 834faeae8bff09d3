//! Signal/Slot Core
//!
//! This module implements the publish/subscribe primitive itself: the public
//! [`Signal`] type, the crate-internal slot it registers per connection, and
//! the lock-guarded registry that holds them.
//!
//! # Concepts
//!
//! ## Signal
//!
//! A typed notification source. Emitting a value delivers a copy of it to
//! every connected callback, routed per slot: inline when the slot's owning
//! context is the emitting thread, queued onto that context otherwise.
//!
//! ## Slot
//!
//! One registered callback plus its routing metadata — the execution context
//! captured at connect time and, for tracked connections, a weak reference to
//! the receiver. Slots are created by `connect*` and destroyed only by
//! `disconnect` or by dropping the signal's last handle.
//!
//! ## Registry
//!
//! An insertion-ordered slot list behind a reader/writer lock. Emits clone a
//! snapshot and drop the lock before invoking anything, so callbacks may
//! freely reenter the signal.

mod registry;
mod signal;
mod slot;

pub use signal::Signal;
