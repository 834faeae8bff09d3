//! Execution Contexts
//!
//! This module implements the host side of signal dispatch: identifying the
//! unit of sequential execution the calling code runs on, and scheduling
//! closures onto other such units.
//!
//! # Concepts
//!
//! ## Context
//!
//! A context is a thread paired with an ordered queue of tasks that the
//! thread drains sequentially. Two flavors exist:
//!
//! - **Worker contexts** ([`ExecutionContext::spawn`]) own a dedicated thread
//!   whose only job is draining the queue.
//! - **Adopted contexts**: any other thread becomes a context the first time
//!   it calls [`ContextHandle::current`]; it drains its queue explicitly via
//!   [`poll_current`].
//!
//! ## Handle
//!
//! A [`ContextHandle`] is a cheap, comparable reference to a context. Signals
//! store one per slot and use it at emit time to choose between inline
//! invocation and queued delivery.

mod handle;
mod worker;

pub use handle::{poll_current, ContextError, ContextHandle, ContextId};
pub use worker::ExecutionContext;
