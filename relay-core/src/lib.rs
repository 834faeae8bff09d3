//! Relay Core
//!
//! A typed, thread-aware signal/slot primitive. Components communicate
//! through [`Signal`] values without referencing each other; each connected
//! callback is delivered to on the execution context it was connected from,
//! inline when the emitter already runs there and through that context's task
//! queue otherwise.
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `context`: execution-context identity, per-context task queues, and the
//!   worker threads that drain them
//! - `signals`: the signal/slot core — connection registry, per-slot routing,
//!   and the public [`Signal`] API
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_core::{ExecutionContext, Signal};
//!
//! let progress: Signal<u32> = Signal::new();
//!
//! // Callbacks connected here run inline when we emit from this thread.
//! progress.connect(|pct| println!("{pct}%"));
//!
//! // Callbacks connected from a worker run on that worker, whichever
//! // thread emits.
//! let ui = ExecutionContext::spawn("ui")?;
//! let bar = progress.clone();
//! ui.handle().enqueue(move || {
//!     bar.connect(|pct| draw_progress_bar(pct));
//! })?;
//!
//! progress.emit(50);
//! ```

pub mod context;
pub mod signals;

pub use context::{poll_current, ContextError, ContextHandle, ContextId, ExecutionContext};
pub use signals::Signal;
