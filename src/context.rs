//! Typed run context.
//!
//! A `RunContext<C>` is a cheap-to-clone handle over a caller-supplied
//! dependency bag `C`. It is passed by reference to every tool, guardrail,
//! handoff callback, and dynamic-instruction invocation in a run, and is
//! never sent to the model.
//!
//! All agents, tools, and guardrails participating in one run share the same
//! `C`; the type parameter threads through `Agent<C>`, `Tool<C>`, and the
//! guardrail traits so mixing context types across a run is a compile error.
//!
//! Tools within a single turn may execute concurrently against the same
//! context. The crate does not lock `C`: callers that mutate from tools must
//! use interior mutability (`Mutex`, atomics) or accept last-write-wins.
//!
//! ```rust
//! use agentrun::RunContext;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Deps {
//!     lookups: AtomicUsize,
//! }
//!
//! let ctx = RunContext::new(Deps { lookups: AtomicUsize::new(0) });
//! ctx.get().lookups.fetch_add(1, Ordering::Relaxed);
//! assert_eq!(ctx.get().lookups.load(Ordering::Relaxed), 1);
//! ```

use std::sync::Arc;

/// Handle to the caller-supplied context value for a run.
pub struct RunContext<C> {
    inner: Arc<C>,
}

impl<C> RunContext<C> {
    /// Wrap a context value for the duration of a run.
    pub fn new(value: C) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Borrow the underlying context value.
    pub fn get(&self) -> &C {
        &self.inner
    }
}

impl<C> Clone for RunContext<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for RunContext<()> {
    fn default() -> Self {
        Self::new(())
    }
}

impl<C> std::fmt::Debug for RunContext<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("type", &std::any::type_name::<C>())
            .finish()
    }
}
