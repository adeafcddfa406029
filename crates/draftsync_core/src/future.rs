//! Boxed futures for the object-safe collaborator traits.
//!
//! The editor, item store, transport and credential seams are used behind
//! `dyn Trait`, so every async method returns a boxed future. Futures are
//! `Send` so the orchestrator can be driven from a multi-threaded runtime.

use std::future::Future;
use std::pin::Pin;

/// A boxed future for object-safe async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[cfg(test)]
pub(crate) fn block_on_test<F: Future>(f: F) -> F::Output {
    futures_lite::future::block_on(f)
}
