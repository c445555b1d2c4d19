//! Single-flight coalescing for concurrent async refreshes.
//!
//! When many callers miss the cache at once (e.g. every request racing to
//! refresh an expired JWKS document), only one upstream fetch should run;
//! the rest await its result. Grounded in the `Shared<BoxFuture>` pattern
//! used for JWK refresh coalescing in the retrieval pack.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

type Inflight<T> = Shared<BoxFuture<'static, T>>;

/// Coalesces concurrent calls to an async operation into a single in-flight
/// future. `T` must be `Clone` since every waiter receives the same result.
pub struct SingleFlight<T> {
    inflight: Mutex<Option<Inflight<T>>>,
}

impl<T: Clone + Send + 'static> SingleFlight<T> {
    /// Create an empty single-flight guard with no in-progress call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(None),
        }
    }

    /// Run `make_future` unless a call is already in flight, in which case
    /// await the existing one. The closure is only invoked when this call
    /// wins the race to start a new fetch.
    pub async fn run<F>(&self, make_future: F) -> T
    where
        F: FnOnce() -> Pin<Box<dyn Future<Output = T> + Send>>,
    {
        let shared = {
            let mut guard = self.inflight.lock();
            match guard.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let fut: Inflight<T> = make_future().shared();
                    *guard = Some(fut.clone());
                    fut
                }
            }
        };

        let result = shared.await;
        // Clear the slot so the next caller that misses the cache starts a
        // fresh fetch rather than replaying this stale result forever.
        let mut guard = self.inflight.lock();
        if let Some(current) = guard.as_ref() {
            if current.ptr_eq(&shared) {
                *guard = None;
            }
        }
        result
    }
}

impl<T: Clone + Send + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
