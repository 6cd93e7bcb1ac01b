//! Keyed registry of limiters.
//!
//! A limiter is meant to be created once per logical event source. When the
//! sources are dynamic (one search box per tab, one throttle per user), the
//! registry creates a limiter per key on first use and keeps it until the key
//! is disposed or evicted as idle.

use crate::application::limiter::{CallOutcome, Limiter, LimiterError};
use crate::application::ports::{Clock, Storage};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Function creating the limiter for a key.
pub type LimiterFactory<K, A> = Arc<dyn Fn(&K) -> Limiter<A> + Send + Sync>;

/// Registry holding one limiter per key.
///
/// Generic over the storage implementation. In production, use
/// `Arc<ShardedStorage<K, Limiter<A>>>`.
pub struct LimiterRegistry<K, A, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    A: Send + 'static,
    S: Storage<K, Limiter<A>>,
{
    storage: S,
    clock: Arc<dyn Clock>,
    factory: LimiterFactory<K, A>,
    _key: PhantomData<fn(K)>,
}

impl<K, A, S> LimiterRegistry<K, A, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    A: Send + 'static,
    S: Storage<K, Limiter<A>>,
{
    /// Create a registry from storage, a clock for idle tracking and a factory.
    pub fn new(storage: S, clock: Arc<dyn Clock>, factory: LimiterFactory<K, A>) -> Self {
        Self {
            storage,
            clock,
            factory,
            _key: PhantomData,
        }
    }

    /// Call the limiter for `key`, creating it if needed.
    ///
    /// A limiter disposed between lookup and call (by `dispose`, `evict_idle`
    /// or a handle from `get`) is dropped from the registry and the call goes
    /// to a fresh one.
    ///
    /// # Errors
    /// Never fails at present; the `Result` mirrors `Limiter::call`.
    pub fn call(&self, key: K, mut args: A) -> Result<CallOutcome, LimiterError> {
        let factory = &self.factory;
        loop {
            let limiter = self
                .storage
                .get_or_insert_with(key.clone(), |key| factory(key));
            match limiter.submit(args) {
                Ok(outcome) => return Ok(outcome),
                Err(returned) => {
                    args = returned;
                    self.storage
                        .remove_if(&key, |current| Limiter::ptr_eq(current, &limiter));
                    tracing::trace!("replacing disposed keyed limiter");
                }
            }
        }
    }

    /// Get the limiter for `key`, if one exists.
    pub fn get(&self, key: &K) -> Option<Limiter<A>> {
        self.storage.get(key)
    }

    /// Remove and dispose the limiter for `key`.
    ///
    /// Returns `true` if a limiter existed.
    pub fn dispose(&self, key: &K) -> bool {
        match self.storage.remove(key) {
            Some(limiter) => {
                limiter.dispose();
                true
            }
            None => false,
        }
    }

    /// Remove and dispose every limiter. Returns how many were removed.
    pub fn dispose_all(&self) -> usize {
        let mut removed = 0;
        self.storage.retain(|_, limiter| {
            limiter.dispose();
            removed += 1;
            false
        });
        if removed > 0 {
            tracing::debug!(removed, "disposed all keyed limiters");
        }
        removed
    }

    /// Run every pending deferred fire now. Returns how many ran.
    pub fn flush_all(&self) -> usize {
        // Flush outside the storage locks: the callable may call back into the registry.
        self.storage
            .values()
            .into_iter()
            .filter(|limiter| limiter.flush())
            .count()
    }

    /// Dispose and remove limiters that are idle for `max_idle`.
    ///
    /// See `Limiter::is_idle`: a throttle limiter is kept until its window
    /// closes, so a recreated limiter cannot fire twice in one window.
    /// Returns how many were evicted.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;

        self.storage.retain(|_, limiter| {
            if limiter.dispose_if_idle(now, max_idle) {
                evicted += 1;
                false
            } else {
                // Disposed through another handle; drop the dead entry too
                !limiter.is_disposed()
            }
        });

        if evicted > 0 {
            tracing::debug!(evicted, ?max_idle, "evicted idle limiters");
        }
        evicted
    }

    /// Get the number of tracked keys.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

impl<K, A, S> Clone for LimiterRegistry<K, A, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    A: Send + 'static,
    S: Storage<K, Limiter<A>> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            clock: Arc::clone(&self.clock),
            factory: Arc::clone(&self.factory),
            _key: PhantomData,
        }
    }
}

impl<K, A, S> fmt::Debug for LimiterRegistry<K, A, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    A: Send + 'static,
    S: Storage<K, Limiter<A>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimiterRegistry")
            .field("len", &self.storage.len())
            .finish_non_exhaustive()
    }
}
