//! Load-once cache shared by concurrent callers.
//!
//! A [`SharedCache`] owns the result of a single asynchronous load. The
//! first caller starts the load; callers arriving while it is in flight
//! await the same shared future instead of issuing a duplicate request;
//! later callers get the stored value (or the stored failure) directly.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt as _;
use futures::future::{BoxFuture, Shared};

use crate::SourceError;

/// Error type handed to every caller of a failed load.
pub type SharedError = Arc<SourceError>;

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T, SharedError>>>;

/// Lifecycle of a [`SharedCache`].
enum CacheState<T: Clone> {
    Empty,
    Pending(SharedLoad<T>),
    Ready(T),
    Failed(SharedError),
}

/// A value loaded at most once, shared by all callers.
pub struct SharedCache<T: Clone> {
    state: Mutex<CacheState<T>>,
}

impl<T: Clone> Default for SharedCache<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(CacheState::Empty),
        }
    }
}

impl<T> SharedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value, starting `load` if nothing has been
    /// loaded yet.
    ///
    /// `load` is only invoked when the cache is empty; otherwise it is
    /// dropped unused.
    ///
    /// # Errors
    ///
    /// Returns the (shared) error of the load, including a load that
    /// failed before this call.
    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<T, SharedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SourceError>> + Send + 'static,
    {
        let pending = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let shared = match &*state {
                CacheState::Ready(value) => return Ok(value.clone()),
                CacheState::Failed(error) => return Err(Arc::clone(error)),
                CacheState::Pending(shared) => shared.clone(),
                CacheState::Empty => load().map(|r| r.map_err(Arc::new)).boxed().shared(),
            };
            if matches!(*state, CacheState::Empty) {
                *state = CacheState::Pending(shared.clone());
            }
            shared
        };

        let result = pending.await;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, CacheState::Pending(_)) {
            *state = match &result {
                Ok(value) => CacheState::Ready(value.clone()),
                Err(error) => CacheState::Failed(Arc::clone(error)),
            };
        }
        drop(state);

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let cache: SharedCache<u32> = SharedCache::new();
        let loads = Arc::new(AtomicUsize::new(0));

        let make_load = || {
            let loads = Arc::clone(&loads);
            move || async move {
                loads.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(7)
            }
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_load(make_load()),
            cache.get_or_load(make_load()),
            cache.get_or_load(make_load()),
        );

        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (7, 7, 7));
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let later = cache.get_or_load(make_load()).await.unwrap();
        assert_eq!(later, 7);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_remembered() {
        let cache: SharedCache<u32> = SharedCache::new();

        let err = cache
            .get_or_load(|| async {
                Err(SourceError::Normalization {
                    message: "missing file".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing file"));

        let again = cache.get_or_load(|| async { Ok(1) }).await.unwrap_err();
        assert!(Arc::ptr_eq(&err, &again));
    }
}
