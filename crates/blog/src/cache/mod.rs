//! Read-through cache for small, rarely-changing lists.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Default time a cached list stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

struct Entry<T> {
    loaded_at: Instant,
    items: Arc<Vec<T>>,
}

/// A single cached list with a TTL.
///
/// Clones share the same slot. Loading happens while the lock is held, so
/// concurrent misses trigger one load.
pub struct ListCache<T> {
    name: &'static str,
    ttl: Duration,
    slot: Arc<Mutex<Option<Entry<T>>>>,
}

impl<T> Clone for ListCache<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            ttl: self.ttl,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> std::fmt::Debug for ListCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<T> ListCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Return the cached list, calling `load` when empty or stale.
    pub async fn get_or_load<F, Fut, E>(&self, load: F) -> Result<Arc<Vec<T>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref()
            && entry.loaded_at.elapsed() < self.ttl
        {
            return Ok(Arc::clone(&entry.items));
        }

        debug!(cache = self.name, "cache miss, loading");
        let items = Arc::new(load().await?);
        *slot = Some(Entry {
            loaded_at: Instant::now(),
            items: Arc::clone(&items),
        });
        Ok(items)
    }

    /// Drop the cached list so the next read reloads it.
    pub async fn invalidate(&self) {
        if self.slot.lock().await.take().is_some() {
            debug!(cache = self.name, "cache invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn load_counting(counter: &AtomicUsize) -> Result<Vec<usize>, ()> {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(vec![n])
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cache = ListCache::new("test", DEFAULT_TTL);
        let loads = AtomicUsize::new(0);

        let first = cache.get_or_load(|| load_counting(&loads)).await.unwrap();
        let second = cache.get_or_load(|| load_counting(&loads)).await.unwrap();

        assert_eq!(*first, vec![1]);
        assert_eq!(*second, vec![1]);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let cache = ListCache::new("test", DEFAULT_TTL);
        let loads = AtomicUsize::new(0);

        cache.get_or_load(|| load_counting(&loads)).await.unwrap();
        cache.clone().invalidate().await;
        let reloaded = cache.get_or_load(|| load_counting(&loads)).await.unwrap();

        assert_eq!(*reloaded, vec![2]);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reloads() {
        let cache = ListCache::new("test", Duration::ZERO);
        let loads = AtomicUsize::new(0);

        cache.get_or_load(|| load_counting(&loads)).await.unwrap();
        cache.get_or_load(|| load_counting(&loads)).await.unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache: ListCache<u8> = ListCache::new("test", DEFAULT_TTL);
        let err: Result<_, &str> = cache.get_or_load(|| async { Err("boom") }).await;
        assert!(err.is_err());

        let ok: Result<_, &str> = cache.get_or_load(|| async { Ok(vec![7]) }).await;
        assert_eq!(*ok.unwrap(), vec![7]);
    }
}
