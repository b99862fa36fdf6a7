use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::steam::{AppDetail, FetchError};

type Slot = Arc<OnceCell<Arc<AppDetail>>>;

/// Bounded get-or-fetch cache for app details, keyed by appid.
///
/// Records are immutable for the process lifetime, so a hit never revalidates.
/// Cold keys are fetched exactly once even under concurrent callers: every
/// caller for one key shares a slot and the slot runs the fetch single-flight.
/// At capacity the oldest inserted key is evicted.
pub struct AppDetailsCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<u32, Slot>,
    order: VecDeque<u32>,
}

impl AppDetailsCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn get_or_fetch<F, Fut>(
        &self,
        appid: u32,
        fetch: F,
    ) -> Result<Arc<AppDetail>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AppDetail, FetchError>>,
    {
        let slot = {
            let mut inner = self.inner.lock().await;
            match inner.slots.get(&appid) {
                Some(slot) => slot.clone(),
                None => {
                    if inner.slots.len() >= self.capacity {
                        if let Some(oldest) = inner.order.pop_front() {
                            inner.slots.remove(&oldest);
                            tracing::debug!(appid = oldest, "evicted app detail");
                        }
                    }
                    let slot: Slot = Arc::new(OnceCell::new());
                    inner.slots.insert(appid, slot.clone());
                    inner.order.push_back(appid);
                    slot
                }
            }
        };

        let result = slot
            .get_or_try_init(|| async move { fetch().await.map(Arc::new) })
            .await
            .cloned();

        // Failed fetches are not cached: drop the empty slot so a later
        // call retries instead of reusing a dead entry.
        if result.is_err() {
            let mut inner = self.inner.lock().await;
            let still_empty = inner
                .slots
                .get(&appid)
                .map(|s| Arc::ptr_eq(s, &slot) && s.get().is_none())
                .unwrap_or(false);
            if still_empty {
                inner.slots.remove(&appid);
                inner.order.retain(|k| *k != appid);
            }
        }

        result
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.slots.len()
    }

    pub async fn contains(&self, appid: u32) -> bool {
        self.inner.lock().await.slots.contains_key(&appid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn detail(appid: u32) -> AppDetail {
        AppDetail {
            appid,
            name: format!("app-{appid}"),
        }
    }

    #[tokio::test]
    async fn second_lookup_hits_the_cache() {
        let cache = AppDetailsCache::new(8);
        let calls = &AtomicUsize::new(0);

        let first = cache
            .get_or_fetch(570, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(detail(570))
            })
            .await
            .unwrap();
        let second = cache
            .get_or_fetch(570, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(detail(570))
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn concurrent_cold_lookups_fetch_once() {
        let cache = Arc::new(AppDetailsCache::new(8));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(570, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(detail(570))
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().name, "app-570");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache = AppDetailsCache::new(8);
        let calls = &AtomicUsize::new(0);

        let err = cache
            .get_or_fetch(570, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::UpstreamUnavailable("status 503".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
        assert!(!cache.contains(570).await);

        cache
            .get_or_fetch(570, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(detail(570))
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn evicts_oldest_key_at_capacity() {
        let cache = AppDetailsCache::new(2);
        for appid in [1, 2, 3] {
            cache
                .get_or_fetch(appid, || async move { Ok(detail(appid)) })
                .await
                .unwrap();
        }

        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains(1).await);
        assert!(cache.contains(2).await);
        assert!(cache.contains(3).await);
    }
}
