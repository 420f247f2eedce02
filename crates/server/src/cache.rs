//! Name lists that are fetched once and kept until explicitly cleared.

use std::future::Future;

use tokio::sync::RwLock;
use tracing::error;

use crate::Result;

/// Holds a lazily loaded list of resource names.
///
/// A failed load is logged and reported as an empty list, and nothing is
/// stored, so the next call tries again.
#[derive(Debug, Default)]
pub struct NameCache {
    label: &'static str,
    names: RwLock<Option<Vec<String>>>,
}

impl NameCache {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            names: RwLock::new(None),
        }
    }

    pub async fn get_or_load<F, Fut>(&self, loader: F) -> Vec<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>>>,
    {
        if let Some(names) = self.names.read().await.as_ref() {
            return names.clone();
        }

        let mut slot = self.names.write().await;
        // Another caller may have filled it while we waited for the lock
        if let Some(names) = slot.as_ref() {
            return names.clone();
        }

        match loader().await {
            Ok(names) => {
                *slot = Some(names.clone());
                names
            }
            Err(e) => {
                error!("Failed to get {} list: {}", self.label, e);
                Vec::new()
            }
        }
    }

    pub async fn contains<F, Fut>(&self, name: &str, loader: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>>>,
    {
        self.get_or_load(loader).await.iter().any(|n| n == name)
    }

    pub async fn clear(&self) {
        *self.names.write().await = None;
    }

    pub async fn is_loaded(&self) -> bool {
        self.names.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn loads_once_until_cleared() {
        let cache = NameCache::new("pods");
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(vec!["a".to_string(), "b".to_string()])
        };

        assert_eq!(cache.get_or_load(load).await, vec!["a", "b"]);
        assert_eq!(cache.get_or_load(load).await, vec!["a", "b"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.clear().await;
        assert!(!cache.is_loaded().await);
        assert!(cache.contains("b", load).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_load_is_not_stored() {
        tokio_test::block_on(async {
            let cache = NameCache::new("services");
            let names = cache
                .get_or_load(|| async { Err::<Vec<String>, _>(Error::Internal("boom".to_string())) })
                .await;
            assert!(names.is_empty());
            assert!(!cache.is_loaded().await);

            let names = cache
                .get_or_load(|| async { Ok::<_, Error>(vec!["frontend".to_string()]) })
                .await;
            assert_eq!(names, vec!["frontend"]);
        });
    }
}
