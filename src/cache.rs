use moka::future::Cache;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::error::SiteResult;

/// Maximum number of cached list responses.
const MAX_CAPACITY: u64 = 2_000;

/// The list resources the site caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Posts,
    Categories,
    ImageCategories,
    Media,
    Users,
    Contact,
}

impl Resource {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            Resource::Posts => "posts",
            Resource::Categories => "categories",
            Resource::ImageCategories => "image-categories",
            Resource::Media => "media",
            Resource::Users => "users",
            Resource::Contact => "contact",
        }
    }
}

/// ListCache
///
/// Short-lived cache of list responses from the content API, keyed by
/// resource, visibility scope and query. Values are kept as serialized JSON so
/// any list type can share one moka instance.
///
/// Invalidation is explicit: every resource has a generation counter that is
/// part of the key. Bumping it after a mutation makes every older entry for
/// that resource unreachable at once; those entries then age out via the TTL.
#[derive(Clone)]
pub struct ListCache {
    entries: Cache<String, Arc<String>>,
    generations: Arc<[AtomicU64; Resource::COUNT]>,
}

impl std::fmt::Debug for ListCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListCache")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

impl ListCache {
    pub fn new(ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self {
            entries,
            generations: Arc::new(std::array::from_fn(|_| AtomicU64::new(0))),
        }
    }

    fn generation(&self, resource: Resource) -> u64 {
        self.generations[resource.index()].load(Ordering::Acquire)
    }

    fn key(&self, resource: Resource, scope: &str, query: &str) -> String {
        format!(
            "{}:{}:{}:{}",
            resource.as_str(),
            self.generation(resource),
            scope,
            query
        )
    }

    /// get_or_load
    ///
    /// Returns the cached list for (`resource`, `scope`, `query`) or runs
    /// `load` and caches its result. `scope` separates what different viewers
    /// may see (e.g. "public" vs a profile id). Errors are never cached.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        resource: Resource,
        scope: &str,
        query: &str,
        load: F,
    ) -> SiteResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = SiteResult<Vec<T>>>,
    {
        let key = self.key(resource, scope, query);

        if let Some(json) = self.entries.get(&key).await {
            match serde_json::from_str(&json) {
                Ok(items) => {
                    tracing::trace!(key, "list cache hit");
                    return Ok(items);
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "dropping unreadable cache entry");
                    self.entries.invalidate(&key).await;
                }
            }
        }

        let items = load().await?;
        match serde_json::to_string(&items) {
            Ok(json) => self.entries.insert(key, Arc::new(json)).await,
            Err(e) => tracing::warn!(key, error = %e, "list not cacheable"),
        }
        Ok(items)
    }

    /// invalidate
    ///
    /// Makes every cached list of the given resources stale.
    pub fn invalidate(&self, resources: &[Resource]) {
        for resource in resources {
            let generation = self.generations[resource.index()].fetch_add(1, Ordering::AcqRel) + 1;
            tracing::debug!(resource = resource.as_str(), generation, "list cache invalidated");
        }
    }
}
