// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Cached Retry Policy Registry
//!
//! Resolution order: in-memory TTL cache, then a stage-specific row, then
//! a service-wide row, then the compiled-in
//! default — on top of [`RetryPolicyRepository`]. The cache is read-mostly
//! and guarded by a [`parking_lot::RwLock`] rather than an async mutex:
//! every access is a plain map lookup, never worth yielding the executor
//! for.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use docuflow_domain::entities::RetryPolicy;
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::RetryPolicyRepository;
use docuflow_domain::services::RetryPolicyRegistry;
use docuflow_domain::value_objects::StageName;

struct CacheEntry {
    policy: RetryPolicy,
    expires_at: Instant,
}

type CacheKey = (String, StageName);

pub struct CachedRetryPolicyRegistry {
    repository: Arc<dyn RetryPolicyRepository>,
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl CachedRetryPolicyRegistry {
    pub fn new(repository: Arc<dyn RetryPolicyRepository>, ttl: Duration) -> Self {
        Self {
            repository,
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<RetryPolicy> {
        let guard = self.cache.read();
        let entry = guard.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.policy.clone())
        } else {
            None
        }
    }

    fn store(&self, key: CacheKey, policy: RetryPolicy) {
        self.cache.write().insert(
            key,
            CacheEntry {
                policy,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }
}

#[async_trait]
impl RetryPolicyRegistry for CachedRetryPolicyRegistry {
    async fn resolve(&self, service_name: &str, stage_name: StageName) -> Result<RetryPolicy, DocPipeError> {
        let key: CacheKey = (service_name.to_string(), stage_name);
        if let Some(policy) = self.cached(&key) {
            return Ok(policy);
        }

        let resolved = match self.repository.find_for_stage(service_name, stage_name).await? {
            Some(policy) => policy,
            None => match self.repository.find_for_service(service_name).await? {
                Some(policy) => policy,
                None => RetryPolicy::default_policy(service_name),
            },
        };

        self.store(key, resolved.clone());
        Ok(resolved)
    }

    async fn invalidate(&self, service_name: &str, stage_name: StageName) {
        self.cache.write().remove(&(service_name.to_string(), stage_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[derive(Default)]
    struct CountingRepository {
        stage_hits: AtomicUsize,
        service_hits: AtomicUsize,
        stage_policy: RwLock<Option<RetryPolicy>>,
        service_policy: RwLock<Option<RetryPolicy>>,
    }

    #[async_trait]
    impl RetryPolicyRepository for CountingRepository {
        async fn find_for_stage(&self, _service_name: &str, _stage_name: StageName) -> Result<Option<RetryPolicy>, DocPipeError> {
            self.stage_hits.fetch_add(1, Ordering::SeqCst);
            Ok(self.stage_policy.read().clone())
        }
        async fn find_for_service(&self, _service_name: &str) -> Result<Option<RetryPolicy>, DocPipeError> {
            self.service_hits.fetch_add(1, Ordering::SeqCst);
            Ok(self.service_policy.read().clone())
        }
        async fn upsert(&self, _policy: &RetryPolicy) -> Result<(), DocPipeError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn falls_back_through_stage_service_and_compiled_default() {
        let repo = Arc::new(CountingRepository::default());
        let registry = CachedRetryPolicyRegistry::new(repo.clone(), Duration::from_secs(60));

        let resolved = registry.resolve("embedding", StageName::Embedding).await.unwrap();
        assert_eq!(resolved.max_retries, RetryPolicy::default_policy("embedding").max_retries);

        *repo.service_policy.write() = Some(RetryPolicy {
            max_retries: 9,
            ..RetryPolicy::default_policy("embedding")
        });
        registry.invalidate("embedding", StageName::Embedding).await;
        let resolved = registry.resolve("embedding", StageName::Embedding).await.unwrap();
        assert_eq!(resolved.max_retries, 9);

        *repo.stage_policy.write() = Some(RetryPolicy {
            max_retries: 1,
            ..RetryPolicy::default_policy("embedding")
        });
        registry.invalidate("embedding", StageName::Embedding).await;
        let resolved = registry.resolve("embedding", StageName::Embedding).await.unwrap();
        assert_eq!(resolved.max_retries, 1, "a stage-specific row wins over the service-wide default");
    }

    #[tokio::test]
    async fn repeated_resolves_within_ttl_do_not_hit_the_repository() {
        let repo = Arc::new(CountingRepository::default());
        let registry = CachedRetryPolicyRegistry::new(repo.clone(), Duration::from_secs(60));

        registry.resolve("embedding", StageName::Embedding).await.unwrap();
        registry.resolve("embedding", StageName::Embedding).await.unwrap();
        registry.resolve("embedding", StageName::Embedding).await.unwrap();

        assert_eq!(repo.stage_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refreshed_from_the_repository() {
        let repo = Arc::new(CountingRepository::default());
        let registry = CachedRetryPolicyRegistry::new(repo.clone(), Duration::from_millis(5));

        registry.resolve("embedding", StageName::Embedding).await.unwrap();
        sleep(Duration::from_millis(20)).await;
        registry.resolve("embedding", StageName::Embedding).await.unwrap();

        assert_eq!(repo.stage_hits.load(Ordering::SeqCst), 2);
    }
}
