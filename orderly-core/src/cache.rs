use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::error::CacheError;

/// Raw key/value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Error)]
pub enum CacheComputeError<E> {
    #[error("cache error: {0}")]
    Cache(CacheError),
    #[error("{0}")]
    Compute(E),
}

/// Typed JSON cache-aside layer over a [`CacheStore`].
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, CacheError> {
        let raw = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store.set(key, &raw, ttl).await
    }

    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key).await
    }

    /// Return the cached value or compute it and populate the cache.
    ///
    /// A miss or an undecodable entry falls through to `compute`. An
    /// unreachable store is returned as [`CacheComputeError::Cache`] so the
    /// caller can decide whether to bypass the cache. Failing to write the
    /// computed value back is logged and otherwise ignored. Concurrent misses
    /// on the same key each run `compute`.
    pub async fn get_or_compute<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, CacheComputeError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get::<T>(key).await {
            Ok(value) => {
                tracing::debug!(key, "Cache hit");
                return Ok(value);
            }
            Err(CacheError::NotFound(_)) => tracing::debug!(key, "Cache miss"),
            Err(CacheError::Serialization(e)) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry")
            }
            Err(e) => return Err(CacheComputeError::Cache(e)),
        }

        let value = compute().await.map_err(CacheComputeError::Compute)?;

        if let Err(e) = self.set(key, &value, ttl).await {
            tracing::warn!(key, error = %e, "Failed to populate cache");
        }
        Ok(value)
    }
}
