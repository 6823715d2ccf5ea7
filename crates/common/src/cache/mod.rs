//! Redis-backed snapshot cache
//!
//! Stores slim graph snapshots keyed by a digest of the build request so a
//! repeat build can be rehydrated from metadata lookups instead of re-running
//! the whole pipeline. The cache is optional: when no Redis URL is configured
//! the gateway simply builds every graph fresh.

use crate::config::CacheConfig;
use crate::errors::{AppError, Result};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Redis cache client
#[derive(Clone)]
pub struct Cache {
    connection: MultiplexedConnection,
    config: CacheConfig,
}

impl Cache {
    /// Connect to the configured Redis instance
    pub async fn connect(config: CacheConfig) -> Result<Self> {
        let url = config.url.as_deref().ok_or_else(|| AppError::Configuration {
            message: "cache.url is not set".to_string(),
        })?;

        let client = Client::open(url).map_err(|e| AppError::Cache {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Cache {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self { connection, config })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(&full_key).await.map_err(|e| AppError::Cache {
            message: format!("Failed to get key '{}': {}", full_key, e),
        })?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json).map_err(|e| AppError::Cache {
                    message: format!("Failed to parse cached value: {}", e),
                })?;
                debug!(key = %full_key, "Cache hit");
                Ok(Some(parsed))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Set a value in cache with the configured TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.config.ttl_secs).await
    }

    /// Set a value in cache with a custom TTL
    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
        let full_key = self.key(key);
        let json = serde_json::to_string(value).map_err(|e| AppError::Cache {
            message: format!("Failed to serialize value: {}", e),
        })?;

        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(&full_key, &json, ttl_secs)
            .await
            .map_err(|e| AppError::Cache {
                message: format!("Failed to set key '{}': {}", full_key, e),
            })?;

        debug!(key = %full_key, ttl_secs, "Cache set");
        Ok(())
    }

    /// Delete a cached value
    pub async fn delete(&self, key: &str) -> Result<()> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();
        let _: () = conn.del(&full_key).await.map_err(|e| AppError::Cache {
            message: format!("Failed to delete key '{}': {}", full_key, e),
        })?;
        Ok(())
    }

    /// Check connectivity
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| AppError::Cache {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }
}

/// Digest a build request into a stable cache key
pub fn graph_key(identifier: &str, n_roots: usize, n_branches: usize) -> String {
    digest_key(&format!("graph:v1:{}:{}:{}", identifier, n_roots, n_branches))
}

/// Digest an author-graph request into a stable cache key
pub fn author_graph_key(identifier: &str, max_works: usize) -> String {
    digest_key(&format!("author:v1:{}:{}", identifier, max_works))
}

fn digest_key(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    format!("snapshot:{}", &hex::encode(digest)[..16])
}
