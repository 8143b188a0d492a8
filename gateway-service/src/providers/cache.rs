//! TTL cache for role lists and role policies.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::{aio::ConnectionManager, Client};

use crate::services::ServiceError;

#[async_trait]
pub trait PolicyCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
}

/// Process-local cache; expired entries are evicted on read.
#[derive(Default)]
pub struct InMemoryPolicyCache {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemoryPolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PolicyCache for InMemoryPolicyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (value, expires_at) = entry.value();
            if *expires_at > now {
                return Ok(Some(value.clone()));
            }
        }
        self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ServiceError> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Shared cache for multi-instance deployments.
#[derive(Clone)]
pub struct RedisPolicyCache {
    _client: Client,
    manager: ConnectionManager,
    prefix: String,
}

impl RedisPolicyCache {
    pub async fn new(url: &str) -> Result<Self, ServiceError> {
        tracing::info!("Connecting to Redis policy cache");
        let client = Client::open(url)?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            e
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
            prefix: "rbac:".to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl PolicyCache for RedisPolicyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(self.key(key))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
