//! RBAC over the identity backend's metadata store.
//!
//! Layout:
//! - `{userId}` -> `{ "tenants": { tenantId: role } }`
//! - `roles_list:{tenantId}` -> `{ "roles": [role, ...] }`
//! - `policy:{tenantId}:{role}` -> `{ "policy": RolePolicy | null }`
//!
//! Role lists and policies are read through a TTL cache. Writes invalidate the
//! affected keys before returning.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::cache::PolicyCache;
use super::metadata::MetadataStore;
use super::RbacProvider;
use crate::models::RolePolicy;
use crate::services::ServiceError;

pub const DEFAULT_POLICY_TTL: Duration = Duration::from_secs(600);

pub fn roles_list_key(tenant_id: &str) -> String {
    format!("roles_list:{}", tenant_id)
}

pub fn policy_key(tenant_id: &str, role: &str) -> String {
    format!("policy:{}:{}", tenant_id, role)
}

pub struct MetadataRbacProvider {
    store: Arc<dyn MetadataStore>,
    cache: Arc<dyn PolicyCache>,
    ttl: Duration,
}

impl MetadataRbacProvider {
    pub fn new(store: Arc<dyn MetadataStore>, cache: Arc<dyn PolicyCache>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Policy cache read failed, using backend");
                None
            }
        }
    }

    async fn fill<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &raw, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Policy cache write failed");
        }
    }

    async fn stored_roles(&self, tenant_id: &str) -> Result<Vec<String>, ServiceError> {
        let metadata = self.store.get(&roles_list_key(tenant_id)).await?;
        Ok(metadata
            .get("roles")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default())
    }

    async fn user_tenants(&self, user_id: &str) -> Result<Map<String, Value>, ServiceError> {
        let metadata = self.store.get(user_id).await?;
        Ok(metadata
            .get("tenants")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default())
    }

    async fn write_roles(&self, tenant_id: &str, roles: Vec<String>) -> Result<(), ServiceError> {
        let key = roles_list_key(tenant_id);
        let mut update = Map::new();
        update.insert("roles".to_string(), serde_json::to_value(roles)?);
        self.store.merge(&key, update).await?;
        self.cache.delete(&key).await
    }
}

#[async_trait]
impl RbacProvider for MetadataRbacProvider {
    async fn get_user_role_in_tenant(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Option<String>, ServiceError> {
        let tenants = self.user_tenants(user_id).await?;
        Ok(tenants
            .get(tenant_id)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn assign_role_to_user(
        &self,
        user_id: &str,
        tenant_id: &str,
        role: &str,
    ) -> Result<(), ServiceError> {
        let mut tenants = self.user_tenants(user_id).await?;
        tenants.insert(tenant_id.to_string(), Value::String(role.to_string()));

        let mut update = Map::new();
        update.insert("tenants".to_string(), Value::Object(tenants));
        self.store.merge(user_id, update).await?;

        tracing::info!(user_id = %user_id, tenant_id = %tenant_id, role = %role, "Role assigned");
        Ok(())
    }

    async fn remove_user_role(&self, user_id: &str, tenant_id: &str) -> Result<(), ServiceError> {
        let mut tenants = self.user_tenants(user_id).await?;
        if tenants.remove(tenant_id).is_none() {
            return Ok(());
        }

        let mut update = Map::new();
        update.insert("tenants".to_string(), Value::Object(tenants));
        self.store.merge(user_id, update).await?;

        tracing::info!(user_id = %user_id, tenant_id = %tenant_id, "Role removed");
        Ok(())
    }

    async fn list_tenant_roles(&self, tenant_id: &str) -> Result<Vec<String>, ServiceError> {
        let key = roles_list_key(tenant_id);
        if let Some(roles) = self.cached::<Vec<String>>(&key).await {
            return Ok(roles);
        }

        let roles = self.stored_roles(tenant_id).await?;
        self.fill(&key, &roles).await;
        Ok(roles)
    }

    async fn get_role_policy(
        &self,
        tenant_id: &str,
        role: &str,
    ) -> Result<Option<RolePolicy>, ServiceError> {
        let key = policy_key(tenant_id, role);
        if let Some(policy) = self.cached::<RolePolicy>(&key).await {
            return Ok(Some(policy));
        }

        let metadata = self.store.get(&key).await?;
        let policy: Option<RolePolicy> = match metadata.get("policy") {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value.clone())?),
        };

        if let Some(policy) = &policy {
            self.fill(&key, policy).await;
        }
        Ok(policy)
    }

    async fn set_role_policy(
        &self,
        tenant_id: &str,
        role: &str,
        policy: &RolePolicy,
    ) -> Result<(), ServiceError> {
        let key = policy_key(tenant_id, role);
        let mut update = Map::new();
        update.insert("policy".to_string(), serde_json::to_value(policy)?);
        self.store.merge(&key, update).await?;
        self.cache.delete(&key).await?;

        let mut roles = self.stored_roles(tenant_id).await?;
        if !roles.iter().any(|r| r == role) {
            roles.push(role.to_string());
            self.write_roles(tenant_id, roles).await?;
        }

        tracing::info!(tenant_id = %tenant_id, role = %role, "Role policy stored");
        Ok(())
    }

    async fn delete_role_policy(&self, tenant_id: &str, role: &str) -> Result<(), ServiceError> {
        let key = policy_key(tenant_id, role);
        let mut update = Map::new();
        update.insert("policy".to_string(), Value::Null);
        self.store.merge(&key, update).await?;
        self.cache.delete(&key).await?;

        let roles = self.stored_roles(tenant_id).await?;
        let remaining: Vec<String> = roles.iter().filter(|r| *r != role).cloned().collect();
        if remaining.len() != roles.len() {
            self.write_roles(tenant_id, remaining).await?;
        }

        tracing::info!(tenant_id = %tenant_id, role = %role, "Role policy deleted");
        Ok(())
    }
}
