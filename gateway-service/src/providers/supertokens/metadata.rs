use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::client::{expect_ok, SuperTokensClient};
use crate::providers::MetadataStore;
use crate::services::ServiceError;

/// `MetadataStore` over the core's user-metadata recipe. The core applies the
/// same shallow merge (`null` deletes) as the in-memory store.
#[derive(Clone)]
pub struct SuperTokensMetadataStore {
    client: SuperTokensClient,
}

impl SuperTokensMetadataStore {
    pub fn new(client: SuperTokensClient) -> Self {
        Self { client }
    }
}

fn metadata_of(body: &Value) -> Map<String, Value> {
    body.get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

#[async_trait]
impl MetadataStore for SuperTokensMetadataStore {
    async fn get(&self, key: &str) -> Result<Map<String, Value>, ServiceError> {
        let body = self
            .client
            .get("/recipe/user/metadata", &[("userId", key)])
            .await?;
        Ok(metadata_of(&expect_ok(body)?))
    }

    async fn merge(
        &self,
        key: &str,
        update: Map<String, Value>,
    ) -> Result<Map<String, Value>, ServiceError> {
        let body = self
            .client
            .put(
                "/recipe/user/metadata",
                &json!({ "userId": key, "metadataUpdate": update }),
            )
            .await?;
        Ok(metadata_of(&expect_ok(body)?))
    }
}
