//! Resource backend access: tenant records and entity records.

use async_trait::async_trait;
use serde_json::{Map, Value};
use service_core::grpc::{CallerMetadata, DataClient, RecordFilter, TenantClient};

use crate::models::{DeleteOutcome, Record, RecordPage, RecordQuery, Tenant};
use crate::services::ServiceError;

/// Authoritative tenant store.
#[async_trait]
pub trait TenantBackend: Send + Sync {
    async fn create_tenant(&self, caller: &CallerMetadata, name: &str)
        -> Result<Tenant, ServiceError>;

    async fn get_tenant(&self, caller: &CallerMetadata, id: &str) -> Result<Tenant, ServiceError>;

    async fn update_tenant(
        &self,
        caller: &CallerMetadata,
        id: &str,
        name: &str,
    ) -> Result<Tenant, ServiceError>;

    async fn delete_tenant(&self, caller: &CallerMetadata, id: &str) -> Result<bool, ServiceError>;
}

/// Entity record CRUD and query.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn get_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        record_id: &str,
    ) -> Result<Record, ServiceError>;

    async fn query_records(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        query: &RecordQuery,
    ) -> Result<RecordPage, ServiceError>;

    async fn create_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        data: &Map<String, Value>,
    ) -> Result<Record, ServiceError>;

    async fn update_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        record_id: &str,
        data: &Map<String, Value>,
    ) -> Result<Record, ServiceError>;

    async fn delete_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        record_id: &str,
    ) -> Result<DeleteOutcome, ServiceError>;
}

#[derive(Clone)]
pub struct GrpcTenantBackend {
    client: TenantClient,
}

impl GrpcTenantBackend {
    pub fn new(client: TenantClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TenantBackend for GrpcTenantBackend {
    async fn create_tenant(
        &self,
        caller: &CallerMetadata,
        name: &str,
    ) -> Result<Tenant, ServiceError> {
        Ok(self.client.create_tenant(caller, name).await?.into())
    }

    async fn get_tenant(&self, caller: &CallerMetadata, id: &str) -> Result<Tenant, ServiceError> {
        Ok(self.client.get_tenant(caller, id).await?.into())
    }

    async fn update_tenant(
        &self,
        caller: &CallerMetadata,
        id: &str,
        name: &str,
    ) -> Result<Tenant, ServiceError> {
        Ok(self.client.update_tenant(caller, id, name).await?.into())
    }

    async fn delete_tenant(&self, caller: &CallerMetadata, id: &str) -> Result<bool, ServiceError> {
        Ok(self.client.delete_tenant(caller, id).await?)
    }
}

#[derive(Clone)]
pub struct GrpcRecordBackend {
    client: DataClient,
}

impl GrpcRecordBackend {
    pub fn new(client: DataClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordBackend for GrpcRecordBackend {
    async fn get_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        record_id: &str,
    ) -> Result<Record, ServiceError> {
        Ok(self.client.get_record(caller, entity, record_id).await?.into())
    }

    async fn query_records(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        query: &RecordQuery,
    ) -> Result<RecordPage, ServiceError> {
        let filters: Vec<RecordFilter> = query
            .filters
            .iter()
            .map(|f| RecordFilter {
                field: f.field.clone(),
                operator: f.operator.clone(),
                value: f.value.clone(),
            })
            .collect();
        let sort = query.sort.as_ref().map(|s| (s.field.clone(), s.desc));
        let page = query.pagination.map(|p| (p.page, p.limit));

        let response = self
            .client
            .query(caller, entity, &filters, sort, page)
            .await?;
        Ok(response.into())
    }

    async fn create_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        data: &Map<String, Value>,
    ) -> Result<Record, ServiceError> {
        Ok(self.client.create_record(caller, entity, data).await?.into())
    }

    async fn update_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        record_id: &str,
        data: &Map<String, Value>,
    ) -> Result<Record, ServiceError> {
        Ok(self
            .client
            .update_record(caller, entity, record_id, data)
            .await?
            .into())
    }

    async fn delete_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        record_id: &str,
    ) -> Result<DeleteOutcome, ServiceError> {
        let response = self.client.delete_record(caller, entity, record_id).await?;
        Ok(DeleteOutcome {
            success: response.success,
            message: response.message,
        })
    }
}
