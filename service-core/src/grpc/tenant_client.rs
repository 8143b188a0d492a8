//! Tenant service client for the resource backend.

use tonic::Status;
use tonic::transport::Channel;

use super::channel::{log_failure, request};
use super::interceptors::CallerMetadata;
use super::proto::tenant_service_client::TenantServiceClient;
use super::proto::{
    CreateTenantRequest, DeleteTenantRequest, GetTenantRequest, Tenant, UpdateTenantRequest,
};

#[derive(Clone)]
pub struct TenantClient {
    client: TenantServiceClient<Channel>,
}

impl TenantClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: TenantServiceClient::new(channel),
        }
    }

    pub async fn create_tenant(
        &self,
        caller: &CallerMetadata,
        name: &str,
    ) -> Result<Tenant, Status> {
        let req = request(
            CreateTenantRequest {
                name: name.to_string(),
            },
            caller,
        )?;
        let response = self
            .client
            .clone()
            .create_tenant(req)
            .await
            .map_err(log_failure("CreateTenant"))?;
        Ok(response.into_inner())
    }

    pub async fn update_tenant(
        &self,
        caller: &CallerMetadata,
        id: &str,
        name: &str,
    ) -> Result<Tenant, Status> {
        let req = request(
            UpdateTenantRequest {
                id: id.to_string(),
                name: name.to_string(),
            },
            caller,
        )?;
        let response = self
            .client
            .clone()
            .update_tenant(req)
            .await
            .map_err(log_failure("UpdateTenant"))?;
        Ok(response.into_inner())
    }

    pub async fn delete_tenant(&self, caller: &CallerMetadata, id: &str) -> Result<bool, Status> {
        let req = request(DeleteTenantRequest { id: id.to_string() }, caller)?;
        let response = self
            .client
            .clone()
            .delete_tenant(req)
            .await
            .map_err(log_failure("DeleteTenant"))?;
        Ok(response.into_inner().success)
    }

    pub async fn get_tenant(&self, caller: &CallerMetadata, id: &str) -> Result<Tenant, Status> {
        let req = request(GetTenantRequest { id: id.to_string() }, caller)?;
        let response = self
            .client
            .clone()
            .get_tenant(req)
            .await
            .map_err(log_failure("GetTenant"))?;
        Ok(response.into_inner())
    }
}
