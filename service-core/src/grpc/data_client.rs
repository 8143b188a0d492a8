//! Record CRUD and query client for the resource backend.

use serde_json::{Map, Value as Json};
use tonic::Status;
use tonic::transport::Channel;

use super::channel::{log_failure, request};
use super::interceptors::CallerMetadata;
use super::proto::data_service_client::DataServiceClient;
use super::proto::{
    CreateRecordRequest, DeleteRecordRequest, DeleteRecordResponse, Filter, GetRecordRequest,
    Pagination, QueryRequest, QueryResponse, Record, Sort, UpdateRecordRequest,
};
use super::struct_json::{json_to_struct, json_to_value};

/// One query filter, with a JSON operand.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub field: String,
    pub operator: String,
    pub value: Json,
}

#[derive(Clone)]
pub struct DataClient {
    client: DataServiceClient<Channel>,
}

impl DataClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: DataServiceClient::new(channel),
        }
    }

    pub async fn get_record(
        &self,
        caller: &CallerMetadata,
        entity_id: &str,
        record_id: &str,
    ) -> Result<Record, Status> {
        let req = request(
            GetRecordRequest {
                entity_id: entity_id.to_string(),
                record_id: record_id.to_string(),
            },
            caller,
        )?;
        let response = self
            .client
            .clone()
            .get_record(req)
            .await
            .map_err(log_failure("GetRecord"))?;
        Ok(response.into_inner())
    }

    pub async fn query(
        &self,
        caller: &CallerMetadata,
        entity_id: &str,
        filters: &[RecordFilter],
        sort: Option<(String, bool)>,
        page: Option<(i32, i32)>,
    ) -> Result<QueryResponse, Status> {
        let message = QueryRequest {
            entity_id: entity_id.to_string(),
            filters: filters
                .iter()
                .map(|f| Filter {
                    field: f.field.clone(),
                    operator: f.operator.clone(),
                    value: Some(json_to_value(&f.value)),
                })
                .collect(),
            sort: sort.map(|(field, desc)| Sort { field, desc }),
            pagination: page.map(|(page, limit)| Pagination { page, limit }),
        };
        let response = self
            .client
            .clone()
            .query(request(message, caller)?)
            .await
            .map_err(log_failure("Query"))?;
        Ok(response.into_inner())
    }

    pub async fn create_record(
        &self,
        caller: &CallerMetadata,
        entity_id: &str,
        data: &Map<String, Json>,
    ) -> Result<Record, Status> {
        let req = request(
            CreateRecordRequest {
                entity_id: entity_id.to_string(),
                data: Some(json_to_struct(data)),
            },
            caller,
        )?;
        let response = self
            .client
            .clone()
            .create_record(req)
            .await
            .map_err(log_failure("CreateRecord"))?;
        Ok(response.into_inner())
    }

    pub async fn update_record(
        &self,
        caller: &CallerMetadata,
        entity_id: &str,
        record_id: &str,
        data: &Map<String, Json>,
    ) -> Result<Record, Status> {
        let req = request(
            UpdateRecordRequest {
                entity_id: entity_id.to_string(),
                record_id: record_id.to_string(),
                data: Some(json_to_struct(data)),
            },
            caller,
        )?;
        let response = self
            .client
            .clone()
            .update_record(req)
            .await
            .map_err(log_failure("UpdateRecord"))?;
        Ok(response.into_inner())
    }

    pub async fn delete_record(
        &self,
        caller: &CallerMetadata,
        entity_id: &str,
        record_id: &str,
    ) -> Result<DeleteRecordResponse, Status> {
        let req = request(
            DeleteRecordRequest {
                entity_id: entity_id.to_string(),
                record_id: record_id.to_string(),
            },
            caller,
        )?;
        let response = self
            .client
            .clone()
            .delete_record(req)
            .await
            .map_err(log_failure("DeleteRecord"))?;
        Ok(response.into_inner())
    }
}
