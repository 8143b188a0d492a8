use std::sync::Arc;

use serde_json::{Map, Value};

use super::policy::PolicyService;
use super::ServiceError;
use crate::context::RequestContext;
use crate::middleware::{GuardOptions, SessionTrustGate};
use crate::models::{Action, DeleteOutcome, Record, RecordPage, RecordQuery};
use crate::providers::RecordBackend;

/// Entity record access: gate, permission check, backend call, redaction.
#[derive(Clone)]
pub struct DataService {
    records: Arc<dyn RecordBackend>,
    gate: SessionTrustGate,
}

impl DataService {
    pub fn new(records: Arc<dyn RecordBackend>, gate: SessionTrustGate) -> Self {
        Self { records, gate }
    }

    fn admit(&self, ctx: &RequestContext, entity: &str, action: Action) -> Result<(), ServiceError> {
        self.gate.admit(ctx, GuardOptions::STRICT)?;
        PolicyService::authorize(ctx.permissions(), entity, action)
    }

    pub async fn get_record(
        &self,
        ctx: &RequestContext,
        entity: &str,
        record_id: &str,
    ) -> Result<Record, ServiceError> {
        self.admit(ctx, entity, Action::Read)?;
        let record = self
            .records
            .get_record(&ctx.caller_metadata(), entity, record_id)
            .await?;
        Ok(PolicyService::redact(record, entity, ctx.permissions()))
    }

    pub async fn query_records(
        &self,
        ctx: &RequestContext,
        entity: &str,
        query: &RecordQuery,
    ) -> Result<RecordPage, ServiceError> {
        self.admit(ctx, entity, Action::Read)?;
        let mut page = self
            .records
            .query_records(&ctx.caller_metadata(), entity, query)
            .await?;
        page.data = PolicyService::redact_all(page.data, entity, ctx.permissions());
        Ok(page)
    }

    pub async fn create_record(
        &self,
        ctx: &RequestContext,
        entity: &str,
        data: &Map<String, Value>,
    ) -> Result<Record, ServiceError> {
        self.admit(ctx, entity, Action::Create)?;
        let record = self
            .records
            .create_record(&ctx.caller_metadata(), entity, data)
            .await?;
        tracing::info!(entity = %entity, record_id = %record.id, tenant_id = ?ctx.tenant_id, "Record created");
        Ok(PolicyService::redact(record, entity, ctx.permissions()))
    }

    pub async fn update_record(
        &self,
        ctx: &RequestContext,
        entity: &str,
        record_id: &str,
        data: &Map<String, Value>,
    ) -> Result<Record, ServiceError> {
        self.admit(ctx, entity, Action::Update)?;
        let record = self
            .records
            .update_record(&ctx.caller_metadata(), entity, record_id, data)
            .await?;
        Ok(PolicyService::redact(record, entity, ctx.permissions()))
    }

    pub async fn delete_record(
        &self,
        ctx: &RequestContext,
        entity: &str,
        record_id: &str,
    ) -> Result<DeleteOutcome, ServiceError> {
        self.admit(ctx, entity, Action::Delete)?;
        let outcome = self
            .records
            .delete_record(&ctx.caller_metadata(), entity, record_id)
            .await?;
        tracing::info!(entity = %entity, record_id = %record_id, success = outcome.success, "Record deleted");
        Ok(outcome)
    }
}
