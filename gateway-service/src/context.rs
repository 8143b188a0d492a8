//! Per-request caller context, resolved once before any operation runs.

use service_core::grpc::CallerMetadata;
use tokio_util::sync::CancellationToken;

use crate::models::{PermissionSet, Session};
use crate::services::ServiceError;

/// Header selecting the active tenant.
pub const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub session: Option<Session>,
    pub tenant_id: Option<String>,
    pub role: Option<String>,
    pub permissions: Option<PermissionSet>,
    pub cancellation: CancellationToken,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }

    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref()
    }

    pub fn require_tenant(&self) -> Result<&str, ServiceError> {
        self.tenant_id.as_deref().ok_or_else(|| {
            ServiceError::BadRequest(format!("Tenant ID header ({}) is required.", TENANT_HEADER))
        })
    }

    /// Identity forwarded to the resource backend.
    pub fn caller_metadata(&self) -> CallerMetadata {
        CallerMetadata::new(self.tenant_id.clone(), self.user_id().map(str::to_string))
    }
}
