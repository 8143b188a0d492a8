//! Caller identity propagation for outgoing resource-backend calls.

use tonic::metadata::MetadataValue;
use tonic::{Request, Status};

/// gRPC metadata key carrying the active tenant.
pub const TENANT_ID_KEY: &str = "x-tenant-id";

/// gRPC metadata key carrying the calling user.
pub const USER_ID_KEY: &str = "x-user-id";

/// Who is calling, as seen by the resource backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerMetadata {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
}

impl CallerMetadata {
    pub fn new(tenant_id: Option<String>, user_id: Option<String>) -> Self {
        Self { tenant_id, user_id }
    }

    /// Metadata for calls made outside any tenant, e.g. tenant provisioning.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: None,
            user_id: Some(user_id.into()),
        }
    }
}

/// Attach tenant and user metadata to an outgoing request.
#[allow(clippy::result_large_err)]
pub fn inject_caller_metadata<T>(
    request: &mut Request<T>,
    caller: &CallerMetadata,
) -> Result<(), Status> {
    if let Some(tenant_id) = &caller.tenant_id {
        let value = MetadataValue::try_from(tenant_id.as_str())
            .map_err(|_| Status::invalid_argument("Invalid tenant id in metadata"))?;
        request.metadata_mut().insert(TENANT_ID_KEY, value);
    }

    if let Some(user_id) = &caller.user_id {
        let value = MetadataValue::try_from(user_id.as_str())
            .map_err(|_| Status::invalid_argument("Invalid user id in metadata"))?;
        request.metadata_mut().insert(USER_ID_KEY, value);
    }

    Ok(())
}
