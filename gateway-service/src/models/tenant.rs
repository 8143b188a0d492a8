use serde::{Deserialize, Serialize};
use service_core::grpc::proto;

/// Tenant id reserved by the identity backend for unscoped sign-in.
pub const PUBLIC_TENANT_ID: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<proto::Tenant> for Tenant {
    fn from(t: proto::Tenant) -> Self {
        Self {
            id: t.id,
            name: t.name,
            created_at: Some(t.created_at).filter(|s| !s.is_empty()),
            updated_at: Some(t.updated_at).filter(|s| !s.is_empty()),
        }
    }
}
