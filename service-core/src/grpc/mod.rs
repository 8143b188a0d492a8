//! gRPC clients for the resource backend.
//!
//! This module provides:
//! - Generated `proteus.v1` types and clients for the tenant and data services
//! - Tenant and data clients sharing one channel
//! - Caller metadata propagation (`x-tenant-id`, `x-user-id`)
//! - `Struct` <-> JSON conversion for record payloads
//! - Error conversion from `tonic::Status` into `AppError`

pub mod channel;
pub mod data_client;
pub mod error;
pub mod interceptors;
pub mod struct_json;
pub mod tenant_client;

/// Generated protobuf types for the resource backend.
pub mod proto {
    #![allow(clippy::all)]
    tonic::include_proto!("proteus.v1");
}

pub use channel::{ResourceClientConfig, connect_lazy};
pub use data_client::{DataClient, RecordFilter};
pub use interceptors::{CallerMetadata, TENANT_ID_KEY, USER_ID_KEY, inject_caller_metadata};
pub use struct_json::{json_to_struct, struct_to_json};
pub use tenant_client::TenantClient;

// Re-export commonly used tonic types
pub use tonic::{Code, Status};
