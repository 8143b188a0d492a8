//! Shared channel setup and call helpers for resource-backend clients.

use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

use super::interceptors::{CallerMetadata, inject_caller_metadata};

/// Configuration for connecting to the resource backend.
#[derive(Clone, Debug)]
pub struct ResourceClientConfig {
    /// The gRPC endpoint of the resource backend.
    pub endpoint: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
}

impl Default for ResourceClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:50051".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Build a lazily-connecting channel; the first call establishes the connection.
pub fn connect_lazy(config: &ResourceClientConfig) -> Result<Channel, tonic::transport::Error> {
    let channel = Endpoint::from_shared(config.endpoint.clone())?
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .connect_lazy();
    Ok(channel)
}

/// Wrap a message with the caller's tenant and user metadata.
#[allow(clippy::result_large_err)]
pub(crate) fn request<T>(message: T, caller: &CallerMetadata) -> Result<Request<T>, Status> {
    let mut request = Request::new(message);
    inject_caller_metadata(&mut request, caller)?;
    Ok(request)
}

/// Log a failed call and pass the status through.
pub(crate) fn log_failure(method: &'static str) -> impl FnOnce(Status) -> Status {
    move |status| {
        tracing::warn!(
            method = method,
            code = ?status.code(),
            message = %status.message(),
            "Resource backend call failed"
        );
        status
    }
}
