//! Mapping of resource-backend `tonic::Status` failures onto `AppError`.
//!
//! | gRPC Status | AppError |
//! |-------------|----------|
//! | `INVALID_ARGUMENT`, `FAILED_PRECONDITION`, `OUT_OF_RANGE` | `BadRequest` |
//! | `NOT_FOUND` | `NotFound` |
//! | `UNAUTHENTICATED` | `Unauthenticated` |
//! | `PERMISSION_DENIED` | `Forbidden` |
//! | `ALREADY_EXISTS` | `Conflict` |
//! | `UNAVAILABLE` | `ServiceUnavailable` |
//! | anything else | `InternalError` |

use tonic::{Code, Status};

use crate::error::AppError;

impl From<Status> for AppError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => {
                AppError::BadRequest(anyhow::anyhow!("{}", status.message()))
            }
            Code::NotFound => AppError::NotFound(anyhow::anyhow!("{}", status.message())),
            Code::Unauthenticated => {
                AppError::Unauthenticated(anyhow::anyhow!("{}", status.message()))
            }
            Code::PermissionDenied => AppError::Forbidden(anyhow::anyhow!("{}", status.message())),
            Code::AlreadyExists => AppError::Conflict(anyhow::anyhow!("{}", status.message())),
            Code::Unavailable => AppError::ServiceUnavailable,
            Code::Aborted | Code::Cancelled | Code::DeadlineExceeded => {
                AppError::InternalError(anyhow::anyhow!("Request failed: {}", status.message()))
            }
            Code::Unimplemented => {
                AppError::InternalError(anyhow::anyhow!("Not implemented: {}", status.message()))
            }
            Code::Ok => AppError::InternalError(anyhow::anyhow!("Unexpected OK status as error")),
            _ => AppError::InternalError(anyhow::anyhow!("{}", status.message())),
        }
    }
}
