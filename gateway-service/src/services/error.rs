use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password change required")]
    PasswordChangeRequired,

    #[error("MFA setup required")]
    MfaSetupRequired,

    #[error("MFA verification required")]
    MfaVerifyRequired,

    #[error("Session refresh failed: {0}")]
    SessionRefreshFailed(String),

    #[error("Token theft detected for user {user_id}")]
    TokenTheftDetected { user_id: String },

    #[error("Tenant creation failed: {0}")]
    TenantCreationFailed(#[source] Box<ServiceError>),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Identity backend error: {0}")]
    Backend(#[from] reqwest::Error),

    #[error("Identity backend returned {status}: {message}")]
    BackendStatus { status: String, message: String },

    #[error("Resource backend error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn backend_status(status: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::BackendStatus {
            status: status.into(),
            message: message.into(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unauthenticated(msg) => AppError::Unauthenticated(anyhow::anyhow!(msg)),
            ServiceError::Forbidden(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            ServiceError::BadRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::InvalidCredentials => {
                AppError::Unauthenticated(anyhow::anyhow!("Invalid email or password."))
            }
            ServiceError::PasswordChangeRequired => AppError::PasswordChangeRequired,
            ServiceError::MfaSetupRequired => AppError::MfaSetupRequired,
            ServiceError::MfaVerifyRequired => AppError::MfaVerifyRequired,
            ServiceError::SessionRefreshFailed(msg) => {
                AppError::SessionRefreshFailed(anyhow::anyhow!(msg))
            }
            ServiceError::TokenTheftDetected { .. } => AppError::TokenTheftDetected,
            ServiceError::TenantCreationFailed(source) => {
                AppError::TenantCreationFailed(anyhow::Error::new(*source))
            }
            ServiceError::Cancelled => AppError::InternalError(anyhow::anyhow!("Request cancelled")),
            ServiceError::Delivery(msg) => {
                AppError::InternalError(anyhow::anyhow!("Notification delivery failed: {}", msg))
            }
            ServiceError::Backend(e) => AppError::InternalError(anyhow::Error::new(e)),
            ServiceError::BackendStatus { status, message } => {
                AppError::InternalError(anyhow::anyhow!("{}: {}", status, message))
            }
            ServiceError::Grpc(status) => AppError::from(status),
            ServiceError::Redis(e) => AppError::InternalError(anyhow::Error::new(e)),
            ServiceError::Serialization(e) => AppError::InternalError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
