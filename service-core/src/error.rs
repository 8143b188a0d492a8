use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Password change required")]
    PasswordChangeRequired,

    #[error("MFA setup required")]
    MfaSetupRequired,

    #[error("MFA verification required")]
    MfaVerifyRequired,

    #[error("Session refresh failed: {0}")]
    SessionRefreshFailed(anyhow::Error),

    #[error("Token theft detected")]
    TokenTheftDetected,

    #[error("Tenant creation failed: {0}")]
    TenantCreationFailed(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::PasswordChangeRequired => "PASSWORD_CHANGE_REQUIRED",
            AppError::MfaSetupRequired => "MFA_SETUP_REQUIRED",
            AppError::MfaVerifyRequired => "MFA_VERIFY_REQUIRED",
            AppError::SessionRefreshFailed(_) => "SESSION_REFRESH_FAILED",
            AppError::TokenTheftDetected => "TOKEN_THEFT",
            AppError::TenantCreationFailed(_) => "TENANT_CREATION_FAILED",
            AppError::InternalError(_) => "INTERNAL_SERVER_ERROR",
            AppError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            AppError::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated(_)
            | AppError::SessionRefreshFailed(_)
            | AppError::TokenTheftDetected => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_)
            | AppError::PasswordChangeRequired
            | AppError::MfaSetupRequired
            | AppError::MfaVerifyRequired => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TenantCreationFailed(_)
            | AppError::InternalError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            code: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status();
        let code = self.code();

        let (error_message, details) = match self {
            AppError::ValidationError(err) => {
                ("Validation error".to_string(), Some(err.to_string()))
            }
            AppError::BadRequest(err)
            | AppError::NotFound(err)
            | AppError::Unauthenticated(err)
            | AppError::Forbidden(err)
            | AppError::Conflict(err) => (err.to_string(), None),
            AppError::PasswordChangeRequired => (
                "You must change your password before continuing".to_string(),
                None,
            ),
            AppError::MfaSetupRequired => (
                "Multi-factor authentication must be set up before continuing".to_string(),
                None,
            ),
            AppError::MfaVerifyRequired => (
                "Multi-factor verification is required for this session".to_string(),
                None,
            ),
            AppError::SessionRefreshFailed(err) => {
                tracing::warn!(error = %err, "Session refresh failed");
                ("Session refresh failed".to_string(), None)
            }
            AppError::TokenTheftDetected => (
                "Token theft detected. All sessions have been revoked".to_string(),
                None,
            ),
            AppError::TenantCreationFailed(err) => {
                tracing::error!(error = ?err, "Tenant creation failed");
                ("Failed to create tenant organization".to_string(), None)
            }
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal error");
                ("Internal server error".to_string(), None)
            }
            AppError::ServiceUnavailable => ("Service unavailable".to_string(), None),
            AppError::ConfigError(err) => {
                tracing::error!(error = %err, "Configuration error");
                ("Configuration error".to_string(), None)
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                code,
                details,
            }),
        )
            .into_response()
    }
}
