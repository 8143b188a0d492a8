use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::instrument;

use super::client::{expect_ok, status_of, unexpected, SuperTokensClient};
use super::user::{profile_from_metadata, CoreUser};
use super::REQUIRES_PASSWORD_CHANGE_KEY;
use crate::models::{IssuedSession, Session, SessionTokens, SessionTrustPayload, User};
use crate::providers::{AuthCoreProvider, MetadataStore};
use crate::services::ServiceError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreSession {
    handle: String,
    user_id: String,
    #[serde(default, rename = "userDataInJWT")]
    user_data_in_jwt: SessionTrustPayload,
}

impl From<CoreSession> for Session {
    fn from(s: CoreSession) -> Self {
        Session {
            user_id: s.user_id,
            handle: s.handle,
            payload: s.user_data_in_jwt,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoreToken {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreIssuedSession {
    session: CoreSession,
    access_token: CoreToken,
    refresh_token: CoreToken,
}

impl From<CoreIssuedSession> for IssuedSession {
    fn from(s: CoreIssuedSession) -> Self {
        IssuedSession {
            session: s.session.into(),
            tokens: SessionTokens {
                access_token: s.access_token.token,
                refresh_token: s.refresh_token.token,
            },
        }
    }
}

/// Credentials, sessions and password reset over the SuperTokens core.
pub struct SuperTokensAuthCore {
    client: SuperTokensClient,
    metadata: Arc<dyn MetadataStore>,
}

impl SuperTokensAuthCore {
    pub fn new(client: SuperTokensClient, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { client, metadata }
    }

    async fn update_password(&self, user_id: &str, password: &str) -> Result<(), ServiceError> {
        let body = self
            .client
            .put(
                "/recipe/user",
                &json!({ "recipeUserId": user_id, "password": password }),
            )
            .await?;
        match status_of(&body) {
            "OK" => Ok(()),
            "UNKNOWN_USER_ID_ERROR" => Err(ServiceError::NotFound("User not found.".to_string())),
            "PASSWORD_POLICY_VIOLATED_ERROR" => Err(ServiceError::BadRequest(
                body.get("failureReason")
                    .and_then(Value::as_str)
                    .unwrap_or("Password does not meet the password policy.")
                    .to_string(),
            )),
            other => Err(unexpected(other, &body)),
        }
    }
}

#[async_trait]
impl AuthCoreProvider for SuperTokensAuthCore {
    #[instrument(skip(self, password))]
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/signin",
                &json!({ "email": email, "password": password }),
            )
            .await?;
        match status_of(&body) {
            "OK" => {}
            "WRONG_CREDENTIALS_ERROR" => return Err(ServiceError::InvalidCredentials),
            other => return Err(unexpected(other, &body)),
        }

        let user = CoreUser::from_body(&body)?;
        let metadata = self.metadata.get(&user.id).await?;
        Ok(user.into_user(profile_from_metadata(&metadata)))
    }

    #[instrument(skip(self, payload))]
    async fn create_session(
        &self,
        user_id: &str,
        payload: &SessionTrustPayload,
    ) -> Result<IssuedSession, ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/session",
                &json!({
                    "userId": user_id,
                    "userDataInJWT": payload,
                    "userDataInDatabase": {},
                    "enableAntiCsrf": false,
                }),
            )
            .await?;
        let issued: CoreIssuedSession = serde_json::from_value(expect_ok(body)?)?;
        Ok(issued.into())
    }

    async fn verify_session(&self, access_token: &str) -> Result<Session, ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/session/verify",
                &json!({
                    "accessToken": access_token,
                    "enableAntiCsrf": false,
                    "doAntiCsrfCheck": false,
                    "checkDatabase": true,
                }),
            )
            .await?;
        match status_of(&body) {
            "OK" => {}
            "UNAUTHORISED" => {
                return Err(ServiceError::Unauthenticated(
                    "Invalid or expired session.".to_string(),
                ))
            }
            "TRY_REFRESH_TOKEN" => {
                return Err(ServiceError::Unauthenticated(
                    "Session expired. Refresh the access token.".to_string(),
                ))
            }
            other => return Err(unexpected(other, &body)),
        }

        let session: CoreSession = serde_json::from_value(
            body.get("session")
                .cloned()
                .ok_or_else(|| unexpected("OK", &body))?,
        )?;
        Ok(session.into())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<IssuedSession, ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/session/refresh",
                &json!({ "refreshToken": refresh_token, "enableAntiCsrf": false }),
            )
            .await?;
        let status = status_of(&body).to_string();
        match status.as_str() {
            "OK" => {
                let issued: CoreIssuedSession = serde_json::from_value(body)?;
                Ok(issued.into())
            }
            "UNAUTHORISED" => Err(ServiceError::SessionRefreshFailed(
                body.get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Refresh token is invalid or expired.")
                    .to_string(),
            )),
            "TOKEN_THEFT_DETECTED" => {
                let user_id = body
                    .pointer("/session/userId")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                tracing::warn!(user_id = %user_id, "Refresh token reuse detected");
                Err(ServiceError::TokenTheftDetected { user_id })
            }
            other => Err(unexpected(other, &body)),
        }
    }

    async fn revoke_session(&self, session_handle: &str) -> Result<(), ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/session/remove",
                &json!({ "sessionHandles": [session_handle] }),
            )
            .await?;
        expect_ok(body)?;
        Ok(())
    }

    async fn revoke_all_sessions(&self, user_id: &str) -> Result<(), ServiceError> {
        let body = self
            .client
            .post("/recipe/session/remove", &json!({ "userId": user_id }))
            .await?;
        expect_ok(body)?;
        tracing::info!(user_id = %user_id, "All sessions revoked");
        Ok(())
    }

    async fn create_password_reset_token(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<String, ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/user/password/reset/token",
                &json!({ "userId": user_id, "email": email }),
            )
            .await?;
        match status_of(&body) {
            "OK" => body
                .get("token")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| unexpected("OK", &body)),
            "UNKNOWN_USER_ID_ERROR" => Err(ServiceError::NotFound("User not found.".to_string())),
            other => Err(unexpected(other, &body)),
        }
    }

    #[instrument(skip_all)]
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<bool, ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/user/password/reset/token/consume",
                &json!({ "token": token }),
            )
            .await?;
        let user_id = match status_of(&body) {
            "OK" => body
                .get("userId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| unexpected("OK", &body))?,
            "RESET_PASSWORD_INVALID_TOKEN_ERROR" => return Ok(false),
            other => return Err(unexpected(other, &body)),
        };

        self.update_password(&user_id, new_password).await?;
        tracing::info!(user_id = %user_id, "Password reset");
        Ok(true)
    }

    async fn get_requires_password_change(&self, user_id: &str) -> Result<bool, ServiceError> {
        let metadata = self.metadata.get(user_id).await?;
        Ok(metadata
            .get(REQUIRES_PASSWORD_CHANGE_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn set_requires_password_change(
        &self,
        user_id: &str,
        required: bool,
    ) -> Result<(), ServiceError> {
        let mut update = Map::new();
        update.insert(REQUIRES_PASSWORD_CHANGE_KEY.to_string(), Value::Bool(required));
        self.metadata.merge(user_id, update).await?;
        Ok(())
    }
}
