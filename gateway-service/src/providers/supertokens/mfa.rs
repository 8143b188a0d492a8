use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::client::{expect_ok, status_of, unexpected, SuperTokensClient};
use crate::models::{DeviceSummary, TotpDevice};
use crate::providers::MfaProvider;
use crate::services::ServiceError;

const TOTP_PERIOD_SECONDS: u32 = 30;
const TOTP_SKEW: u32 = 1;
const TOTP_DIGITS: u32 = 6;

#[derive(Debug, Deserialize)]
struct CoreDevice {
    name: String,
    #[serde(default)]
    verified: bool,
}

/// Build the `otpauth://` URI authenticator apps scan.
pub(crate) fn otpauth_uri(issuer: &str, account: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&digits={}&period={}",
        urlencoding::encode(issuer),
        urlencoding::encode(account),
        secret,
        urlencoding::encode(issuer),
        TOTP_DIGITS,
        TOTP_PERIOD_SECONDS
    )
}

fn limit_reached(body: &Value) -> ServiceError {
    let retry_after_ms = body
        .get("retryAfterMs")
        .and_then(Value::as_u64)
        .unwrap_or_default();
    ServiceError::BadRequest(format!(
        "Too many invalid attempts. Try again in {} seconds.",
        retry_after_ms.div_ceil(1000)
    ))
}

/// TOTP enrollment and verification over the SuperTokens core.
pub struct SuperTokensMfaProvider {
    client: SuperTokensClient,
    issuer: String,
}

impl SuperTokensMfaProvider {
    pub fn new(client: SuperTokensClient, issuer: impl Into<String>) -> Self {
        Self {
            client,
            issuer: issuer.into(),
        }
    }
}

#[async_trait]
impl MfaProvider for SuperTokensMfaProvider {
    async fn create_totp_device(
        &self,
        user_id: &str,
        device_name: &str,
    ) -> Result<TotpDevice, ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/totp/device",
                &json!({
                    "userId": user_id,
                    "deviceName": device_name,
                    "skew": TOTP_SKEW,
                    "period": TOTP_PERIOD_SECONDS,
                }),
            )
            .await?;
        match status_of(&body) {
            "OK" => {}
            "DEVICE_ALREADY_EXISTS_ERROR" => {
                return Err(ServiceError::Conflict(
                    "Device name already exists.".to_string(),
                ))
            }
            "UNKNOWN_USER_ID_ERROR" => {
                return Err(ServiceError::NotFound("User not found.".to_string()))
            }
            other => return Err(unexpected(other, &body)),
        }

        let secret = body
            .get("secret")
            .and_then(Value::as_str)
            .ok_or_else(|| unexpected("OK", &body))?
            .to_string();
        let device_name = body
            .get("deviceName")
            .and_then(Value::as_str)
            .unwrap_or(device_name)
            .to_string();

        tracing::info!(user_id = %user_id, device = %device_name, "TOTP device created");
        Ok(TotpDevice {
            qr_code: otpauth_uri(&self.issuer, user_id, &secret),
            device_name,
            secret,
        })
    }

    async fn verify_totp_device(
        &self,
        user_id: &str,
        device_name: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/totp/device/verify",
                &json!({ "userId": user_id, "deviceName": device_name, "totp": code }),
            )
            .await?;
        match status_of(&body) {
            "OK" => Ok(()),
            "INVALID_TOTP_ERROR" => Err(ServiceError::BadRequest("Invalid TOTP code.".to_string())),
            "UNKNOWN_DEVICE_ERROR" => Err(ServiceError::NotFound("Device not found.".to_string())),
            "LIMIT_REACHED_ERROR" => Err(limit_reached(&body)),
            other => Err(unexpected(other, &body)),
        }
    }

    async fn verify_code(&self, user_id: &str, code: &str) -> Result<(), ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/totp/verify",
                &json!({ "userId": user_id, "totp": code }),
            )
            .await?;
        match status_of(&body) {
            "OK" => Ok(()),
            "INVALID_TOTP_ERROR" => Err(ServiceError::BadRequest("Invalid TOTP code.".to_string())),
            "UNKNOWN_USER_ID_ERROR" => Err(ServiceError::NotFound(
                "No verified TOTP device found.".to_string(),
            )),
            "LIMIT_REACHED_ERROR" => Err(limit_reached(&body)),
            other => Err(unexpected(other, &body)),
        }
    }

    async fn remove_totp_device(
        &self,
        user_id: &str,
        device_name: &str,
    ) -> Result<bool, ServiceError> {
        let body = expect_ok(
            self.client
                .post(
                    "/recipe/totp/device/remove",
                    &json!({ "userId": user_id, "deviceName": device_name }),
                )
                .await?,
        )?;
        Ok(body
            .get("didDeviceExist")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn list_devices(&self, user_id: &str) -> Result<Vec<DeviceSummary>, ServiceError> {
        let body = self
            .client
            .get("/recipe/totp/device/list", &[("userId", user_id)])
            .await?;
        match status_of(&body) {
            "OK" => {}
            "UNKNOWN_USER_ID_ERROR" => return Ok(Vec::new()),
            other => return Err(unexpected(other, &body)),
        }

        let devices: Vec<CoreDevice> = body
            .get("devices")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        Ok(devices
            .into_iter()
            .map(|d| DeviceSummary {
                name: d.name,
                verified: d.verified,
            })
            .collect())
    }
}
