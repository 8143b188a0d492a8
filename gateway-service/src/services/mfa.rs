use std::sync::Arc;

use super::auth::reissue_session;
use super::ServiceError;
use crate::context::RequestContext;
use crate::middleware::{GuardOptions, SessionTrustGate};
use crate::models::{DeviceSummary, MfaVerification, SessionTokens, SessionTrustPayload, TotpDevice};
use crate::providers::{AuthCoreProvider, MfaProvider};

/// Enrollment must stay reachable for users who are blocked on MFA setup or
/// on a pending password change.
const ENROLLMENT: GuardOptions = GuardOptions::STRICT
    .allowing_mfa_setup()
    .allowing_password_change();

#[derive(Clone)]
pub struct MfaService {
    mfa: Arc<dyn MfaProvider>,
    auth: Arc<dyn AuthCoreProvider>,
    gate: SessionTrustGate,
}

fn verified(tokens: SessionTokens) -> MfaVerification {
    MfaVerification {
        verified: true,
        access_token: Some(tokens.access_token),
        refresh_token: Some(tokens.refresh_token),
    }
}

impl MfaService {
    pub fn new(
        mfa: Arc<dyn MfaProvider>,
        auth: Arc<dyn AuthCoreProvider>,
        gate: SessionTrustGate,
    ) -> Self {
        Self { mfa, auth, gate }
    }

    pub async fn create_totp_device(
        &self,
        ctx: &RequestContext,
        device_name: &str,
    ) -> Result<TotpDevice, ServiceError> {
        self.gate
            .protect(ctx, ENROLLMENT, |session| {
                self.mfa.create_totp_device(&session.user_id, device_name)
            })
            .await
    }

    /// Confirm a new device. The replacement session is enabled and verified.
    pub async fn verify_totp_device(
        &self,
        ctx: &RequestContext,
        device_name: &str,
        code: &str,
    ) -> Result<MfaVerification, ServiceError> {
        let session = self.gate.admit(ctx, ENROLLMENT)?;
        self.mfa
            .verify_totp_device(&session.user_id, device_name, code)
            .await?;

        let payload = SessionTrustPayload {
            mfa_enabled: true,
            mfa_verified: true,
            ..session.payload
        };
        let tokens = reissue_session(self.auth.as_ref(), session, payload).await?;
        tracing::info!(user_id = %session.user_id, device = %device_name, "TOTP device verified");
        Ok(verified(tokens))
    }

    /// Step up the current session with a code from any verified device.
    pub async fn verify_mfa(
        &self,
        ctx: &RequestContext,
        code: &str,
    ) -> Result<MfaVerification, ServiceError> {
        let options = GuardOptions::STRICT
            .without_mfa_verification()
            .allowing_password_change();
        let session = self.gate.admit(ctx, options)?;
        self.mfa.verify_code(&session.user_id, code).await?;

        let payload = SessionTrustPayload {
            mfa_verified: true,
            ..session.payload
        };
        let tokens = reissue_session(self.auth.as_ref(), session, payload).await?;
        tracing::info!(user_id = %session.user_id, "MFA verified");
        Ok(verified(tokens))
    }

    /// Remove a device. The replacement session reflects whether a verified
    /// device remains.
    pub async fn remove_totp_device(
        &self,
        ctx: &RequestContext,
        device_name: &str,
    ) -> Result<MfaVerification, ServiceError> {
        let session = self.gate.admit(ctx, GuardOptions::STRICT)?;

        if !self
            .mfa
            .remove_totp_device(&session.user_id, device_name)
            .await?
        {
            return Err(ServiceError::NotFound("Device not found.".to_string()));
        }

        let has_remaining = self
            .mfa
            .list_devices(&session.user_id)
            .await?
            .iter()
            .any(|d| d.verified);
        let payload = SessionTrustPayload {
            mfa_enabled: has_remaining,
            mfa_verified: has_remaining,
            ..session.payload
        };
        let tokens = reissue_session(self.auth.as_ref(), session, payload).await?;

        tracing::info!(
            user_id = %session.user_id,
            device = %device_name,
            has_remaining,
            "TOTP device removed"
        );
        Ok(MfaVerification {
            verified: has_remaining,
            access_token: Some(tokens.access_token),
            refresh_token: Some(tokens.refresh_token),
        })
    }

    pub async fn list_totp_devices(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<DeviceSummary>, ServiceError> {
        self.gate
            .protect(ctx, ENROLLMENT, |session| {
                self.mfa.list_devices(&session.user_id)
            })
            .await
    }
}
