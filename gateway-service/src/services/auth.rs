use std::sync::Arc;

use service_core::grpc::CallerMetadata;

use super::iam::tenant_summaries;
use super::notifier::Notifier;
use super::ServiceError;
use crate::context::RequestContext;
use crate::middleware::{GuardOptions, SessionTrustGate};
use crate::models::{
    LoginResult, RegisterResult, Session, SessionTokens, SessionTrustPayload, UserProfile,
    UserUpdate, PUBLIC_TENANT_ID,
};
use crate::providers::{AuthCoreProvider, IamProvider, MfaProvider, RbacProvider, TenantBackend};

/// Mint a session carrying `payload` and revoke the one it replaces.
///
/// A failed revoke is logged: the old session keeps its weaker payload, so
/// it cannot be used to skip a gate the new one passes.
pub(crate) async fn reissue_session(
    auth: &dyn AuthCoreProvider,
    current: &Session,
    payload: SessionTrustPayload,
) -> Result<SessionTokens, ServiceError> {
    let issued = auth.create_session(&current.user_id, &payload).await?;
    if let Err(e) = auth.revoke_session(&current.handle).await {
        tracing::warn!(
            user_id = %current.user_id,
            error = %e,
            "Failed to revoke replaced session"
        );
    }
    Ok(issued.tokens)
}

#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthCoreProvider>,
    iam: Arc<dyn IamProvider>,
    rbac: Arc<dyn RbacProvider>,
    mfa: Arc<dyn MfaProvider>,
    tenants: Arc<dyn TenantBackend>,
    notifier: Arc<dyn Notifier>,
    gate: SessionTrustGate,
    frontend_url: String,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth: Arc<dyn AuthCoreProvider>,
        iam: Arc<dyn IamProvider>,
        rbac: Arc<dyn RbacProvider>,
        mfa: Arc<dyn MfaProvider>,
        tenants: Arc<dyn TenantBackend>,
        notifier: Arc<dyn Notifier>,
        gate: SessionTrustGate,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            iam,
            rbac,
            mfa,
            tenants,
            notifier,
            gate,
            frontend_url: frontend_url.into(),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, ServiceError> {
        let user = self.auth.verify_credentials(email, password).await?;

        let tenant_ids: Vec<String> = user
            .tenant_ids
            .iter()
            .filter(|id| id.as_str() != PUBLIC_TENANT_ID)
            .cloned()
            .collect();
        let active_tenant_id = tenant_ids.first().cloned();

        let caller = CallerMetadata::new(active_tenant_id.clone(), Some(user.id.clone()));
        let available_tenants = tenant_summaries(self.tenants.as_ref(), &caller, &tenant_ids).await;
        let tenant = active_tenant_id
            .as_deref()
            .and_then(|id| available_tenants.iter().find(|t| t.id == id).cloned());

        let mut role = None;
        let mut policy = None;
        if let Some(tenant_id) = active_tenant_id.as_deref() {
            role = self.rbac.get_user_role_in_tenant(&user.id, tenant_id).await?;
            if let Some(role) = role.as_deref() {
                policy = self.rbac.get_role_policy(tenant_id, role).await?;
            }
        }
        let mfa_enforced = policy.as_ref().is_some_and(|p| p.requires_mfa());

        let mfa_enabled = self
            .mfa
            .list_devices(&user.id)
            .await?
            .iter()
            .any(|d| d.verified);
        let requires_password_change = self.auth.get_requires_password_change(&user.id).await?;

        let payload = SessionTrustPayload {
            mfa_enforced,
            mfa_enabled,
            mfa_verified: false,
            requires_password_change,
        };
        let issued = self.auth.create_session(&user.id, &payload).await?;

        tracing::info!(
            user_id = %user.id,
            tenant_id = ?active_tenant_id,
            role = ?role,
            "User logged in"
        );

        Ok(LoginResult {
            user,
            tenant,
            available_tenants,
            tokens: issued.tokens,
            role,
            permissions: policy.map(|p| p.permissions),
            requires_password_change,
            requires_mfa: mfa_enforced || self.gate.global_mfa_enforced() || mfa_enabled,
            mfa_enforced,
            mfa_enabled,
        })
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<RegisterResult, ServiceError> {
        let mut user = self.iam.create_user(email, password).await?;

        let profile = UserProfile {
            first_name,
            last_name,
            ..Default::default()
        };
        if !profile.is_empty() {
            let update = UserUpdate {
                profile,
                ..Default::default()
            };
            user = self.iam.update_user(&user.id, &update).await?;
        }

        let issued = self
            .auth
            .create_session(&user.id, &SessionTrustPayload::default())
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(RegisterResult {
            user,
            tokens: issued.tokens,
        })
    }

    pub async fn verify_session(&self, access_token: &str) -> Result<Session, ServiceError> {
        self.auth.verify_session(access_token).await
    }

    /// Rotate tokens. Reuse of an old refresh token revokes every session of the user.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, ServiceError> {
        match self.auth.refresh_session(refresh_token).await {
            Ok(issued) => Ok(issued.tokens),
            Err(ServiceError::TokenTheftDetected { user_id }) => {
                tracing::warn!(user_id = %user_id, "Token theft detected, revoking all sessions");
                if !user_id.is_empty() {
                    if let Err(e) = self.auth.revoke_all_sessions(&user_id).await {
                        tracing::error!(
                            user_id = %user_id,
                            error = %e,
                            critical = true,
                            "Failed to revoke sessions after token theft"
                        );
                    }
                }
                Err(ServiceError::TokenTheftDetected { user_id })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn logout(&self, ctx: &RequestContext) -> Result<(), ServiceError> {
        let options = GuardOptions::STRICT
            .without_mfa_verification()
            .allowing_mfa_setup();
        self.gate
            .protect(ctx, options, |session| async move {
                self.auth.revoke_all_sessions(&session.user_id).await?;
                tracing::info!(user_id = %session.user_id, "User logged out");
                Ok(())
            })
            .await
    }

    /// Succeeds whether or not the email is registered.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), ServiceError> {
        if let Err(e) = self.deliver_password_reset(email).await {
            tracing::warn!(error = %e, "Password reset request could not be completed");
        }
        Ok(())
    }

    async fn deliver_password_reset(&self, email: &str) -> Result<(), ServiceError> {
        let Some(user) = self.iam.get_user_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = self
            .auth
            .create_password_reset_token(&user.id, &user.email)
            .await?;
        let link = format!("{}/auth/reset-password?token={}", self.frontend_url, token);
        self.notifier.send_password_reset(&user.email, &link).await?;

        tracing::info!(user_id = %user.id, "Password reset link issued");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ServiceError> {
        if !self.auth.reset_password(token, new_password).await? {
            return Err(ServiceError::BadRequest(
                "Invalid or expired password reset token.".to_string(),
            ));
        }
        Ok(())
    }
}
