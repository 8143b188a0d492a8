use std::sync::Arc;

use futures::future::join_all;
use service_core::grpc::CallerMetadata;

use super::auth::reissue_session;
use super::notifier::Notifier;
use super::policy::PolicyService;
use super::provisioning::{
    existing_user_invite_saga, new_user_invite_saga, tenant_provisioning_saga,
    ExistingUserInvite, NewUserInvite, TenantProvisioning,
};
use super::ServiceError;
use crate::context::RequestContext;
use crate::middleware::{GuardOptions, SessionTrustGate};
use crate::models::{
    Action, InviteOutcome, PendingInvite, SessionTrustPayload, Tenant, TenantUsersPage,
    UpdateMeResult, User, UserUpdate, PUBLIC_TENANT_ID, SYSTEM_IAM_ENTITY,
};
use crate::providers::{AuthCoreProvider, IamProvider, RbacProvider, TenantBackend};
use crate::utils::{generate_random_token, generate_temporary_password};

const MAX_PAGE_SIZE: u32 = 100;

/// Fetch tenant summaries concurrently. Lookups that fail are logged and left out.
pub(crate) async fn tenant_summaries(
    tenants: &dyn TenantBackend,
    caller: &CallerMetadata,
    tenant_ids: &[String],
) -> Vec<Tenant> {
    let lookups = tenant_ids.iter().map(|id| async move {
        match tenants.get_tenant(caller, id).await {
            Ok(tenant) => Some(tenant),
            Err(e) => {
                tracing::warn!(tenant_id = %id, error = %e, "Skipping tenant summary");
                None
            }
        }
    });
    join_all(lookups).await.into_iter().flatten().collect()
}

#[derive(Clone)]
pub struct IamService {
    iam: Arc<dyn IamProvider>,
    auth: Arc<dyn AuthCoreProvider>,
    rbac: Arc<dyn RbacProvider>,
    tenants: Arc<dyn TenantBackend>,
    notifier: Arc<dyn Notifier>,
    gate: SessionTrustGate,
    frontend_url: String,
}

impl IamService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        iam: Arc<dyn IamProvider>,
        auth: Arc<dyn AuthCoreProvider>,
        rbac: Arc<dyn RbacProvider>,
        tenants: Arc<dyn TenantBackend>,
        notifier: Arc<dyn Notifier>,
        gate: SessionTrustGate,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            iam,
            auth,
            rbac,
            tenants,
            notifier,
            gate,
            frontend_url: frontend_url.into(),
        }
    }

    /// Provision a tenant owned by the caller, who becomes its admin.
    ///
    /// Any failure after the tenant record exists rolls back what was done and
    /// surfaces as `TenantCreationFailed`.
    pub async fn create_own_tenant(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Tenant, ServiceError> {
        let session = self.gate.admit(ctx, GuardOptions::STRICT)?;

        let saga = tenant_provisioning_saga(
            self.tenants.clone(),
            self.iam.clone(),
            self.rbac.clone(),
        );
        let mut state = TenantProvisioning::new(&session.user_id, name);

        if let Err(e) = saga.run(&mut state, &ctx.cancellation).await {
            tracing::error!(user_id = %session.user_id, error = %e, "Tenant creation failed");
            return Err(ServiceError::TenantCreationFailed(Box::new(e)));
        }

        let tenant = state
            .tenant
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("saga produced no tenant")))?;
        tracing::info!(user_id = %session.user_id, tenant_id = %tenant.id, "Tenant created");
        Ok(tenant)
    }

    /// Invite `email` into the caller's tenant with `role`.
    ///
    /// Existing users get a one-time join link. Unknown emails get an account
    /// with a temporary password, already joined and assigned.
    pub async fn invite_user(
        &self,
        ctx: &RequestContext,
        email: &str,
        role: &str,
    ) -> Result<InviteOutcome, ServiceError> {
        let session = self.gate.admit(ctx, GuardOptions::STRICT)?;
        let tenant_id = ctx.require_tenant()?;
        PolicyService::authorize(ctx.permissions(), SYSTEM_IAM_ENTITY, Action::Create)?;

        if let Some(user) = self.iam.get_user_by_email(email).await? {
            let token = generate_random_token();
            let mut state = ExistingUserInvite {
                link: format!("{}/auth/join-tenant?token={}", self.frontend_url, token),
                user_id: user.id.clone(),
                email: user.email,
                token,
                invite: PendingInvite::new(tenant_id, role, &session.user_id),
            };
            existing_user_invite_saga(self.iam.clone(), self.notifier.clone())
                .run(&mut state, &ctx.cancellation)
                .await?;

            tracing::info!(
                tenant_id = %tenant_id,
                user_id = %user.id,
                role = %role,
                "Pending invite sent"
            );
            return Ok(InviteOutcome::PendingInviteSent { user_id: user.id });
        }

        let mut state = NewUserInvite {
            email: email.to_string(),
            tenant_id: tenant_id.to_string(),
            role: role.to_string(),
            temporary_password: generate_temporary_password(),
            user: None,
        };
        new_user_invite_saga(
            self.iam.clone(),
            self.auth.clone(),
            self.rbac.clone(),
            self.notifier.clone(),
        )
        .run(&mut state, &ctx.cancellation)
        .await?;

        let user_id = state
            .user
            .map(|u| u.id)
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("saga produced no user")))?;
        tracing::info!(tenant_id = %tenant_id, user_id = %user_id, role = %role, "Invited user provisioned");
        Ok(InviteOutcome::UserProvisioned { user_id })
    }

    /// Redeem a join link. The token is consumed exactly once.
    pub async fn accept_invite(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> Result<PendingInvite, ServiceError> {
        let session = self.gate.admit(ctx, GuardOptions::STRICT)?;

        let invite = self
            .iam
            .consume_pending_invite(&session.user_id, token)
            .await?
            .ok_or_else(|| ServiceError::BadRequest("Invalid or expired invite token.".to_string()))?;

        self.iam
            .associate_user_to_tenant(&session.user_id, &invite.tenant_id)
            .await?;
        self.rbac
            .assign_role_to_user(&session.user_id, &invite.tenant_id, &invite.role_name)
            .await?;

        tracing::info!(
            user_id = %session.user_id,
            tenant_id = %invite.tenant_id,
            role = %invite.role_name,
            "Invite accepted"
        );
        Ok(invite)
    }

    /// The caller's own user record. Reachable while MFA setup or a password change is pending.
    pub async fn me(&self, ctx: &RequestContext) -> Result<User, ServiceError> {
        let options = GuardOptions::STRICT
            .without_mfa_verification()
            .allowing_mfa_setup()
            .allowing_password_change();
        self.gate
            .protect(ctx, options, |session| async move {
                self.iam
                    .get_user(&session.user_id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))
            })
            .await
    }

    /// Tenants the caller belongs to, for the tenant switcher.
    pub async fn my_tenants(&self, ctx: &RequestContext) -> Result<Vec<Tenant>, ServiceError> {
        let session = self.gate.admit(ctx, GuardOptions::STRICT)?;
        let user = self
            .iam
            .get_user(&session.user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))?;

        let tenant_ids: Vec<String> = user
            .tenant_ids
            .into_iter()
            .filter(|id| id != PUBLIC_TENANT_ID)
            .collect();
        Ok(tenant_summaries(self.tenants.as_ref(), &ctx.caller_metadata(), &tenant_ids).await)
    }

    pub async fn tenant_users(
        &self,
        ctx: &RequestContext,
        limit: u32,
        pagination_token: Option<&str>,
    ) -> Result<TenantUsersPage, ServiceError> {
        self.gate.admit(ctx, GuardOptions::STRICT)?;
        let tenant_id = ctx.require_tenant()?;
        PolicyService::authorize(ctx.permissions(), SYSTEM_IAM_ENTITY, Action::Read)?;

        self.iam
            .list_tenant_users(tenant_id, limit.clamp(1, MAX_PAGE_SIZE), pagination_token)
            .await
    }

    pub async fn update_tenant(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Tenant, ServiceError> {
        self.gate.admit(ctx, GuardOptions::STRICT)?;
        let tenant_id = ctx.require_tenant()?;
        PolicyService::authorize(ctx.permissions(), SYSTEM_IAM_ENTITY, Action::Update)?;

        let tenant = self
            .tenants
            .update_tenant(&ctx.caller_metadata(), tenant_id, name)
            .await?;
        tracing::info!(tenant_id = %tenant_id, "Tenant renamed");
        Ok(tenant)
    }

    /// Update the caller's profile and credentials.
    ///
    /// A password change needs the current password. It clears the
    /// password-change requirement and replaces the session.
    pub async fn update_me(
        &self,
        ctx: &RequestContext,
        update: UserUpdate,
        current_password: Option<&str>,
    ) -> Result<UpdateMeResult, ServiceError> {
        let session = self
            .gate
            .admit(ctx, GuardOptions::STRICT.allowing_password_change())?;

        let changing_password = update.password.is_some();
        if changing_password {
            let current_password = current_password.ok_or_else(|| {
                ServiceError::BadRequest(
                    "Current password is required to change password.".to_string(),
                )
            })?;
            let user = self
                .iam
                .get_user(&session.user_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))?;

            match self.auth.verify_credentials(&user.email, current_password).await {
                Ok(_) => {}
                Err(ServiceError::InvalidCredentials) => {
                    return Err(ServiceError::BadRequest(
                        "Current password is incorrect.".to_string(),
                    ))
                }
                Err(e) => return Err(e),
            }
        }

        let user = self.iam.update_user(&session.user_id, &update).await?;

        let mut tokens = None;
        if changing_password {
            self.auth
                .set_requires_password_change(&session.user_id, false)
                .await?;
            let payload = SessionTrustPayload {
                requires_password_change: false,
                ..session.payload
            };
            tokens = Some(reissue_session(self.auth.as_ref(), session, payload).await?);
            tracing::info!(user_id = %session.user_id, "Password changed");
        }

        Ok(UpdateMeResult { user, tokens })
    }
}
