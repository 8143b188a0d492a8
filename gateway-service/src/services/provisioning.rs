//! Saga steps for tenant provisioning and invitations.

use std::sync::Arc;

use async_trait::async_trait;
use service_core::grpc::CallerMetadata;

use super::notifier::Notifier;
use super::saga::{Saga, SagaStep};
use super::ServiceError;
use crate::models::{PendingInvite, RolePolicy, Tenant, User, ADMIN_ROLE};
use crate::providers::{AuthCoreProvider, IamProvider, RbacProvider, TenantBackend};

fn missing(what: &str) -> ServiceError {
    ServiceError::Internal(anyhow::anyhow!("{} not set by an earlier step", what))
}

// ---------------------------------------------------------------------------
// Tenant provisioning
// ---------------------------------------------------------------------------

pub struct TenantProvisioning {
    pub creator_id: String,
    pub name: String,
    pub caller: CallerMetadata,
    pub tenant: Option<Tenant>,
}

impl TenantProvisioning {
    pub fn new(creator_id: &str, name: &str) -> Self {
        Self {
            creator_id: creator_id.to_string(),
            name: name.to_string(),
            caller: CallerMetadata::for_user(creator_id),
            tenant: None,
        }
    }

    fn tenant_id(&self) -> Result<&str, ServiceError> {
        self.tenant
            .as_ref()
            .map(|t| t.id.as_str())
            .ok_or_else(|| missing("tenant"))
    }
}

struct CreateTenantRecord(Arc<dyn TenantBackend>);

#[async_trait]
impl SagaStep<TenantProvisioning> for CreateTenantRecord {
    fn name(&self) -> &'static str {
        "create_tenant_record"
    }

    // The new tenant's id only arrives in the response.
    fn cancellable(&self) -> bool {
        false
    }

    async fn execute(&self, state: &mut TenantProvisioning) -> Result<(), ServiceError> {
        let tenant = self.0.create_tenant(&state.caller, &state.name).await?;
        state.tenant = Some(tenant);
        Ok(())
    }

    async fn compensate(&self, state: &TenantProvisioning) -> Result<(), ServiceError> {
        let tenant_id = state.tenant_id()?;
        if !self.0.delete_tenant(&state.caller, tenant_id).await? {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "resource backend did not delete tenant {}",
                tenant_id
            )));
        }
        Ok(())
    }
}

struct RegisterIdentityTenant(Arc<dyn IamProvider>);

#[async_trait]
impl SagaStep<TenantProvisioning> for RegisterIdentityTenant {
    fn name(&self) -> &'static str {
        "register_identity_tenant"
    }

    async fn execute(&self, state: &mut TenantProvisioning) -> Result<(), ServiceError> {
        self.0.register_tenant(state.tenant_id()?).await
    }
}

struct AssociateCreator(Arc<dyn IamProvider>);

#[async_trait]
impl SagaStep<TenantProvisioning> for AssociateCreator {
    fn name(&self) -> &'static str {
        "associate_creator"
    }

    async fn execute(&self, state: &mut TenantProvisioning) -> Result<(), ServiceError> {
        self.0
            .associate_user_to_tenant(&state.creator_id, state.tenant_id()?)
            .await
    }

    async fn compensate(&self, state: &TenantProvisioning) -> Result<(), ServiceError> {
        self.0
            .disassociate_user_from_tenant(&state.creator_id, state.tenant_id()?)
            .await
    }
}

struct SeedAdminPolicy(Arc<dyn RbacProvider>);

#[async_trait]
impl SagaStep<TenantProvisioning> for SeedAdminPolicy {
    fn name(&self) -> &'static str {
        "seed_admin_policy"
    }

    async fn execute(&self, state: &mut TenantProvisioning) -> Result<(), ServiceError> {
        self.0
            .set_role_policy(state.tenant_id()?, ADMIN_ROLE, &RolePolicy::root_admin())
            .await
    }

    async fn compensate(&self, state: &TenantProvisioning) -> Result<(), ServiceError> {
        self.0
            .delete_role_policy(state.tenant_id()?, ADMIN_ROLE)
            .await
    }
}

struct AssignAdminRole(Arc<dyn RbacProvider>);

#[async_trait]
impl SagaStep<TenantProvisioning> for AssignAdminRole {
    fn name(&self) -> &'static str {
        "assign_admin_role"
    }

    async fn execute(&self, state: &mut TenantProvisioning) -> Result<(), ServiceError> {
        self.0
            .assign_role_to_user(&state.creator_id, state.tenant_id()?, ADMIN_ROLE)
            .await
    }

    async fn compensate(&self, state: &TenantProvisioning) -> Result<(), ServiceError> {
        self.0
            .remove_user_role(&state.creator_id, state.tenant_id()?)
            .await
    }
}

pub fn tenant_provisioning_saga(
    tenants: Arc<dyn TenantBackend>,
    iam: Arc<dyn IamProvider>,
    rbac: Arc<dyn RbacProvider>,
) -> Saga<TenantProvisioning> {
    Saga::new("tenant_provisioning")
        .step(CreateTenantRecord(tenants))
        .step(RegisterIdentityTenant(iam.clone()))
        .step(AssociateCreator(iam))
        .step(SeedAdminPolicy(rbac.clone()))
        .step(AssignAdminRole(rbac))
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

pub struct ExistingUserInvite {
    pub user_id: String,
    pub email: String,
    pub token: String,
    pub link: String,
    pub invite: PendingInvite,
}

struct StorePendingInvite(Arc<dyn IamProvider>);

#[async_trait]
impl SagaStep<ExistingUserInvite> for StorePendingInvite {
    fn name(&self) -> &'static str {
        "store_pending_invite"
    }

    async fn execute(&self, state: &mut ExistingUserInvite) -> Result<(), ServiceError> {
        self.0
            .add_pending_invite(&state.user_id, &state.token, &state.invite)
            .await
    }

    async fn compensate(&self, state: &ExistingUserInvite) -> Result<(), ServiceError> {
        self.0
            .consume_pending_invite(&state.user_id, &state.token)
            .await
            .map(|_| ())
    }
}

struct DeliverInviteLink(Arc<dyn Notifier>);

#[async_trait]
impl SagaStep<ExistingUserInvite> for DeliverInviteLink {
    fn name(&self) -> &'static str {
        "deliver_invite_link"
    }

    async fn execute(&self, state: &mut ExistingUserInvite) -> Result<(), ServiceError> {
        self.0.send_invite(&state.email, &state.link).await
    }
}

pub fn existing_user_invite_saga(
    iam: Arc<dyn IamProvider>,
    notifier: Arc<dyn Notifier>,
) -> Saga<ExistingUserInvite> {
    Saga::new("invite_existing_user")
        .step(StorePendingInvite(iam))
        .step(DeliverInviteLink(notifier))
}

pub struct NewUserInvite {
    pub email: String,
    pub tenant_id: String,
    pub role: String,
    pub temporary_password: String,
    pub user: Option<User>,
}

impl NewUserInvite {
    fn user_id(&self) -> Result<&str, ServiceError> {
        self.user
            .as_ref()
            .map(|u| u.id.as_str())
            .ok_or_else(|| missing("invited user"))
    }
}

struct CreateInvitedUser(Arc<dyn IamProvider>);

#[async_trait]
impl SagaStep<NewUserInvite> for CreateInvitedUser {
    fn name(&self) -> &'static str {
        "create_invited_user"
    }

    async fn execute(&self, state: &mut NewUserInvite) -> Result<(), ServiceError> {
        let user = self
            .0
            .create_user(&state.email, &state.temporary_password)
            .await?;
        state.user = Some(user);
        Ok(())
    }
}

struct RequirePasswordChange(Arc<dyn AuthCoreProvider>);

#[async_trait]
impl SagaStep<NewUserInvite> for RequirePasswordChange {
    fn name(&self) -> &'static str {
        "require_password_change"
    }

    async fn execute(&self, state: &mut NewUserInvite) -> Result<(), ServiceError> {
        self.0
            .set_requires_password_change(state.user_id()?, true)
            .await
    }
}

struct JoinInvitedTenant(Arc<dyn IamProvider>);

#[async_trait]
impl SagaStep<NewUserInvite> for JoinInvitedTenant {
    fn name(&self) -> &'static str {
        "join_invited_tenant"
    }

    async fn execute(&self, state: &mut NewUserInvite) -> Result<(), ServiceError> {
        self.0
            .associate_user_to_tenant(state.user_id()?, &state.tenant_id)
            .await
    }

    async fn compensate(&self, state: &NewUserInvite) -> Result<(), ServiceError> {
        self.0
            .disassociate_user_from_tenant(state.user_id()?, &state.tenant_id)
            .await
    }
}

struct AssignInvitedRole(Arc<dyn RbacProvider>);

#[async_trait]
impl SagaStep<NewUserInvite> for AssignInvitedRole {
    fn name(&self) -> &'static str {
        "assign_invited_role"
    }

    async fn execute(&self, state: &mut NewUserInvite) -> Result<(), ServiceError> {
        self.0
            .assign_role_to_user(state.user_id()?, &state.tenant_id, &state.role)
            .await
    }

    async fn compensate(&self, state: &NewUserInvite) -> Result<(), ServiceError> {
        self.0
            .remove_user_role(state.user_id()?, &state.tenant_id)
            .await
    }
}

struct DeliverTemporaryCredentials(Arc<dyn Notifier>);

#[async_trait]
impl SagaStep<NewUserInvite> for DeliverTemporaryCredentials {
    fn name(&self) -> &'static str {
        "deliver_temporary_credentials"
    }

    async fn execute(&self, state: &mut NewUserInvite) -> Result<(), ServiceError> {
        self.0
            .send_temporary_credentials(&state.email, &state.temporary_password)
            .await
    }
}

pub fn new_user_invite_saga(
    iam: Arc<dyn IamProvider>,
    auth: Arc<dyn AuthCoreProvider>,
    rbac: Arc<dyn RbacProvider>,
    notifier: Arc<dyn Notifier>,
) -> Saga<NewUserInvite> {
    Saga::new("invite_new_user")
        .step(CreateInvitedUser(iam.clone()))
        .step(RequirePasswordChange(auth))
        .step(JoinInvitedTenant(iam))
        .step(AssignInvitedRole(rbac))
        .step(DeliverTemporaryCredentials(notifier))
}
