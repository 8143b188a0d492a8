use std::sync::Arc;

use futures::future::try_join_all;

use super::policy::PolicyService;
use super::ServiceError;
use crate::context::RequestContext;
use crate::middleware::{GuardOptions, SessionTrustGate};
use crate::models::{is_system_role, Action, PermissionSet, Role, RolePolicy, SYSTEM_IAM_ENTITY};
use crate::providers::{IamProvider, RbacProvider};

/// Tenant-admin role, policy and membership management.
///
/// Every operation is gated and checked against `system_iam`. Policies of
/// system roles cannot be created, changed or deleted through here.
#[derive(Clone)]
pub struct RbacService {
    rbac: Arc<dyn RbacProvider>,
    iam: Arc<dyn IamProvider>,
    gate: SessionTrustGate,
}

fn protected_role(role: &str) -> ServiceError {
    ServiceError::BadRequest(format!(
        "The '{}' role is a protected system role and cannot be modified.",
        role
    ))
}

fn role_not_found(role: &str) -> ServiceError {
    ServiceError::NotFound(format!("Role '{}' not found.", role))
}

impl RbacService {
    pub fn new(
        rbac: Arc<dyn RbacProvider>,
        iam: Arc<dyn IamProvider>,
        gate: SessionTrustGate,
    ) -> Self {
        Self { rbac, iam, gate }
    }

    /// Gate, tenant header, then (for policy writes) the system-role check,
    /// then the `system_iam` permission.
    fn admit<'a>(
        &self,
        ctx: &'a RequestContext,
        action: Action,
        target_role: Option<&str>,
    ) -> Result<&'a str, ServiceError> {
        self.gate.admit(ctx, GuardOptions::STRICT)?;
        let tenant_id = ctx.require_tenant()?;
        if let Some(role) = target_role {
            if is_system_role(role) {
                return Err(protected_role(role));
            }
        }
        PolicyService::authorize(ctx.permissions(), SYSTEM_IAM_ENTITY, action)?;
        Ok(tenant_id)
    }

    pub async fn list_roles(&self, ctx: &RequestContext) -> Result<Vec<Role>, ServiceError> {
        let tenant_id = self.admit(ctx, Action::Read, None)?;

        let names = self.rbac.list_tenant_roles(tenant_id).await?;
        let policies = try_join_all(
            names
                .iter()
                .map(|name| self.rbac.get_role_policy(tenant_id, name)),
        )
        .await?;

        Ok(names
            .into_iter()
            .zip(policies)
            .map(|(name, policy)| Role { name, policy })
            .collect())
    }

    pub async fn get_role_policy(
        &self,
        ctx: &RequestContext,
        role: &str,
    ) -> Result<RolePolicy, ServiceError> {
        let tenant_id = self.admit(ctx, Action::Read, None)?;
        self.rbac
            .get_role_policy(tenant_id, role)
            .await?
            .ok_or_else(|| role_not_found(role))
    }

    /// The caller's resolved permissions for the active tenant. Not gated, so a
    /// client can render its UI before MFA or a password change is completed.
    pub fn my_permissions(&self, ctx: &RequestContext) -> PermissionSet {
        ctx.permissions().cloned().unwrap_or_default()
    }

    pub async fn create_policy(
        &self,
        ctx: &RequestContext,
        role: &str,
        policy: &RolePolicy,
    ) -> Result<(), ServiceError> {
        let tenant_id = self.admit(ctx, Action::Create, Some(role))?;

        if self.rbac.get_role_policy(tenant_id, role).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Role '{}' already exists.",
                role
            )));
        }
        self.rbac.set_role_policy(tenant_id, role, policy).await
    }

    pub async fn update_policy(
        &self,
        ctx: &RequestContext,
        role: &str,
        policy: &RolePolicy,
    ) -> Result<(), ServiceError> {
        let tenant_id = self.admit(ctx, Action::Update, Some(role))?;

        if self.rbac.get_role_policy(tenant_id, role).await?.is_none() {
            return Err(role_not_found(role));
        }
        self.rbac.set_role_policy(tenant_id, role, policy).await
    }

    pub async fn delete_policy(&self, ctx: &RequestContext, role: &str) -> Result<(), ServiceError> {
        let tenant_id = self.admit(ctx, Action::Delete, Some(role))?;
        self.rbac.delete_role_policy(tenant_id, role).await
    }

    /// Give a tenant member a role that exists in the tenant.
    pub async fn assign_role(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        role: &str,
    ) -> Result<(), ServiceError> {
        let tenant_id = self.admit(ctx, Action::Update, None)?;

        if self.rbac.get_role_policy(tenant_id, role).await?.is_none() {
            return Err(role_not_found(role));
        }
        let user = self
            .iam
            .get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))?;
        if !user.tenant_ids.iter().any(|t| t == tenant_id) {
            return Err(ServiceError::NotFound(
                "User is not a member of this tenant.".to_string(),
            ));
        }

        self.rbac.assign_role_to_user(user_id, tenant_id, role).await
    }

    pub async fn remove_user_from_tenant(
        &self,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<(), ServiceError> {
        let tenant_id = self.admit(ctx, Action::Delete, None)?;

        self.iam
            .disassociate_user_from_tenant(user_id, tenant_id)
            .await?;
        self.rbac.remove_user_role(user_id, tenant_id).await?;

        tracing::info!(user_id = %user_id, tenant_id = %tenant_id, "User removed from tenant");
        Ok(())
    }
}
