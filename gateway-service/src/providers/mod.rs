//! Capability interfaces over the identity and resource backends.
//!
//! Services hold these as `Arc<dyn Trait>`; concrete adapters are chosen once
//! in `main` and never named elsewhere.

pub mod cache;
pub mod invites;
pub mod metadata;
pub mod rbac;
pub mod resource;
pub mod supertokens;

use async_trait::async_trait;

use crate::models::{
    DeviceSummary, IssuedSession, PendingInvite, RolePolicy, Session, SessionTrustPayload,
    TenantUsersPage, TotpDevice, User, UserUpdate,
};
use crate::services::ServiceError;

pub use cache::{InMemoryPolicyCache, PolicyCache, RedisPolicyCache};
pub use invites::MetadataInviteStore;
pub use metadata::{InMemoryMetadataStore, MetadataStore};
pub use rbac::MetadataRbacProvider;
pub use resource::{GrpcRecordBackend, GrpcTenantBackend, RecordBackend, TenantBackend};

/// Credentials, sessions and password lifecycle.
#[async_trait]
pub trait AuthCoreProvider: Send + Sync {
    /// Check an email/password pair. Fails with `InvalidCredentials`.
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, ServiceError>;

    async fn create_session(
        &self,
        user_id: &str,
        payload: &SessionTrustPayload,
    ) -> Result<IssuedSession, ServiceError>;

    /// Validate an access token and return its session.
    async fn verify_session(&self, access_token: &str) -> Result<Session, ServiceError>;

    /// Rotate a refresh token. Reuse of a rotated token yields `TokenTheftDetected`.
    async fn refresh_session(&self, refresh_token: &str) -> Result<IssuedSession, ServiceError>;

    async fn revoke_session(&self, session_handle: &str) -> Result<(), ServiceError>;

    async fn revoke_all_sessions(&self, user_id: &str) -> Result<(), ServiceError>;

    async fn create_password_reset_token(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<String, ServiceError>;

    /// Returns `false` when the token is unknown, expired or already used.
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<bool, ServiceError>;

    async fn get_requires_password_change(&self, user_id: &str) -> Result<bool, ServiceError>;

    async fn set_requires_password_change(
        &self,
        user_id: &str,
        required: bool,
    ) -> Result<(), ServiceError>;
}

/// Users, profiles, tenant membership and pending invites.
#[async_trait]
pub trait IamProvider: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ServiceError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    /// Fails with `Conflict` if the email is taken.
    async fn create_user(&self, email: &str, password: &str) -> Result<User, ServiceError>;

    /// Apply credential and profile changes. The password must already be verified.
    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<User, ServiceError>;

    /// Make a tenant known to the identity backend so users can join it.
    async fn register_tenant(&self, tenant_id: &str) -> Result<(), ServiceError>;

    async fn associate_user_to_tenant(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<(), ServiceError>;

    async fn disassociate_user_from_tenant(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<(), ServiceError>;

    /// Newest members first.
    async fn list_tenant_users(
        &self,
        tenant_id: &str,
        limit: u32,
        pagination_token: Option<&str>,
    ) -> Result<TenantUsersPage, ServiceError>;

    async fn add_pending_invite(
        &self,
        user_id: &str,
        token: &str,
        invite: &PendingInvite,
    ) -> Result<(), ServiceError>;

    /// Read and delete in one step. A second call with the same token returns `None`.
    async fn consume_pending_invite(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Option<PendingInvite>, ServiceError>;
}

/// Role assignments and per-tenant role policies.
#[async_trait]
pub trait RbacProvider: Send + Sync {
    async fn get_user_role_in_tenant(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Option<String>, ServiceError>;

    async fn assign_role_to_user(
        &self,
        user_id: &str,
        tenant_id: &str,
        role: &str,
    ) -> Result<(), ServiceError>;

    async fn remove_user_role(&self, user_id: &str, tenant_id: &str) -> Result<(), ServiceError>;

    async fn list_tenant_roles(&self, tenant_id: &str) -> Result<Vec<String>, ServiceError>;

    async fn get_role_policy(
        &self,
        tenant_id: &str,
        role: &str,
    ) -> Result<Option<RolePolicy>, ServiceError>;

    /// Visible to the writer as soon as this returns.
    async fn set_role_policy(
        &self,
        tenant_id: &str,
        role: &str,
        policy: &RolePolicy,
    ) -> Result<(), ServiceError>;

    async fn delete_role_policy(&self, tenant_id: &str, role: &str) -> Result<(), ServiceError>;
}

/// TOTP device enrollment and verification.
#[async_trait]
pub trait MfaProvider: Send + Sync {
    async fn create_totp_device(
        &self,
        user_id: &str,
        device_name: &str,
    ) -> Result<TotpDevice, ServiceError>;

    async fn verify_totp_device(
        &self,
        user_id: &str,
        device_name: &str,
        code: &str,
    ) -> Result<(), ServiceError>;

    async fn verify_code(&self, user_id: &str, code: &str) -> Result<(), ServiceError>;

    async fn remove_totp_device(&self, user_id: &str, device_name: &str)
        -> Result<bool, ServiceError>;

    async fn list_devices(&self, user_id: &str) -> Result<Vec<DeviceSummary>, ServiceError>;
}
