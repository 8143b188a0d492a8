use serde::Serialize;

use super::{PermissionSet, SessionTokens, Tenant, User};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub user: User,
    pub tenant: Option<Tenant>,
    pub available_tenants: Vec<Tenant>,
    pub tokens: SessionTokens,
    pub role: Option<String>,
    pub permissions: Option<PermissionSet>,
    pub requires_password_change: bool,
    pub requires_mfa: bool,
    pub mfa_enforced: bool,
    pub mfa_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResult {
    pub user: User,
    pub tokens: SessionTokens,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeResult {
    pub user: User,
    /// Replacement tokens, present when the password was changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<SessionTokens>,
}
