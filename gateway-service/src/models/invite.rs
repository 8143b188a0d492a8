use serde::{Deserialize, Serialize};

/// A not-yet-accepted invitation for an existing user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvite {
    pub tenant_id: String,
    pub role_name: String,
    pub invited_by: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl PendingInvite {
    pub fn new(tenant_id: &str, role_name: &str, invited_by: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            role_name: role_name.to_string(),
            invited_by: invited_by.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// What `invite_user` did for the invited email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InviteOutcome {
    /// The user already existed; a one-time join link was sent.
    PendingInviteSent { user_id: String },
    /// A new account was created with temporary credentials and joined immediately.
    UserProvisioned { user_id: String },
}
