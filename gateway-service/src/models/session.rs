use serde::{Deserialize, Serialize};

/// Trust flags carried inside every issued access token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionTrustPayload {
    pub mfa_enforced: bool,
    pub mfa_enabled: bool,
    pub mfa_verified: bool,
    pub requires_password_change: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// A verified session as seen by request handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub handle: String,
    pub payload: SessionTrustPayload,
}

/// A freshly minted (or refreshed) session and its tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub session: Session,
    pub tokens: SessionTokens,
}
