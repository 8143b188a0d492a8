//! SuperTokens core adapters.
//!
//! One adapter per capability trait, all sharing a single [`SuperTokensClient`]
//! that talks to the core's REST API. User metadata doubles as the policy store.

mod auth_core;
mod client;
mod iam;
mod metadata;
mod mfa;
mod user;

use std::time::Duration;

pub use self::auth_core::SuperTokensAuthCore;
pub use self::client::SuperTokensClient;
pub use self::iam::SuperTokensIamProvider;
pub use self::metadata::SuperTokensMetadataStore;
pub use self::mfa::SuperTokensMfaProvider;

/// Metadata field holding the "must change password" flag.
pub(crate) const REQUIRES_PASSWORD_CHANGE_KEY: &str = "requires_password_change";

#[derive(Debug, Clone)]
pub struct SuperTokensConfig {
    pub connection_uri: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for SuperTokensConfig {
    fn default() -> Self {
        Self {
            connection_uri: "http://localhost:3567".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}
