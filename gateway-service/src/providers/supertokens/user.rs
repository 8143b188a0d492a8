use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{User, UserProfile};
use crate::services::ServiceError;

/// Metadata field holding the user's profile.
pub(crate) const PROFILE_KEY: &str = "profile";

/// User object as returned by the core. Older cores send a single `email`,
/// newer ones an `emails` list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CoreUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub time_joined: i64,
    #[serde(default)]
    pub tenant_ids: Vec<String>,
}

impl CoreUser {
    pub fn from_body(body: &Value) -> Result<Self, ServiceError> {
        let user = body
            .get("user")
            .cloned()
            .ok_or_else(|| ServiceError::backend_status("OK", "response has no user"))?;
        Ok(serde_json::from_value(user)?)
    }

    pub fn into_user(self, profile: UserProfile) -> User {
        let email = self
            .email
            .or_else(|| self.emails.into_iter().next())
            .unwrap_or_default();
        User {
            id: self.id,
            email,
            time_joined: self.time_joined,
            tenant_ids: self.tenant_ids,
            profile,
        }
    }
}

pub(crate) fn profile_from_metadata(metadata: &Map<String, Value>) -> UserProfile {
    metadata
        .get(PROFILE_KEY)
        .cloned()
        .and_then(|raw| serde_json::from_value(raw).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_either_email_shape() {
        let legacy = CoreUser::from_body(&json!({
            "user": { "id": "u-1", "email": "a@example.com", "timeJoined": 5 }
        }))
        .unwrap()
        .into_user(UserProfile::default());
        assert_eq!(legacy.email, "a@example.com");

        let current = CoreUser::from_body(&json!({
            "user": { "id": "u-2", "emails": ["b@example.com"], "tenantIds": ["public", "t-1"] }
        }))
        .unwrap()
        .into_user(UserProfile::default());
        assert_eq!(current.email, "b@example.com");
        assert_eq!(current.tenant_ids, vec!["public", "t-1"]);
    }

    #[test]
    fn test_unreadable_profile_is_empty() {
        let metadata = json!({ "profile": "not an object" });
        assert!(profile_from_metadata(metadata.as_object().unwrap()).is_empty());
    }
}
