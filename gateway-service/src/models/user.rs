use serde::{Deserialize, Serialize};
use validator::Validate;

/// Optional profile fields kept in user metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Overlay every field that `update` sets.
    pub fn merge(&mut self, update: &UserProfile) {
        fn take(target: &mut Option<String>, source: &Option<String>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }
        take(&mut self.first_name, &update.first_name);
        take(&mut self.last_name, &update.last_name);
        take(&mut self.title, &update.title);
        take(&mut self.phone, &update.phone);
        take(&mut self.country_code, &update.country_code);
        take(&mut self.timezone, &update.timezone);
        take(&mut self.language, &update.language);
        take(&mut self.avatar, &update.avatar);
    }

    pub fn is_empty(&self) -> bool {
        *self == UserProfile::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    /// Milliseconds since the Unix epoch.
    pub time_joined: i64,
    #[serde(default)]
    pub tenant_ids: Vec<String>,
    #[serde(flatten)]
    pub profile: UserProfile,
}

/// Credential and profile changes applied by `update_user`.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUsersPage {
    pub users: Vec<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_pagination_token: Option<String>,
}
