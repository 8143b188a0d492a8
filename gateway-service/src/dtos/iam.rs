use serde::Deserialize;
use validator::Validate;

use crate::models::{UserProfile, UserUpdate};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 200, message = "Tenant name must not be empty"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 200, message = "Tenant name must not be empty"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Role name is required"))]
    pub role_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AcceptInviteRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TenantUsersQuery {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub pagination_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    pub current_password: Option<String>,

    #[serde(flatten)]
    #[validate(nested)]
    pub profile: UserProfile,
}

impl UpdateMeRequest {
    pub fn into_parts(self) -> (UserUpdate, Option<String>) {
        (
            UserUpdate {
                email: self.email,
                password: self.password,
                profile: self.profile,
            },
            self.current_password,
        )
    }
}
