use serde::Deserialize;
use validator::Validate;

use crate::models::RolePolicy;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRequest {
    #[validate(length(min = 1, max = 100, message = "Role name must not be empty"))]
    pub role_name: String,
    pub policy: RolePolicy,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    #[validate(length(min = 1, message = "User ID is required"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "Role name is required"))]
    pub role_name: String,
}
