use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{json, Map, Value};
use tracing::instrument;

use super::client::{expect_ok, is_ok, status_of, unexpected, SuperTokensClient};
use super::user::{profile_from_metadata, CoreUser, PROFILE_KEY};
use crate::models::{PendingInvite, TenantUsersPage, User, UserUpdate};
use crate::providers::{IamProvider, MetadataInviteStore, MetadataStore};
use crate::services::ServiceError;

/// Sign-in methods enabled on every tenant this gateway registers.
const TENANT_FIRST_FACTORS: [&str; 2] = ["emailpassword", "thirdparty"];

pub struct SuperTokensIamProvider {
    client: SuperTokensClient,
    metadata: Arc<dyn MetadataStore>,
    invites: MetadataInviteStore,
}

impl SuperTokensIamProvider {
    pub fn new(client: SuperTokensClient, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            client,
            invites: MetadataInviteStore::new(metadata.clone()),
            metadata,
        }
    }

    async fn with_profile(&self, user: CoreUser) -> Result<User, ServiceError> {
        let metadata = self.metadata.get(&user.id).await?;
        Ok(user.into_user(profile_from_metadata(&metadata)))
    }

    async fn update_credentials(
        &self,
        user_id: &str,
        update: &UserUpdate,
    ) -> Result<(), ServiceError> {
        let mut body = Map::new();
        body.insert("recipeUserId".to_string(), Value::from(user_id));
        if let Some(email) = &update.email {
            body.insert("email".to_string(), Value::from(email.as_str()));
        }
        if let Some(password) = &update.password {
            body.insert("password".to_string(), Value::from(password.as_str()));
        }

        let response = self.client.put("/recipe/user", &body).await?;
        match status_of(&response) {
            "OK" => Ok(()),
            "UNKNOWN_USER_ID_ERROR" => Err(ServiceError::NotFound("User not found.".to_string())),
            "EMAIL_ALREADY_EXISTS_ERROR" => Err(ServiceError::Conflict(
                "User with this email already exists.".to_string(),
            )),
            "PASSWORD_POLICY_VIOLATED_ERROR" => Err(ServiceError::BadRequest(
                response
                    .get("failureReason")
                    .and_then(Value::as_str)
                    .unwrap_or("Password does not meet the password policy.")
                    .to_string(),
            )),
            "EMAIL_CHANGE_NOT_ALLOWED_ERROR" => Err(ServiceError::BadRequest(
                "Email change is not allowed for this account.".to_string(),
            )),
            other => Err(unexpected(other, &response)),
        }
    }
}

#[async_trait]
impl IamProvider for SuperTokensIamProvider {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ServiceError> {
        let body = self.client.get("/user/id", &[("userId", user_id)]).await?;
        match status_of(&body) {
            "OK" => {}
            "UNKNOWN_USER_ID_ERROR" => return Ok(None),
            other => return Err(unexpected(other, &body)),
        }
        let user = CoreUser::from_body(&body)?;
        Ok(Some(self.with_profile(user).await?))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let body = expect_ok(
            self.client
                .get("/users/by-accountinfo", &[("email", email)])
                .await?,
        )?;
        let first = body
            .get("users")
            .and_then(Value::as_array)
            .and_then(|users| users.first())
            .cloned();

        match first {
            Some(raw) => {
                let user: CoreUser = serde_json::from_value(raw)?;
                Ok(Some(self.with_profile(user).await?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, password))]
    async fn create_user(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let body = self
            .client
            .post(
                "/recipe/signup",
                &json!({ "email": email, "password": password }),
            )
            .await?;
        match status_of(&body) {
            "OK" => {}
            "EMAIL_ALREADY_EXISTS_ERROR" => {
                return Err(ServiceError::Conflict(
                    "User with this email already exists.".to_string(),
                ))
            }
            other => return Err(unexpected(other, &body)),
        }

        let user = CoreUser::from_body(&body)?.into_user(Default::default());
        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    #[instrument(skip(self, update))]
    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<User, ServiceError> {
        if update.email.is_some() || update.password.is_some() {
            self.update_credentials(user_id, update).await?;
        }

        if !update.profile.is_empty() {
            let metadata = self.metadata.get(user_id).await?;
            let mut profile = profile_from_metadata(&metadata);
            profile.merge(&update.profile);

            let mut patch = Map::new();
            patch.insert(PROFILE_KEY.to_string(), serde_json::to_value(&profile)?);
            self.metadata.merge(user_id, patch).await?;
        }

        self.get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))
    }

    async fn register_tenant(&self, tenant_id: &str) -> Result<(), ServiceError> {
        let body = self
            .client
            .put(
                "/recipe/multitenancy/tenant/v2",
                &json!({ "tenantId": tenant_id, "firstFactors": TENANT_FIRST_FACTORS }),
            )
            .await?;
        expect_ok(body)?;
        tracing::info!(tenant_id = %tenant_id, "Tenant registered with identity backend");
        Ok(())
    }

    async fn associate_user_to_tenant(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<(), ServiceError> {
        let path = format!("/{}/recipe/multitenancy/tenant/user", tenant_id);
        let body = self
            .client
            .post(&path, &json!({ "recipeUserId": user_id }))
            .await?;
        match status_of(&body) {
            "OK" => Ok(()),
            "UNKNOWN_USER_ID_ERROR" => Err(ServiceError::NotFound("User not found.".to_string())),
            "TENANT_NOT_FOUND_ERROR" => {
                Err(ServiceError::NotFound("Tenant not found.".to_string()))
            }
            "EMAIL_ALREADY_EXISTS_ERROR" | "ASSOCIATION_NOT_ALLOWED_ERROR" => {
                Err(ServiceError::Conflict(format!(
                    "User cannot be added to tenant {}.",
                    tenant_id
                )))
            }
            other => Err(unexpected(other, &body)),
        }
    }

    async fn disassociate_user_from_tenant(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<(), ServiceError> {
        let path = format!("/{}/recipe/multitenancy/tenant/user/remove", tenant_id);
        let body = self
            .client
            .post(&path, &json!({ "recipeUserId": user_id }))
            .await?;
        expect_ok(body)?;
        Ok(())
    }

    async fn list_tenant_users(
        &self,
        tenant_id: &str,
        limit: u32,
        pagination_token: Option<&str>,
    ) -> Result<TenantUsersPage, ServiceError> {
        let path = format!("/{}/users", tenant_id);
        let limit = limit.to_string();
        let mut query = vec![("limit", limit.as_str()), ("timeJoinedOrder", "DESC")];
        if let Some(token) = pagination_token {
            query.push(("paginationToken", token));
        }

        let body = self.client.get(&path, &query).await?;
        if !is_ok(&body) {
            return Err(unexpected(status_of(&body), &body));
        }

        // Older cores wrap each entry as `{ recipeId, user }`.
        let core_users = body
            .get("users")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|entry| match entry.get("user") {
                Some(user) => serde_json::from_value::<CoreUser>(user.clone()),
                None => serde_json::from_value::<CoreUser>(entry),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let users = try_join_all(core_users.into_iter().map(|u| self.with_profile(u))).await?;

        Ok(TenantUsersPage {
            users,
            next_pagination_token: body
                .get("nextPaginationToken")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    async fn add_pending_invite(
        &self,
        user_id: &str,
        token: &str,
        invite: &PendingInvite,
    ) -> Result<(), ServiceError> {
        self.invites.add(user_id, token, invite).await
    }

    async fn consume_pending_invite(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Option<PendingInvite>, ServiceError> {
        self.invites.consume(user_id, token).await
    }
}
