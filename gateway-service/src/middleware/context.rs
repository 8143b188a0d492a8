use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::context::{RequestContext, TENANT_HEADER};
use crate::models::PermissionSet;
use crate::providers::{AuthCoreProvider, RbacProvider};
use crate::services::ServiceError;
use crate::AppState;

/// Turns request credentials into a `RequestContext`.
#[derive(Clone)]
pub struct ContextResolver {
    auth: Arc<dyn AuthCoreProvider>,
    rbac: Arc<dyn RbacProvider>,
}

impl ContextResolver {
    pub fn new(auth: Arc<dyn AuthCoreProvider>, rbac: Arc<dyn RbacProvider>) -> Self {
        Self { auth, rbac }
    }

    /// Never fails. A bad token leaves the context without a session, and a
    /// failed role or policy lookup leaves it with an empty permission set.
    pub async fn resolve(
        &self,
        access_token: Option<&str>,
        tenant_id: Option<String>,
    ) -> RequestContext {
        let mut ctx = RequestContext {
            tenant_id,
            ..RequestContext::default()
        };

        let Some(token) = access_token else {
            return ctx;
        };
        let session = match self.auth.verify_session(token).await {
            Ok(session) => session,
            Err(ServiceError::Unauthenticated(reason)) => {
                tracing::debug!(reason = %reason, "Bearer token rejected");
                return ctx;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session verification failed");
                return ctx;
            }
        };

        if let Some(tenant_id) = ctx.tenant_id.as_deref() {
            match self.permissions_for(&session.user_id, tenant_id).await {
                Ok((role, permissions)) => {
                    ctx.role = role;
                    ctx.permissions = permissions;
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %session.user_id,
                        tenant_id = %tenant_id,
                        error = %e,
                        "Permission resolution failed, continuing with an empty permission set"
                    );
                    ctx.permissions = Some(PermissionSet::new());
                }
            }
        }

        ctx.session = Some(session);
        ctx
    }

    async fn permissions_for(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<(Option<String>, Option<PermissionSet>), ServiceError> {
        let Some(role) = self.rbac.get_user_role_in_tenant(user_id, tenant_id).await? else {
            return Ok((None, None));
        };
        let permissions = self
            .rbac
            .get_role_policy(tenant_id, &role)
            .await?
            .map(|policy| policy.permissions);
        Ok((Some(role), permissions))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn tenant_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|tenant| !tenant.is_empty())
        .map(str::to_string)
}

/// Resolve the caller once per request and store it in the request extensions.
///
/// The context's cancellation token fires when the request future is dropped.
pub async fn context_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = state
        .resolver
        .resolve(bearer_token(req.headers()), tenant_header(req.headers()))
        .await;

    let _cancel_on_drop = ctx.cancellation.clone().drop_guard();
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

/// Extractor for the resolved caller. Anonymous when the middleware did not run.
pub struct Ctx(pub RequestContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Ctx(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(RequestContext::anonymous)))
    }
}
