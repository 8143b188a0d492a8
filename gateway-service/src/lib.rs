pub mod config;
pub mod context;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::context::TENANT_HEADER;
use crate::middleware::{
    context_middleware, metrics_middleware, request_id_middleware, ContextResolver,
    SessionTrustGate, REQUEST_ID_HEADER,
};
use crate::providers::{
    AuthCoreProvider, IamProvider, MfaProvider, RbacProvider, RecordBackend, TenantBackend,
};
use crate::services::{AuthService, DataService, IamService, MfaService, Notifier, RbacService};

/// Concrete collaborators the services are built from.
#[derive(Clone)]
pub struct Providers {
    pub auth: Arc<dyn AuthCoreProvider>,
    pub iam: Arc<dyn IamProvider>,
    pub rbac: Arc<dyn RbacProvider>,
    pub mfa: Arc<dyn MfaProvider>,
    pub tenants: Arc<dyn TenantBackend>,
    pub records: Arc<dyn RecordBackend>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub resolver: ContextResolver,
    pub auth_service: AuthService,
    pub iam_service: IamService,
    pub rbac_service: RbacService,
    pub mfa_service: MfaService,
    pub data_service: DataService,
}

impl AppState {
    pub fn new(config: GatewayConfig, providers: Providers) -> Self {
        let gate = SessionTrustGate::new(config.security.global_mfa_enforced);
        let frontend_url = config.frontend_url.clone();

        let auth_service = AuthService::new(
            providers.auth.clone(),
            providers.iam.clone(),
            providers.rbac.clone(),
            providers.mfa.clone(),
            providers.tenants.clone(),
            providers.notifier.clone(),
            gate.clone(),
            frontend_url.clone(),
        );
        let iam_service = IamService::new(
            providers.iam.clone(),
            providers.auth.clone(),
            providers.rbac.clone(),
            providers.tenants.clone(),
            providers.notifier.clone(),
            gate.clone(),
            frontend_url,
        );
        let rbac_service =
            RbacService::new(providers.rbac.clone(), providers.iam.clone(), gate.clone());
        let mfa_service = MfaService::new(providers.mfa.clone(), providers.auth.clone(), gate.clone());
        let data_service = DataService::new(providers.records.clone(), gate);

        Self {
            config: Arc::new(config),
            resolver: ContextResolver::new(providers.auth, providers.rbac),
            auth_service,
            iam_service,
            rbac_service,
            mfa_service,
            data_service,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/auth/password-reset/request",
            post(handlers::auth::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(handlers::auth::confirm_password_reset),
        );

    let iam_routes = Router::new()
        .route(
            "/iam/tenants",
            get(handlers::iam::my_tenants).post(handlers::iam::create_tenant),
        )
        .route("/iam/tenant", patch(handlers::iam::update_tenant))
        .route("/iam/tenant/users", get(handlers::iam::tenant_users))
        .route("/iam/invites", post(handlers::iam::invite_user))
        .route("/iam/invites/accept", post(handlers::iam::accept_invite))
        .route(
            "/iam/me",
            get(handlers::iam::get_me).patch(handlers::iam::update_me),
        );

    let rbac_routes = Router::new()
        .route(
            "/rbac/roles",
            get(handlers::rbac::list_roles).post(handlers::rbac::create_policy),
        )
        .route(
            "/rbac/roles/:role",
            get(handlers::rbac::get_role_policy)
                .put(handlers::rbac::update_policy)
                .delete(handlers::rbac::delete_policy),
        )
        .route("/rbac/permissions", get(handlers::rbac::my_permissions))
        .route("/rbac/assignments", post(handlers::rbac::assign_role))
        .route("/rbac/members/:user_id", delete(handlers::rbac::remove_member));

    let mfa_routes = Router::new()
        .route(
            "/mfa/devices",
            get(handlers::mfa::list_devices).post(handlers::mfa::create_device),
        )
        .route("/mfa/devices/verify", post(handlers::mfa::verify_device))
        .route(
            "/mfa/devices/:device_name",
            delete(handlers::mfa::remove_device),
        )
        .route("/mfa/verify", post(handlers::mfa::verify));

    let data_routes = Router::new()
        .route("/data/:entity", post(handlers::data::create_record))
        .route("/data/:entity/query", post(handlers::data::query_records))
        .route(
            "/data/:entity/:id",
            get(handlers::data::get_record)
                .patch(handlers::data::update_record)
                .delete(handlers::data::delete_record),
        );

    let cors = cors_layer(&state.config.security.allowed_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(auth_routes)
        .merge(iam_routes)
        .merge(rbac_routes)
        .merge(mfa_routes)
        .merge(data_routes)
        .layer(from_fn_with_state(state.clone(), context_middleware))
        .layer(from_fn(metrics_middleware))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(&REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(TENANT_HEADER),
            REQUEST_ID_HEADER,
        ])
        .expose_headers([REQUEST_ID_HEADER]);

    // Only reachable in dev; production config rejects the wildcard.
    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
    }))
}
