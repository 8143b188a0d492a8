use std::sync::Arc;

use gateway_service::{
    build_router,
    config::{CacheBackend, GatewayConfig, IdentityBackend, NotifierBackend},
    providers::{
        supertokens::{
            SuperTokensAuthCore, SuperTokensClient, SuperTokensIamProvider,
            SuperTokensMetadataStore, SuperTokensMfaProvider,
        },
        GrpcRecordBackend, GrpcTenantBackend, InMemoryPolicyCache, MetadataRbacProvider,
        MetadataStore, PolicyCache, RedisPolicyCache,
    },
    services::{LoggingNotifier, Notifier, SmtpNotifier},
    AppState, Providers,
};
use service_core::error::AppError;
use service_core::grpc::{connect_lazy, DataClient, TenantClient};
use service_core::observability::{init_metrics, init_tracing};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = GatewayConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);
    init_metrics().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Failed to install metrics recorder: {}", e))
    })?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting gateway service"
    );

    let providers = build_providers(&config).await?;
    let addr = config.common.listen_addr();
    let app = build_router(AppState::new(config, providers));

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn build_providers(config: &GatewayConfig) -> Result<Providers, AppError> {
    let client = match config.identity.backend {
        IdentityBackend::SuperTokens => SuperTokensClient::new(&config.identity.supertokens())?,
    };
    let metadata: Arc<dyn MetadataStore> = Arc::new(SuperTokensMetadataStore::new(client.clone()));
    tracing::info!(uri = %config.identity.connection_uri, "Identity backend configured");

    let cache: Arc<dyn PolicyCache> = match config.rbac_cache.backend {
        CacheBackend::Memory => Arc::new(InMemoryPolicyCache::new()),
        CacheBackend::Redis => {
            let url = config.rbac_cache.redis_url.as_deref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("REDIS_URL is required for the redis cache"))
            })?;
            Arc::new(RedisPolicyCache::new(url).await?)
        }
    };
    tracing::info!(
        backend = ?config.rbac_cache.backend,
        ttl_seconds = config.rbac_cache.ttl_seconds,
        "RBAC cache initialized"
    );

    let channel = connect_lazy(&config.resource.client_config()).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Invalid resource backend endpoint: {}", e))
    })?;
    tracing::info!(endpoint = %config.resource.grpc_url, "Resource backend channel created");

    let notifier: Arc<dyn Notifier> = match (&config.notifier.backend, &config.notifier.smtp) {
        (NotifierBackend::Smtp, Some(smtp)) => Arc::new(SmtpNotifier::new(smtp)?),
        (NotifierBackend::Smtp, None) => {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SMTP settings are required for the smtp notifier"
            )))
        }
        (NotifierBackend::Log, _) => {
            tracing::warn!("Using the logging notifier; invite and reset emails are not sent");
            Arc::new(LoggingNotifier)
        }
    };

    Ok(Providers {
        auth: Arc::new(SuperTokensAuthCore::new(client.clone(), metadata.clone())),
        iam: Arc::new(SuperTokensIamProvider::new(client.clone(), metadata.clone())),
        rbac: Arc::new(MetadataRbacProvider::new(
            metadata,
            cache,
            config.rbac_cache.ttl(),
        )),
        mfa: Arc::new(SuperTokensMfaProvider::new(
            client,
            config.identity.totp_issuer.clone(),
        )),
        tenants: Arc::new(GrpcTenantBackend::new(TenantClient::new(channel.clone()))),
        records: Arc::new(GrpcRecordBackend::new(DataClient::new(channel))),
        notifier,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
