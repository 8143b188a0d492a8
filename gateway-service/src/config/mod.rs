use service_core::config as core_config;
use service_core::error::AppError;
use service_core::grpc::ResourceClientConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::providers::supertokens::SuperTokensConfig;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub identity: IdentityConfig,
    pub resource: ResourceBackendConfig,
    pub rbac_cache: RbacCacheConfig,
    pub security: SecurityConfig,
    pub notifier: NotifierConfig,
    pub frontend_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdentityBackend {
    SuperTokens,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub backend: IdentityBackend,
    pub connection_uri: String,
    pub api_key: Option<String>,
    pub request_timeout_seconds: u64,
    pub totp_issuer: String,
}

#[derive(Debug, Clone)]
pub struct ResourceBackendConfig {
    pub grpc_url: String,
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct RbacCacheConfig {
    pub backend: CacheBackend,
    pub ttl_seconds: u64,
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub global_mfa_enforced: bool,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifierBackend {
    Log,
    Smtp,
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub backend: NotifierBackend,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl IdentityConfig {
    pub fn supertokens(&self) -> SuperTokensConfig {
        SuperTokensConfig {
            connection_uri: self.connection_uri.clone(),
            api_key: self.api_key.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

impl ResourceBackendConfig {
    pub fn client_config(&self) -> ResourceClientConfig {
        ResourceClientConfig {
            endpoint: self.grpc_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

impl RbacCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment: Environment = lookup("ENVIRONMENT")
            .unwrap_or_else(|| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let rbac_backend: CacheBackend = parse(&get("RBAC_CACHE_BACKEND", Some("memory"))?)?;
        let redis_url = match rbac_backend {
            CacheBackend::Redis => Some(get("REDIS_URL", None)?),
            CacheBackend::Memory => lookup("REDIS_URL"),
        };

        let notifier_backend: NotifierBackend = parse(&get("NOTIFIER_BACKEND", Some("log"))?)?;
        let smtp = match notifier_backend {
            NotifierBackend::Smtp => Some(SmtpConfig {
                host: get("SMTP_HOST", None)?,
                port: parse(&get("SMTP_PORT", Some("587"))?)?,
                username: get("SMTP_USERNAME", None)?,
                password: get("SMTP_PASSWORD", None)?,
                from_address: get("SMTP_FROM", None)?,
            }),
            NotifierBackend::Log => None,
        };

        let config = GatewayConfig {
            common,
            environment: environment.clone(),
            service_name: get("SERVICE_NAME", Some("gateway-service"))?,
            service_version: get("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")))?,
            log_level: get("LOG_LEVEL", Some("info"))?,
            identity: IdentityConfig {
                backend: parse(&get("IDENTITY_BACKEND", Some("supertokens"))?)?,
                connection_uri: get("SUPERTOKENS_CONNECTION_URI", Some("http://localhost:3567"))?,
                api_key: lookup("SUPERTOKENS_API_KEY").filter(|k| !k.is_empty()),
                request_timeout_seconds: parse(&get(
                    "SUPERTOKENS_REQUEST_TIMEOUT_SECONDS",
                    Some("10"),
                )?)?,
                totp_issuer: lookup("TOTP_ISSUER").unwrap_or_else(|| "Gateway".to_string()),
            },
            resource: ResourceBackendConfig {
                grpc_url: get("RESOURCE_BACKEND_GRPC_URL", Some("http://localhost:50051"))?,
                connect_timeout_seconds: parse(&get(
                    "RESOURCE_BACKEND_CONNECT_TIMEOUT_SECONDS",
                    Some("5"),
                )?)?,
                request_timeout_seconds: parse(&get(
                    "RESOURCE_BACKEND_REQUEST_TIMEOUT_SECONDS",
                    Some("30"),
                )?)?,
            },
            rbac_cache: RbacCacheConfig {
                backend: rbac_backend,
                ttl_seconds: parse(&get("RBAC_CACHE_TTL_SECONDS", Some("600"))?)?,
                redis_url,
            },
            security: SecurityConfig {
                global_mfa_enforced: parse(&get("GLOBAL_MFA_ENFORCED", Some("false"))?)?,
                allowed_origins: get("ALLOWED_ORIGINS", Some("http://localhost:3000"))?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            notifier: NotifierConfig {
                backend: notifier_backend,
                smtp,
            },
            frontend_url: get("FRONTEND_URL", Some("http://localhost:3000"))?
                .trim_end_matches('/')
                .to_string(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.rbac_cache.ttl_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RBAC_CACHE_TTL_SECONDS must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.notifier.backend == NotifierBackend::Log {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "NOTIFIER_BACKEND=log drops invite and reset links; use smtp in production"
                )));
            }

            if self.identity.api_key.is_none() {
                tracing::warn!("SUPERTOKENS_API_KEY is not set in production");
            }
        }

        Ok(())
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse<T>(raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("invalid value '{}': {}", raw, e)))
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl FromStr for IdentityBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "supertokens" => Ok(IdentityBackend::SuperTokens),
            _ => Err(format!("Unsupported identity backend: {}", s)),
        }
    }
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            _ => Err(format!("Invalid cache backend: {}", s)),
        }
    }
}

impl FromStr for NotifierBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" => Ok(NotifierBackend::Log),
            "smtp" => Ok(NotifierBackend::Smtp),
            _ => Err(format!("Invalid notifier backend: {}", s)),
        }
    }
}
