use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

use super::SuperTokensConfig;
use crate::services::ServiceError;

const STATUS_OK: &str = "OK";

/// Thin JSON client for the SuperTokens core.
///
/// Every call returns the decoded body. Transport failures and non-2xx
/// responses are errors; the body's own `status` field is left to the caller.
#[derive(Clone)]
pub struct SuperTokensClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl SuperTokensClient {
    pub fn new(config: &SuperTokensConfig) -> Result<Self, ServiceError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.connection_uri.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ServiceError> {
        self.send(self.request(Method::GET, path).query(query), path)
            .await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ServiceError> {
        self.send(self.request(Method::POST, path).json(body), path)
            .await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ServiceError> {
        self.send(self.request(Method::PUT, path).json(body), path)
            .await
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Value, ServiceError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(path = %path, status = %status, "SuperTokens core request failed");
            return Err(ServiceError::backend_status(status.as_str(), body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// The body's `status` field; `""` when missing.
pub(crate) fn status_of(body: &Value) -> &str {
    body.get("status").and_then(Value::as_str).unwrap_or_default()
}

/// Accept only `"status": "OK"`; anything else becomes `BackendStatus`.
pub(crate) fn expect_ok(body: Value) -> Result<Value, ServiceError> {
    match status_of(&body) {
        STATUS_OK => Ok(body),
        other => Err(unexpected(other, &body)),
    }
}

pub(crate) fn unexpected(status: &str, body: &Value) -> ServiceError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unexpected response from identity backend");
    ServiceError::backend_status(status, message)
}

pub(crate) fn is_ok(body: &Value) -> bool {
    status_of(body) == STATUS_OK
}
