use std::sync::Arc;
use std::time::Duration;

use gateway_service::models::SessionTrustPayload;
use gateway_service::providers::supertokens::{
    SuperTokensAuthCore, SuperTokensClient, SuperTokensConfig, SuperTokensIamProvider,
    SuperTokensMetadataStore, SuperTokensMfaProvider,
};
use gateway_service::providers::{AuthCoreProvider, IamProvider, MetadataStore, MfaProvider};
use gateway_service::services::ServiceError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, api_key: Option<&str>) -> SuperTokensClient {
    SuperTokensClient::new(&SuperTokensConfig {
        connection_uri: server.uri(),
        api_key: api_key.map(str::to_string),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn auth_core(server: &MockServer) -> SuperTokensAuthCore {
    let client = client(server, None);
    let metadata: Arc<dyn MetadataStore> = Arc::new(SuperTokensMetadataStore::new(client.clone()));
    SuperTokensAuthCore::new(client, metadata)
}

fn iam(server: &MockServer) -> SuperTokensIamProvider {
    let client = client(server, None);
    let metadata: Arc<dyn MetadataStore> = Arc::new(SuperTokensMetadataStore::new(client.clone()));
    SuperTokensIamProvider::new(client, metadata)
}

fn ok(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

async fn mount_empty_metadata(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/recipe/user/metadata"))
        .respond_with(ok(json!({ "status": "OK", "metadata": {} })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_api_key_is_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recipe/user/metadata"))
        .and(header("api-key", "core-secret"))
        .respond_with(ok(json!({ "status": "OK", "metadata": { "a": 1 } })))
        .expect(1)
        .mount(&server)
        .await;

    let store = SuperTokensMetadataStore::new(client(&server, Some("core-secret")));
    let metadata = store.get("u-1").await.unwrap();
    assert_eq!(metadata.get("a"), Some(&json!(1)));
}

#[tokio::test]
async fn test_sign_in_maps_wrong_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recipe/signin"))
        .respond_with(ok(json!({ "status": "WRONG_CREDENTIALS_ERROR" })))
        .mount(&server)
        .await;

    let err = auth_core(&server)
        .verify_credentials("ada@acme.test", "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCredentials));
}

#[tokio::test]
async fn test_sign_in_attaches_profile_from_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recipe/signin"))
        .and(body_partial_json(json!({ "email": "ada@acme.test" })))
        .respond_with(ok(json!({
            "status": "OK",
            "user": { "id": "u-1", "emails": ["ada@acme.test"], "tenantIds": ["public", "t-1"] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recipe/user/metadata"))
        .and(query_param("userId", "u-1"))
        .respond_with(ok(json!({
            "status": "OK",
            "metadata": { "profile": { "firstName": "Ada" } }
        })))
        .mount(&server)
        .await;

    let user = auth_core(&server)
        .verify_credentials("ada@acme.test", "Passw0rd!")
        .await
        .unwrap();
    assert_eq!(user.id, "u-1");
    assert_eq!(user.tenant_ids, vec!["public", "t-1"]);
    assert_eq!(user.profile.first_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_session_round_trip_carries_trust_payload() {
    let server = MockServer::start().await;
    let payload = SessionTrustPayload {
        mfa_enforced: true,
        mfa_enabled: true,
        mfa_verified: false,
        requires_password_change: false,
    };
    Mock::given(method("POST"))
        .and(path("/recipe/session"))
        .and(body_partial_json(json!({
            "userId": "u-1",
            "userDataInJWT": { "mfaEnforced": true, "mfaEnabled": true }
        })))
        .respond_with(ok(json!({
            "status": "OK",
            "session": { "handle": "h-1", "userId": "u-1", "userDataInJWT": payload },
            "accessToken": { "token": "at-1" },
            "refreshToken": { "token": "rt-1" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/recipe/session/verify"))
        .respond_with(ok(json!({
            "status": "OK",
            "session": { "handle": "h-1", "userId": "u-1", "userDataInJWT": payload }
        })))
        .mount(&server)
        .await;

    let core = auth_core(&server);
    let issued = core.create_session("u-1", &payload).await.unwrap();
    assert_eq!(issued.tokens.access_token, "at-1");
    assert_eq!(issued.tokens.refresh_token, "rt-1");

    let session = core.verify_session("at-1").await.unwrap();
    assert_eq!(session.handle, "h-1");
    assert_eq!(session.payload, payload);
}

#[tokio::test]
async fn test_expired_access_token_is_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recipe/session/verify"))
        .respond_with(ok(json!({ "status": "TRY_REFRESH_TOKEN", "message": "expired" })))
        .mount(&server)
        .await;

    let err = auth_core(&server).verify_session("at-old").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_refresh_reports_token_theft_with_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recipe/session/refresh"))
        .respond_with(ok(json!({
            "status": "TOKEN_THEFT_DETECTED",
            "session": { "handle": "h-1", "userId": "u-7" }
        })))
        .mount(&server)
        .await;

    let err = auth_core(&server).refresh_session("rt-old").await.unwrap_err();
    assert!(matches!(err, ServiceError::TokenTheftDetected { ref user_id } if user_id == "u-7"));
}

#[tokio::test]
async fn test_invalid_reset_token_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recipe/user/password/reset/token/consume"))
        .respond_with(ok(json!({ "status": "RESET_PASSWORD_INVALID_TOKEN_ERROR" })))
        .mount(&server)
        .await;

    assert!(!auth_core(&server).reset_password("stale", "N3wPassword!").await.unwrap());
}

#[tokio::test]
async fn test_http_failure_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recipe/session/remove"))
        .respond_with(ResponseTemplate::new(500).set_body_string("core down"))
        .mount(&server)
        .await;

    let err = auth_core(&server).revoke_session("h-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::BackendStatus { ref status, .. } if status == "500"));
}

#[tokio::test]
async fn test_signup_maps_duplicate_email_to_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recipe/signup"))
        .respond_with(ok(json!({ "status": "EMAIL_ALREADY_EXISTS_ERROR" })))
        .mount(&server)
        .await;

    let err = iam(&server)
        .create_user("ada@acme.test", "Passw0rd!")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_unknown_user_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/id"))
        .and(query_param("userId", "u-404"))
        .respond_with(ok(json!({ "status": "UNKNOWN_USER_ID_ERROR" })))
        .mount(&server)
        .await;

    assert!(iam(&server).get_user("u-404").await.unwrap().is_none());
}

#[tokio::test]
async fn test_tenant_users_accepts_wrapped_entries() {
    let server = MockServer::start().await;
    mount_empty_metadata(&server).await;
    Mock::given(method("GET"))
        .and(path("/t-1/users"))
        .and(query_param("limit", "2"))
        .and(query_param("paginationToken", "p-1"))
        .respond_with(ok(json!({
            "status": "OK",
            "users": [
                { "recipeId": "emailpassword", "user": { "id": "u-1", "email": "a@acme.test" } },
                { "id": "u-2", "emails": ["b@acme.test"] }
            ],
            "nextPaginationToken": "p-2"
        })))
        .mount(&server)
        .await;

    let page = iam(&server)
        .list_tenant_users("t-1", 2, Some("p-1"))
        .await
        .unwrap();
    let emails: Vec<&str> = page.users.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["a@acme.test", "b@acme.test"]);
    assert_eq!(page.next_pagination_token.as_deref(), Some("p-2"));
}

#[tokio::test]
async fn test_tenant_registration_enables_sign_in_methods() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/recipe/multitenancy/tenant/v2"))
        .and(body_partial_json(json!({
            "tenantId": "t-1",
            "firstFactors": ["emailpassword", "thirdparty"]
        })))
        .respond_with(ok(json!({ "status": "OK", "createdNew": true })))
        .expect(1)
        .mount(&server)
        .await;

    iam(&server).register_tenant("t-1").await.unwrap();
}

#[tokio::test]
async fn test_totp_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recipe/totp/device/verify"))
        .respond_with(ok(json!({ "status": "INVALID_TOTP_ERROR" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/recipe/totp/verify"))
        .respond_with(ok(json!({ "status": "LIMIT_REACHED_ERROR", "retryAfterMs": 30000 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/recipe/totp/device"))
        .respond_with(ok(json!({ "status": "DEVICE_ALREADY_EXISTS_ERROR" })))
        .mount(&server)
        .await;

    let mfa = SuperTokensMfaProvider::new(client(&server, None), "Acme");

    let err = mfa.verify_totp_device("u-1", "phone", "000000").await.unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(ref m) if m == "Invalid TOTP code."));

    let err = mfa.verify_code("u-1", "000000").await.unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(ref m) if m.contains("30 seconds")));

    let err = mfa.create_totp_device("u-1", "phone").await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_device_enrollment_builds_otpauth_uri() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recipe/totp/device"))
        .respond_with(ok(json!({ "status": "OK", "deviceName": "phone", "secret": "JBSWY3DP" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recipe/totp/device/list"))
        .respond_with(ok(json!({
            "status": "OK",
            "devices": [
                { "name": "phone", "verified": true, "period": 30, "skew": 1 },
                { "name": "tablet", "verified": false, "period": 30, "skew": 1 }
            ]
        })))
        .mount(&server)
        .await;

    let mfa = SuperTokensMfaProvider::new(client(&server, None), "Acme");
    let device = mfa.create_totp_device("u-1", "phone").await.unwrap();
    assert_eq!(device.secret, "JBSWY3DP");
    assert!(device.qr_code.starts_with("otpauth://totp/Acme:u-1?secret=JBSWY3DP"));

    let devices = mfa.list_devices("u-1").await.unwrap();
    assert_eq!(devices.len(), 2);
    assert!(devices[0].verified);
    assert!(!devices[1].verified);
}
