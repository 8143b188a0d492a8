//! Shared fixtures for gateway-service integration tests.
//!
//! `FakeIdentity` plays the identity backend (credentials, sessions, users,
//! tenants, TOTP). RBAC runs on the real metadata-backed provider over an
//! in-memory store. Every fake can be told to fail a named operation.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gateway_service::{
    config::GatewayConfig,
    context::RequestContext,
    models::{
        DeleteOutcome, DeviceSummary, IssuedSession, PendingInvite, Record, RecordPage,
        RecordQuery, RolePolicy, Session, SessionTokens, SessionTrustPayload, Tenant,
        TenantUsersPage, TotpDevice, User, UserProfile, UserUpdate,
    },
    providers::{
        rbac::DEFAULT_POLICY_TTL, AuthCoreProvider, IamProvider, InMemoryMetadataStore,
        InMemoryPolicyCache, MetadataInviteStore, MetadataRbacProvider, MfaProvider,
        RbacProvider, RecordBackend, TenantBackend,
    },
    services::{Notifier, ServiceError},
    AppState, Providers,
};
use serde_json::{Map, Value};
use service_core::grpc::CallerMetadata;

pub const VALID_TOTP: &str = "123456";

/// Operation names a test wants to fail.
#[derive(Default)]
pub struct Failures(Mutex<HashSet<String>>);

impl Failures {
    pub fn fail(&self, op: &str) {
        self.0.lock().unwrap().insert(op.to_string());
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    fn check(&self, op: &str) -> Result<(), ServiceError> {
        if self.0.lock().unwrap().contains(op) {
            return Err(ServiceError::backend_status("INJECTED", op));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Identity backend
// ---------------------------------------------------------------------------

struct SessionEntry {
    user_id: String,
    payload: SessionTrustPayload,
    access_token: String,
    refresh_token: String,
}

#[derive(Default)]
struct IdentityState {
    next_id: u64,
    users: HashMap<String, User>,
    passwords: HashMap<String, String>,
    sessions: HashMap<String, SessionEntry>,
    used_refresh_tokens: HashMap<String, String>,
    reset_tokens: HashMap<String, String>,
    requires_password_change: HashSet<String>,
    tenants: HashSet<String>,
    devices: HashMap<String, Vec<DeviceSummary>>,
}

impl IdentityState {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    fn issue(&mut self, user_id: &str, payload: SessionTrustPayload) -> IssuedSession {
        let n = self.next();
        let handle = format!("handle-{}", n);
        let tokens = SessionTokens {
            access_token: format!("access-{}", n),
            refresh_token: format!("refresh-{}", n),
        };
        self.sessions.insert(
            handle.clone(),
            SessionEntry {
                user_id: user_id.to_string(),
                payload,
                access_token: tokens.access_token.clone(),
                refresh_token: tokens.refresh_token.clone(),
            },
        );
        IssuedSession {
            session: Session {
                user_id: user_id.to_string(),
                handle,
                payload,
            },
            tokens,
        }
    }
}

pub struct FakeIdentity {
    state: Mutex<IdentityState>,
    invites: MetadataInviteStore,
    pub failures: Failures,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(IdentityState::default()),
            invites: MetadataInviteStore::new(Arc::new(InMemoryMetadataStore::new())),
            failures: Failures::default(),
        }
    }

    pub fn seed_user(&self, email: &str, password: &str) -> User {
        let mut state = self.state.lock().unwrap();
        let n = state.next();
        let user = User {
            id: format!("user-{}", n),
            email: email.to_string(),
            time_joined: n as i64,
            tenant_ids: vec!["public".to_string()],
            profile: UserProfile::default(),
        };
        state.users.insert(user.id.clone(), user.clone());
        state.passwords.insert(user.id.clone(), password.to_string());
        user
    }

    pub fn user(&self, user_id: &str) -> Option<User> {
        self.state.lock().unwrap().users.get(user_id).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.state.lock().unwrap().user_by_email(email).cloned()
    }

    pub fn password_of(&self, user_id: &str) -> Option<String> {
        self.state.lock().unwrap().passwords.get(user_id).cloned()
    }

    pub fn has_tenant(&self, tenant_id: &str) -> bool {
        self.state.lock().unwrap().tenants.contains(tenant_id)
    }

    pub fn live_sessions(&self, user_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .count()
    }

    pub fn requires_password_change(&self, user_id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .requires_password_change
            .contains(user_id)
    }

    pub fn seed_device(&self, user_id: &str, name: &str, verified: bool) {
        self.state
            .lock()
            .unwrap()
            .devices
            .entry(user_id.to_string())
            .or_default()
            .push(DeviceSummary {
                name: name.to_string(),
                verified,
            });
    }

    pub fn reset_token_for(&self, user_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .reset_tokens
            .iter()
            .find(|(_, owner)| owner.as_str() == user_id)
            .map(|(token, _)| token.clone())
    }
}

#[async_trait]
impl AuthCoreProvider for FakeIdentity {
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        self.failures.check("verify_credentials")?;
        let state = self.state.lock().unwrap();
        let user = state
            .user_by_email(email)
            .ok_or(ServiceError::InvalidCredentials)?;
        if state.passwords.get(&user.id).map(String::as_str) != Some(password) {
            return Err(ServiceError::InvalidCredentials);
        }
        Ok(user.clone())
    }

    async fn create_session(
        &self,
        user_id: &str,
        payload: &SessionTrustPayload,
    ) -> Result<IssuedSession, ServiceError> {
        self.failures.check("create_session")?;
        Ok(self.state.lock().unwrap().issue(user_id, *payload))
    }

    async fn verify_session(&self, access_token: &str) -> Result<Session, ServiceError> {
        let state = self.state.lock().unwrap();
        state
            .sessions
            .iter()
            .find(|(_, s)| s.access_token == access_token)
            .map(|(handle, s)| Session {
                user_id: s.user_id.clone(),
                handle: handle.clone(),
                payload: s.payload,
            })
            .ok_or_else(|| ServiceError::Unauthenticated("Invalid session.".to_string()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<IssuedSession, ServiceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(user_id) = state.used_refresh_tokens.get(refresh_token) {
            return Err(ServiceError::TokenTheftDetected {
                user_id: user_id.clone(),
            });
        }

        let Some(handle) = state
            .sessions
            .iter()
            .find(|(_, s)| s.refresh_token == refresh_token)
            .map(|(handle, _)| handle.clone())
        else {
            return Err(ServiceError::SessionRefreshFailed(
                "Unknown refresh token".to_string(),
            ));
        };

        let n = state.next();
        let entry = state.sessions.get_mut(&handle).unwrap();
        let user_id = entry.user_id.clone();
        entry.access_token = format!("access-{}", n);
        entry.refresh_token = format!("refresh-{}", n);
        let issued = IssuedSession {
            session: Session {
                user_id: user_id.clone(),
                handle,
                payload: entry.payload,
            },
            tokens: SessionTokens {
                access_token: entry.access_token.clone(),
                refresh_token: entry.refresh_token.clone(),
            },
        };
        state
            .used_refresh_tokens
            .insert(refresh_token.to_string(), user_id);
        Ok(issued)
    }

    async fn revoke_session(&self, session_handle: &str) -> Result<(), ServiceError> {
        self.failures.check("revoke_session")?;
        self.state.lock().unwrap().sessions.remove(session_handle);
        Ok(())
    }

    async fn revoke_all_sessions(&self, user_id: &str) -> Result<(), ServiceError> {
        self.failures.check("revoke_all_sessions")?;
        self.state
            .lock()
            .unwrap()
            .sessions
            .retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn create_password_reset_token(
        &self,
        user_id: &str,
        _email: &str,
    ) -> Result<String, ServiceError> {
        let mut state = self.state.lock().unwrap();
        let token = format!("reset-{}", state.next());
        state.reset_tokens.insert(token.clone(), user_id.to_string());
        Ok(token)
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<bool, ServiceError> {
        let mut state = self.state.lock().unwrap();
        let Some(user_id) = state.reset_tokens.remove(token) else {
            return Ok(false);
        };
        state.passwords.insert(user_id, new_password.to_string());
        Ok(true)
    }

    async fn get_requires_password_change(&self, user_id: &str) -> Result<bool, ServiceError> {
        Ok(self.requires_password_change(user_id))
    }

    async fn set_requires_password_change(
        &self,
        user_id: &str,
        required: bool,
    ) -> Result<(), ServiceError> {
        self.failures.check("set_requires_password_change")?;
        let mut state = self.state.lock().unwrap();
        if required {
            state.requires_password_change.insert(user_id.to_string());
        } else {
            state.requires_password_change.remove(user_id);
        }
        Ok(())
    }
}

#[async_trait]
impl IamProvider for FakeIdentity {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.user(user_id))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.user_by_email(email))
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        self.failures.check("create_user")?;
        if self.user_by_email(email).is_some() {
            return Err(ServiceError::Conflict("Email already exists.".to_string()));
        }
        Ok(self.seed_user(email, password))
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<User, ServiceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(password) = &update.password {
            state.passwords.insert(user_id.to_string(), password.clone());
        }
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))?;
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        user.profile.merge(&update.profile);
        Ok(user.clone())
    }

    async fn register_tenant(&self, tenant_id: &str) -> Result<(), ServiceError> {
        self.failures.check("register_tenant")?;
        self.state
            .lock()
            .unwrap()
            .tenants
            .insert(tenant_id.to_string());
        Ok(())
    }

    async fn associate_user_to_tenant(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<(), ServiceError> {
        self.failures.check("associate_user_to_tenant")?;
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))?;
        if !user.tenant_ids.iter().any(|t| t == tenant_id) {
            user.tenant_ids.push(tenant_id.to_string());
        }
        Ok(())
    }

    async fn disassociate_user_from_tenant(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<(), ServiceError> {
        self.failures.check("disassociate_user_from_tenant")?;
        if let Some(user) = self.state.lock().unwrap().users.get_mut(user_id) {
            user.tenant_ids.retain(|t| t != tenant_id);
        }
        Ok(())
    }

    async fn list_tenant_users(
        &self,
        tenant_id: &str,
        limit: u32,
        _pagination_token: Option<&str>,
    ) -> Result<TenantUsersPage, ServiceError> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.tenant_ids.iter().any(|t| t == tenant_id))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.time_joined.cmp(&a.time_joined));
        users.truncate(limit as usize);
        Ok(TenantUsersPage {
            users,
            next_pagination_token: None,
        })
    }

    async fn add_pending_invite(
        &self,
        user_id: &str,
        token: &str,
        invite: &PendingInvite,
    ) -> Result<(), ServiceError> {
        self.failures.check("add_pending_invite")?;
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

#[async_trait]
impl MfaProvider for FakeIdentity {
    async fn create_totp_device(
        &self,
        user_id: &str,
        device_name: &str,
    ) -> Result<TotpDevice, ServiceError> {
        let mut state = self.state.lock().unwrap();
        let devices = state.devices.entry(user_id.to_string()).or_default();
        if devices.iter().any(|d| d.name == device_name) {
            return Err(ServiceError::Conflict("Device name already exists.".to_string()));
        }
        devices.push(DeviceSummary {
            name: device_name.to_string(),
            verified: false,
        });
        Ok(TotpDevice {
            device_name: device_name.to_string(),
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            qr_code: format!("otpauth://totp/Gateway:{}?secret=JBSWY3DPEHPK3PXP", user_id),
        })
    }

    async fn verify_totp_device(
        &self,
        user_id: &str,
        device_name: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        let device = state
            .devices
            .get_mut(user_id)
            .and_then(|devices| devices.iter_mut().find(|d| d.name == device_name))
            .ok_or_else(|| ServiceError::NotFound("Device not found.".to_string()))?;
        if code != VALID_TOTP {
            return Err(ServiceError::BadRequest("Invalid TOTP code.".to_string()));
        }
        device.verified = true;
        Ok(())
    }

    async fn verify_code(&self, user_id: &str, code: &str) -> Result<(), ServiceError> {
        let state = self.state.lock().unwrap();
        let has_verified = state
            .devices
            .get(user_id)
            .is_some_and(|devices| devices.iter().any(|d| d.verified));
        if !has_verified || code != VALID_TOTP {
            return Err(ServiceError::BadRequest("Invalid TOTP code.".to_string()));
        }
        Ok(())
    }

    async fn remove_totp_device(
        &self,
        user_id: &str,
        device_name: &str,
    ) -> Result<bool, ServiceError> {
        let mut state = self.state.lock().unwrap();
        let Some(devices) = state.devices.get_mut(user_id) else {
            return Ok(false);
        };
        let before = devices.len();
        devices.retain(|d| d.name != device_name);
        Ok(devices.len() != before)
    }

    async fn list_devices(&self, user_id: &str) -> Result<Vec<DeviceSummary>, ServiceError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .devices
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// RBAC
// ---------------------------------------------------------------------------

/// The metadata-backed RBAC provider with injectable failures.
pub struct FlakyRbac {
    inner: MetadataRbacProvider,
    pub failures: Failures,
}

impl FlakyRbac {
    pub fn new() -> Self {
        Self {
            inner: MetadataRbacProvider::new(
                Arc::new(InMemoryMetadataStore::new()),
                Arc::new(InMemoryPolicyCache::new()),
                DEFAULT_POLICY_TTL,
            ),
            failures: Failures::default(),
        }
    }
}

#[async_trait]
impl RbacProvider for FlakyRbac {
    async fn get_user_role_in_tenant(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Option<String>, ServiceError> {
        self.failures.check("get_user_role_in_tenant")?;
        self.inner.get_user_role_in_tenant(user_id, tenant_id).await
    }

    async fn assign_role_to_user(
        &self,
        user_id: &str,
        tenant_id: &str,
        role: &str,
    ) -> Result<(), ServiceError> {
        self.failures.check("assign_role_to_user")?;
        self.inner.assign_role_to_user(user_id, tenant_id, role).await
    }

    async fn remove_user_role(&self, user_id: &str, tenant_id: &str) -> Result<(), ServiceError> {
        self.failures.check("remove_user_role")?;
        self.inner.remove_user_role(user_id, tenant_id).await
    }

    async fn list_tenant_roles(&self, tenant_id: &str) -> Result<Vec<String>, ServiceError> {
        self.inner.list_tenant_roles(tenant_id).await
    }

    async fn get_role_policy(
        &self,
        tenant_id: &str,
        role: &str,
    ) -> Result<Option<RolePolicy>, ServiceError> {
        self.failures.check("get_role_policy")?;
        self.inner.get_role_policy(tenant_id, role).await
    }

    async fn set_role_policy(
        &self,
        tenant_id: &str,
        role: &str,
        policy: &RolePolicy,
    ) -> Result<(), ServiceError> {
        self.failures.check("set_role_policy")?;
        self.inner.set_role_policy(tenant_id, role, policy).await
    }

    async fn delete_role_policy(&self, tenant_id: &str, role: &str) -> Result<(), ServiceError> {
        self.failures.check("delete_role_policy")?;
        self.inner.delete_role_policy(tenant_id, role).await
    }
}

// ---------------------------------------------------------------------------
// Resource backend
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeTenantBackend {
    tenants: Mutex<HashMap<String, Tenant>>,
    next_id: Mutex<u64>,
    pub deleted: Mutex<Vec<String>>,
    pub failures: Failures,
    /// Delay between committing a new tenant and answering.
    pub create_delay: Mutex<Option<Duration>>,
}

impl FakeTenantBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tenant(&self, id: &str) -> Option<Tenant> {
        self.tenants.lock().unwrap().get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.tenants.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TenantBackend for FakeTenantBackend {
    async fn create_tenant(
        &self,
        _caller: &CallerMetadata,
        name: &str,
    ) -> Result<Tenant, ServiceError> {
        self.failures.check("create_tenant")?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("tenant-{}", *next)
        };
        let tenant = Tenant {
            id: id.clone(),
            name: name.to_string(),
            created_at: None,
            updated_at: None,
        };
        self.tenants.lock().unwrap().insert(id, tenant.clone());

        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(tenant)
    }

    async fn get_tenant(&self, _caller: &CallerMetadata, id: &str) -> Result<Tenant, ServiceError> {
        self.failures.check("get_tenant")?;
        self.tenant(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Tenant {} not found", id)))
    }

    async fn update_tenant(
        &self,
        _caller: &CallerMetadata,
        id: &str,
        name: &str,
    ) -> Result<Tenant, ServiceError> {
        let mut tenants = self.tenants.lock().unwrap();
        let tenant = tenants
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Tenant {} not found", id)))?;
        tenant.name = name.to_string();
        Ok(tenant.clone())
    }

    async fn delete_tenant(&self, _caller: &CallerMetadata, id: &str) -> Result<bool, ServiceError> {
        self.failures.check("delete_tenant")?;
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(self.tenants.lock().unwrap().remove(id).is_some())
    }
}

#[derive(Default)]
pub struct FakeRecordBackend {
    records: Mutex<HashMap<(String, String), Record>>,
    next_id: Mutex<u64>,
    pub callers: Mutex<Vec<CallerMetadata>>,
}

impl FakeRecordBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, entity: &str, id: &str, data: Value) {
        let record = Record {
            id: id.to_string(),
            entity_id: entity.to_string(),
            data: data.as_object().cloned().unwrap_or_default(),
            created_at: None,
            updated_at: None,
        };
        self.records
            .lock()
            .unwrap()
            .insert((entity.to_string(), id.to_string()), record);
    }

    pub fn stored(&self, entity: &str, id: &str) -> Option<Record> {
        self.records
            .lock()
            .unwrap()
            .get(&(entity.to_string(), id.to_string()))
            .cloned()
    }

    pub fn callers(&self) -> Vec<CallerMetadata> {
        self.callers.lock().unwrap().clone()
    }

    fn seen(&self, caller: &CallerMetadata) {
        self.callers.lock().unwrap().push(caller.clone());
    }

    fn not_found(entity: &str, id: &str) -> ServiceError {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }
}

#[async_trait]
impl RecordBackend for FakeRecordBackend {
    async fn get_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        record_id: &str,
    ) -> Result<Record, ServiceError> {
        self.seen(caller);
        self.stored(entity, record_id)
            .ok_or_else(|| Self::not_found(entity, record_id))
    }

    async fn query_records(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        query: &RecordQuery,
    ) -> Result<RecordPage, ServiceError> {
        self.seen(caller);
        let mut data: Vec<Record> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.entity_id == entity)
            .cloned()
            .collect();
        data.sort_by(|a, b| a.id.cmp(&b.id));
        let total_count = data.len() as i32;
        let (page, limit) = query
            .pagination
            .map(|p| (p.page, p.limit))
            .unwrap_or((1, total_count.max(1)));
        Ok(RecordPage {
            data,
            total_count,
            page,
            limit,
        })
    }

    async fn create_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        data: &Map<String, Value>,
    ) -> Result<Record, ServiceError> {
        self.seen(caller);
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("rec-{}", *next)
        };
        self.seed(entity, &id, Value::Object(data.clone()));
        self.stored(entity, &id)
            .ok_or_else(|| Self::not_found(entity, &id))
    }

    async fn update_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        record_id: &str,
        data: &Map<String, Value>,
    ) -> Result<Record, ServiceError> {
        self.seen(caller);
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(entity.to_string(), record_id.to_string()))
            .ok_or_else(|| Self::not_found(entity, record_id))?;
        for (key, value) in data {
            record.data.insert(key.clone(), value.clone());
        }
        Ok(record.clone())
    }

    async fn delete_record(
        &self,
        caller: &CallerMetadata,
        entity: &str,
        record_id: &str,
    ) -> Result<DeleteOutcome, ServiceError> {
        self.seen(caller);
        let removed = self
            .records
            .lock()
            .unwrap()
            .remove(&(entity.to_string(), record_id.to_string()))
            .is_some();
        Ok(DeleteOutcome {
            success: removed,
            message: if removed { "Deleted" } else { "Not found" }.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Invite { email: String, link: String },
    TemporaryCredentials { email: String, password: String },
    PasswordReset { email: String, link: String },
}

/// Keeps every delivery in memory; can be told to fail.
#[derive(Default)]
pub struct FlakyNotifier {
    sent: Mutex<Vec<Delivery>>,
    pub failures: Failures,
}

impl FlakyNotifier {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, delivery: Delivery) {
        self.sent.lock().unwrap().push(delivery);
    }
}

#[async_trait]
impl Notifier for FlakyNotifier {
    async fn send_invite(&self, email: &str, link: &str) -> Result<(), ServiceError> {
        self.failures.check("send_invite")?;
        self.record(Delivery::Invite {
            email: email.to_string(),
            link: link.to_string(),
        });
        Ok(())
    }

    async fn send_temporary_credentials(
        &self,
        email: &str,
        temporary_password: &str,
    ) -> Result<(), ServiceError> {
        self.failures.check("send_temporary_credentials")?;
        self.record(Delivery::TemporaryCredentials {
            email: email.to_string(),
            password: temporary_password.to_string(),
        });
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, link: &str) -> Result<(), ServiceError> {
        self.failures.check("send_password_reset")?;
        self.record(Delivery::PasswordReset {
            email: email.to_string(),
            link: link.to_string(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub identity: Arc<FakeIdentity>,
    pub rbac: Arc<FlakyRbac>,
    pub tenants: Arc<FakeTenantBackend>,
    pub records: Arc<FakeRecordBackend>,
    pub notifier: Arc<FlakyNotifier>,
    pub state: AppState,
}

pub fn test_config(vars: &[(&str, &str)]) -> GatewayConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    GatewayConfig::from_lookup(service_core::config::Config::default(), |key| {
        vars.get(key).cloned()
    })
    .expect("test config")
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config(&[("FRONTEND_URL", "https://app.test")]))
    }

    pub fn with_global_mfa() -> Self {
        Self::with_config(test_config(&[
            ("FRONTEND_URL", "https://app.test"),
            ("GLOBAL_MFA_ENFORCED", "true"),
        ]))
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        let identity = Arc::new(FakeIdentity::new());
        let rbac = Arc::new(FlakyRbac::new());
        let tenants = Arc::new(FakeTenantBackend::new());
        let records = Arc::new(FakeRecordBackend::new());
        let notifier = Arc::new(FlakyNotifier::default());

        let providers = Providers {
            auth: identity.clone(),
            iam: identity.clone(),
            rbac: rbac.clone(),
            mfa: identity.clone(),
            tenants: tenants.clone(),
            records: records.clone(),
            notifier: notifier.clone(),
        };

        Self {
            state: AppState::new(config, providers),
            identity,
            rbac,
            tenants,
            records,
            notifier,
        }
    }

    /// Mint a session and resolve it the way the HTTP middleware does.
    pub async fn context(
        &self,
        user_id: &str,
        payload: SessionTrustPayload,
        tenant_id: Option<&str>,
    ) -> (RequestContext, SessionTokens) {
        let issued = self
            .identity
            .create_session(user_id, &payload)
            .await
            .expect("session");
        let ctx = self
            .state
            .resolver
            .resolve(
                Some(&issued.tokens.access_token),
                tenant_id.map(str::to_string),
            )
            .await;
        (ctx, issued.tokens)
    }

    pub async fn trusted(&self, user_id: &str, tenant_id: Option<&str>) -> RequestContext {
        self.context(user_id, SessionTrustPayload::default(), tenant_id)
            .await
            .0
    }

    /// A user who owns a freshly provisioned tenant, with a context scoped to it.
    pub async fn tenant_admin(&self, email: &str) -> (User, Tenant, RequestContext) {
        let user = self.identity.seed_user(email, "Passw0rd!");
        let ctx = self.trusted(&user.id, None).await;
        let tenant = self
            .state
            .iam_service
            .create_own_tenant(&ctx, "Acme")
            .await
            .expect("tenant provisioning");
        let ctx = self.trusted(&user.id, Some(&tenant.id)).await;
        (user, tenant, ctx)
    }
}
