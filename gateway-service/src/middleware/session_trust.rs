//! Session trust gating for protected operations.
//!
//! Every protected operation declares a `GuardOptions`. Before it runs, the
//! caller's session payload is reduced to a single `TrustState`:
//!
//! 1. no session                                   -> `NoSession`
//! 2. password change pending, not allowed here    -> `PasswordChangeRequired`
//! 3. MFA enforced, no device, setup not allowed   -> `MfaSetupRequired`
//! 4. device present, session unverified, required -> `MfaVerifyRequired`
//! 5. otherwise                                    -> `Trusted`
//!
//! The order is fixed. Password change always wins over MFA, and the two MFA
//! states are exclusive (device absent vs. present-but-unverified).

use std::future::Future;

use crate::context::RequestContext;
use crate::models::{Session, SessionTrustPayload};
use crate::services::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardOptions {
    pub require_mfa_verification: bool,
    pub allow_mfa_setup: bool,
    pub allow_password_change: bool,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self::STRICT
    }
}

impl GuardOptions {
    pub const STRICT: GuardOptions = GuardOptions {
        require_mfa_verification: true,
        allow_mfa_setup: false,
        allow_password_change: false,
    };

    pub const fn without_mfa_verification(mut self) -> Self {
        self.require_mfa_verification = false;
        self
    }

    pub const fn allowing_mfa_setup(mut self) -> Self {
        self.allow_mfa_setup = true;
        self
    }

    pub const fn allowing_password_change(mut self) -> Self {
        self.allow_password_change = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustState {
    NoSession,
    PasswordChangeRequired,
    MfaSetupRequired,
    MfaVerifyRequired,
    Trusted,
}

impl TrustState {
    pub fn evaluate(
        payload: Option<&SessionTrustPayload>,
        global_mfa_enforced: bool,
        options: GuardOptions,
    ) -> Self {
        let Some(payload) = payload else {
            return TrustState::NoSession;
        };

        if payload.requires_password_change && !options.allow_password_change {
            return TrustState::PasswordChangeRequired;
        }

        let enforced = payload.mfa_enforced || global_mfa_enforced;
        if enforced && !payload.mfa_enabled {
            if !options.allow_mfa_setup {
                return TrustState::MfaSetupRequired;
            }
        } else if payload.mfa_enabled
            && !payload.mfa_verified
            && options.require_mfa_verification
        {
            return TrustState::MfaVerifyRequired;
        }

        TrustState::Trusted
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        match self {
            TrustState::NoSession => Err(ServiceError::Unauthenticated(
                "Unauthenticated. Please log in.".to_string(),
            )),
            TrustState::PasswordChangeRequired => Err(ServiceError::PasswordChangeRequired),
            TrustState::MfaSetupRequired => Err(ServiceError::MfaSetupRequired),
            TrustState::MfaVerifyRequired => Err(ServiceError::MfaVerifyRequired),
            TrustState::Trusted => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionTrustGate {
    global_mfa_enforced: bool,
}

impl SessionTrustGate {
    pub fn new(global_mfa_enforced: bool) -> Self {
        Self {
            global_mfa_enforced,
        }
    }

    pub fn global_mfa_enforced(&self) -> bool {
        self.global_mfa_enforced
    }

    pub fn state(&self, ctx: &RequestContext, options: GuardOptions) -> TrustState {
        TrustState::evaluate(
            ctx.session.as_ref().map(|s| &s.payload),
            self.global_mfa_enforced,
            options,
        )
    }

    /// Admit the caller or fail with the gate's error.
    pub fn admit<'a>(
        &self,
        ctx: &'a RequestContext,
        options: GuardOptions,
    ) -> Result<&'a Session, ServiceError> {
        let state = self.state(ctx, options);
        if state != TrustState::Trusted {
            tracing::debug!(state = ?state, user_id = ?ctx.user_id(), "Session trust gate rejected request");
        }
        state.into_result()?;
        ctx.session.as_ref().ok_or_else(|| {
            ServiceError::Unauthenticated("Unauthenticated. Please log in.".to_string())
        })
    }

    /// Run `operation` only if the caller passes the gate.
    pub async fn protect<'a, F, Fut, T>(
        &self,
        ctx: &'a RequestContext,
        options: GuardOptions,
        operation: F,
    ) -> Result<T, ServiceError>
    where
        F: FnOnce(&'a Session) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let session = self.admit(ctx, options)?;
        operation(session).await
    }
}
