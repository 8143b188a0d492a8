//! Orchestration services.
//!
//! Each service composes the provider traits with the session trust gate and
//! the policy engine. Handlers call these and nothing below them.

mod auth;
mod data;
pub mod error;
mod iam;
mod mfa;
pub mod notifier;
pub mod policy;
mod provisioning;
mod rbac;
pub mod saga;

pub use auth::AuthService;
pub use data::DataService;
pub use error::ServiceError;
pub use iam::IamService;
pub use mfa::MfaService;
pub use notifier::{LoggingNotifier, Notifier, SmtpNotifier};
pub use policy::{AccessDecision, DenyReason, PolicyService};
pub use rbac::RbacService;
pub use saga::{Saga, SagaStep};
