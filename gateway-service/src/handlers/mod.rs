//! HTTP handlers. Each one extracts input, calls a service and maps the error.

pub mod auth;
pub mod data;
pub mod iam;
pub mod metrics;
pub mod mfa;
pub mod rbac;
