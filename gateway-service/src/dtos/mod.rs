//! Request bodies accepted by the HTTP surface.

pub mod auth;
pub mod data;
pub mod iam;
pub mod mfa;
pub mod rbac;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
