//! Permission evaluation and field-level redaction.
//!
//! Pure functions over a tenant role's `PermissionSet`; no I/O.

use crate::models::{Action, PermissionSet, Record};
use crate::services::ServiceError;

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No permission set was resolved (no session or no tenant context).
    NoPermissions,
    /// Neither an entity rule nor a wildcard rule exists, or the rule grants no access.
    AccessNotGranted { entity: String },
    /// The rule grants access but not this action.
    ActionNotPermitted { entity: String, action: Action },
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::NoPermissions => write!(f, "Access denied: No permissions found."),
            DenyReason::AccessNotGranted { entity } => {
                write!(f, "Access denied: You cannot access '{}'.", entity)
            }
            DenyReason::ActionNotPermitted { entity, action } => write!(
                f,
                "Access denied: You cannot perform '{}' on '{}'.",
                action, entity
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

#[derive(Debug, Clone)]
pub struct PolicyService;

impl PolicyService {
    /// Evaluate `action` on `entity` against the caller's permissions.
    ///
    /// The entity's own rule is authoritative when present; the `"*"` rule is
    /// consulted only when it is absent.
    pub fn check_access(
        permissions: Option<&PermissionSet>,
        entity: &str,
        action: Action,
    ) -> AccessDecision {
        let Some(permissions) = permissions else {
            return AccessDecision::Deny(DenyReason::NoPermissions);
        };

        let rule = match permissions.rule_for(entity) {
            Some(rule) if rule.access => rule,
            _ => {
                return AccessDecision::Deny(DenyReason::AccessNotGranted {
                    entity: entity.to_string(),
                })
            }
        };

        if rule.allows(action) {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny(DenyReason::ActionNotPermitted {
                entity: entity.to_string(),
                action,
            })
        }
    }

    /// `check_access` as a guard: denial becomes `Forbidden`.
    pub fn authorize(
        permissions: Option<&PermissionSet>,
        entity: &str,
        action: Action,
    ) -> Result<(), ServiceError> {
        match Self::check_access(permissions, entity, action) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(reason) => {
                tracing::debug!(entity = %entity, action = %action, reason = %reason, "Access denied");
                Err(ServiceError::Forbidden(reason.to_string()))
            }
        }
    }

    /// Strip the entity's denied fields from the record payload. Never fails.
    pub fn redact(mut record: Record, entity: &str, permissions: Option<&PermissionSet>) -> Record {
        let denied = permissions
            .and_then(|p| p.rule_for(entity))
            .and_then(|rule| rule.denied_fields.as_deref())
            .unwrap_or_default();

        for field in denied {
            record.data.remove(field);
        }
        record
    }

    pub fn redact_all(
        records: Vec<Record>,
        entity: &str,
        permissions: Option<&PermissionSet>,
    ) -> Vec<Record> {
        records
            .into_iter()
            .map(|record| Self::redact(record, entity, permissions))
            .collect()
    }
}
