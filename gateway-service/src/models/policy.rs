//! Tenant-scoped role policy model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The role every tenant creator receives. Its policy cannot be edited.
pub const ADMIN_ROLE: &str = "admin";

/// Roles whose policies are managed by the gateway, never by tenant admins.
pub const SYSTEM_ROLES: &[&str] = &[ADMIN_ROLE];

/// Entity namespace guarding role, policy and membership management.
pub const SYSTEM_IAM_ENTITY: &str = "system_iam";

/// Fallback entity key consulted when no entity-specific rule exists.
pub const WILDCARD_ENTITY: &str = "*";

pub fn is_system_role(role: &str) -> bool {
    SYSTEM_ROLES.contains(&role)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "create")]
    Create,
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "update")]
    Update,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "*")]
    All,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::All => "*",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "*" => Ok(Action::All),
            _ => Err(format!("Invalid action: {}", s)),
        }
    }
}

/// Access rule for one entity (or the wildcard entity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPermission {
    pub access: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied_fields: Option<Vec<String>>,
}

impl EntityPermission {
    pub fn full() -> Self {
        Self {
            access: true,
            actions: vec![Action::All],
            denied_fields: None,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.access && self.actions.iter().any(|a| *a == Action::All || *a == action)
    }
}

/// Entity name -> rule. Serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(pub BTreeMap<String, EntityPermission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entity: impl Into<String>, rule: EntityPermission) -> Self {
        self.0.insert(entity.into(), rule);
        self
    }

    /// The rule governing `entity`: its own entry, else the wildcard entry.
    pub fn rule_for(&self, entity: &str) -> Option<&EntityPermission> {
        self.0.get(entity).or_else(|| self.0.get(WILDCARD_ENTITY))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_required: Option<bool>,
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl RolePolicy {
    /// Policy installed for the creator of a new tenant.
    pub fn root_admin() -> Self {
        Self {
            description: Some("Root Admin Policy".to_string()),
            mfa_required: Some(true),
            permissions: PermissionSet::new()
                .with(SYSTEM_IAM_ENTITY, EntityPermission::full())
                .with(WILDCARD_ENTITY, EntityPermission::full()),
        }
    }

    pub fn requires_mfa(&self) -> bool {
        self.mfa_required.unwrap_or(false)
    }
}

/// A role name together with its policy, as listed for tenant admins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Role {
    pub name: String,
    pub policy: Option<RolePolicy>,
}
