use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "config.write").
/// The wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    pub const CONFIG_READ: Permission = Permission(Cow::Borrowed("config.read"));
    pub const CONFIG_WRITE: Permission = Permission(Cow::Borrowed("config.write"));
    pub const AUDIT_READ: Permission = Permission(Cow::Borrowed("audit.read"));
    pub const USERS_MANAGE: Permission = Permission(Cow::Borrowed("users.manage"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static role -> permission policy.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![Permission::WILDCARD],
        Role::Editor => vec![
            Permission::CONFIG_READ,
            Permission::CONFIG_WRITE,
            Permission::AUDIT_READ,
        ],
        Role::ReadOnly => vec![Permission::CONFIG_READ],
    }
}
