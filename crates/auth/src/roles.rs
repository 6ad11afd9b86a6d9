use serde::{Deserialize, Serialize};

use configserver_core::DomainError;

/// Role granted to a user account.
///
/// - `Admin`: everything, including user management.
/// - `Editor`: read and write configuration, read the audit trail.
/// - `ReadOnly`: read configuration only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Editor,
    ReadOnly,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Editor => "EDITOR",
            Role::ReadOnly => "READ_ONLY",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "EDITOR" => Ok(Role::Editor),
            "READ_ONLY" => Ok(Role::ReadOnly),
            other => Err(DomainError::validation(format!(
                "invalid role '{other}' (expected ADMIN, EDITOR or READ_ONLY)"
            ))),
        }
    }
}
