use serde::Serialize;
use thiserror::Error;

use configserver_core::{DomainError, UserId};

use crate::{JwtClaims, Permission, Role, permissions::permissions_for};

/// A fully resolved principal for authorization decisions.
///
/// Built from validated token claims; carries nothing but identity and role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.uid,
            username: claims.sub.clone(),
            role: claims.role,
        }
    }

    pub fn permissions(&self) -> Vec<Permission> {
        permissions_for(self.role)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        DomainError::forbidden(err.to_string())
    }
}

/// Authorize a principal against a single permission.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions()
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: UserId::new(),
            username: "someone".to_string(),
            role,
        }
    }

    #[test]
    fn admin_is_granted_everything() {
        let admin = principal(Role::Admin);
        for perm in [
            Permission::CONFIG_READ,
            Permission::CONFIG_WRITE,
            Permission::AUDIT_READ,
            Permission::USERS_MANAGE,
        ] {
            assert!(authorize(&admin, &perm).is_ok());
        }
    }

    #[test]
    fn editor_cannot_manage_users() {
        let editor = principal(Role::Editor);
        assert!(authorize(&editor, &Permission::CONFIG_WRITE).is_ok());
        assert!(authorize(&editor, &Permission::AUDIT_READ).is_ok());
        assert_eq!(
            authorize(&editor, &Permission::USERS_MANAGE),
            Err(AuthzError::Forbidden("users.manage".to_string()))
        );
    }

    #[test]
    fn read_only_cannot_write() {
        let viewer = principal(Role::ReadOnly);
        assert!(authorize(&viewer, &Permission::CONFIG_READ).is_ok());
        assert!(authorize(&viewer, &Permission::CONFIG_WRITE).is_err());
        assert!(authorize(&viewer, &Permission::AUDIT_READ).is_err());
    }
}
