//! User accounts and password-reset tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use configserver_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

/// A user account.
///
/// # Invariants
/// - `username` and `email` are unique (store-enforced).
/// - `password_hash` is a bcrypt hash, never plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(draft: &NewUser, password_hash: String, now: DateTime<Utc>) -> DomainResult<Self> {
        draft.validate()?;
        Ok(Self {
            id: UserId::new(),
            username: draft.username.trim().to_string(),
            email: draft.email.trim().to_string(),
            password_hash,
            role: draft.role,
            enabled: true,
            created_at: now,
            last_login: None,
        })
    }

    /// Apply an admin edit. The username is immutable.
    pub fn apply(&mut self, update: &UserUpdate) -> DomainResult<()> {
        let email = validate_email(&update.email)?;
        self.email = email;
        self.role = update.role;
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        Ok(())
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Admin request to create an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> DomainResult<()> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(DomainError::validation("username must not be blank"));
        }
        if username.len() > 64 {
            return Err(DomainError::validation("username must be at most 64 characters"));
        }
        validate_email(&self.email)?;
        Ok(())
    }
}

/// Admin edit of an existing account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub email: String,
    pub role: Role,
    pub enabled: Option<bool>,
}

fn validate_email(email: &str) -> DomainResult<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email.to_string()),
        _ => Err(DomainError::validation(format!("invalid email address '{email}'"))),
    }
}

/// Single-use token that authorizes setting a new password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn issue(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewUser {
        NewUser {
            username: " alice ".to_string(),
            email: "alice@example.com".to_string(),
            role: Role::Editor,
        }
    }

    #[test]
    fn new_user_is_enabled_and_trimmed() {
        let user = User::new(&draft(), "hash".to_string(), Utc::now()).unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.enabled);
        assert_eq!(user.last_login, None);
    }

    #[test]
    fn rejects_bad_email() {
        for email in ["", "alice", "@example.com", "alice@localhost"] {
            let mut d = draft();
            d.email = email.to_string();
            assert!(matches!(d.validate(), Err(DomainError::Validation(_))), "{email:?}");
        }
    }

    #[test]
    fn apply_updates_email_role_and_enabled() {
        let mut user = User::new(&draft(), "hash".to_string(), Utc::now()).unwrap();
        user.apply(&UserUpdate {
            email: "a@corp.example".to_string(),
            role: Role::ReadOnly,
            enabled: Some(false),
        })
        .unwrap();
        assert_eq!(user.email, "a@corp.example");
        assert_eq!(user.role, Role::ReadOnly);
        assert!(!user.enabled);
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn reset_token_expires() {
        let now = Utc::now();
        let token = PasswordResetToken::issue(UserId::new(), now, Duration::hours(24));
        assert!(!token.is_expired(now));
        assert!(token.is_expired(now + Duration::hours(24)));
    }
}
