//! bcrypt password hashing.

use configserver_core::{DomainError, DomainResult};

pub const MIN_PASSWORD_LEN: usize = 8;

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plain: &str) -> DomainResult<String> {
        bcrypt::hash(plain, self.cost).map_err(|e| DomainError::storage(format!("password hashing failed: {e}")))
    }

    /// Malformed stored hashes verify as `false`.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        bcrypt::verify(plain, hash).unwrap_or(false)
    }
}

/// Check a new password and its confirmation.
pub fn validate_new_password(password: &str, confirm: &str) -> DomainResult<()> {
    if password != confirm {
        return Err(DomainError::validation("passwords do not match"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("wrong horse", &hash));
        assert!(!hasher.verify("correct horse", "not-a-bcrypt-hash"));
    }

    #[test]
    fn new_password_rules() {
        assert!(validate_new_password("longenough", "longenough").is_ok());
        assert!(matches!(
            validate_new_password("longenough", "different1"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            validate_new_password("short", "short"),
            Err(DomainError::Validation(_))
        ));
    }
}
