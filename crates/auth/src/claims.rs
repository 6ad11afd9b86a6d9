use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use configserver_core::UserId;

use crate::Role;

/// JWT claims carried by access tokens.
///
/// `iat`/`exp` are seconds since the Unix epoch, as the JWT registered claims
/// require.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Username of the authenticated principal.
    pub sub: String,

    /// Stable user id (usernames could be reused after deletion).
    pub uid: UserId,

    /// Role granted at login time.
    pub role: Role,

    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(
        username: impl Into<String>,
        uid: UserId,
        role: Role,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: username.into(),
            uid,
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed or badly signed token: {0}")]
    Malformed(String),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Deterministically validate the time window of a claim set.
///
/// Signature verification happens in the codec; this only looks at the clock.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.exp <= claims.iat {
        return Err(TokenError::InvalidTimeWindow);
    }

    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenError::NotYetValid);
    }

    if now >= claims.exp {
        return Err(TokenError::Expired);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(now: DateTime<Utc>, ttl_secs: i64) -> JwtClaims {
        JwtClaims::new("admin", UserId::new(), Role::Admin, now, Duration::seconds(ttl_secs))
    }

    #[test]
    fn fresh_claims_are_valid() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims_at(now, 60), now), Ok(()));
    }

    #[test]
    fn expired_claims_are_rejected() {
        let now = Utc::now();
        let claims = claims_at(now - Duration::minutes(10), 60);
        assert_eq!(validate_claims(&claims, now), Err(TokenError::Expired));
    }

    #[test]
    fn future_claims_are_rejected() {
        let now = Utc::now();
        let claims = claims_at(now + Duration::minutes(10), 60);
        assert_eq!(validate_claims(&claims, now), Err(TokenError::NotYetValid));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let claims = claims_at(now, -5);
        assert_eq!(validate_claims(&claims, now), Err(TokenError::InvalidTimeWindow));
    }
}
