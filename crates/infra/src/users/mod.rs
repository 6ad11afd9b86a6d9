//! Persistence for user accounts and password-reset tokens.

use async_trait::async_trait;

use configserver_auth::{PasswordResetToken, User};
use configserver_core::UserId;

use crate::store::StoreResult;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;

/// User account storage.
///
/// Usernames and emails are unique; `insert_user`/`update_user` fail with
/// `StoreError::UniqueViolation` otherwise. A user holds at most one reset
/// token, and deleting a user drops it.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// All users ordered by username.
    async fn users(&self) -> StoreResult<Vec<User>>;

    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn update_user(&self, user: &User) -> StoreResult<bool>;

    async fn delete_user(&self, id: UserId) -> StoreResult<bool>;

    /// Store `token`, replacing any token the user already holds.
    async fn put_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()>;

    async fn reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>>;

    async fn delete_reset_token(&self, token: &str) -> StoreResult<bool>;

    /// Set the password hash and consume `token` in one step.
    ///
    /// Returns `false` when the token was already consumed.
    async fn redeem_reset_token(&self, token: &str, password_hash: &str) -> StoreResult<bool>;
}

#[async_trait]
impl<S> UserStore for std::sync::Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        (**self).user(id).await
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        (**self).user_by_username(username).await
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        (**self).user_by_email(email).await
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        (**self).users().await
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        (**self).insert_user(user).await
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        (**self).update_user(user).await
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        (**self).delete_user(id).await
    }

    async fn put_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        (**self).put_reset_token(token).await
    }

    async fn reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        (**self).reset_token(token).await
    }

    async fn delete_reset_token(&self, token: &str) -> StoreResult<bool> {
        (**self).delete_reset_token(token).await
    }

    async fn redeem_reset_token(&self, token: &str, password_hash: &str) -> StoreResult<bool> {
        (**self).redeem_reset_token(token, password_hash).await
    }
}
