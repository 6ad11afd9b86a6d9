//! In-memory user store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use configserver_auth::{PasswordResetToken, User};
use configserver_core::{Entity, UserId};

use super::UserStore;
use crate::store::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    tokens: HashMap<String, PasswordResetToken>,
}

impl State {
    fn check_unique(&self, user: &User) -> StoreResult<()> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.username == user.username {
                return Err(StoreError::UniqueViolation("users_username_key".to_string()));
            }
            if other.email == user.email {
                return Err(StoreError::UniqueViolation("users_email_key".to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<State>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("user store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("user store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.write()?;
        state.check_unique(user)?;
        state.users.insert(*user.id(), user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let mut state = self.write()?;
        if !state.users.contains_key(&user.id) {
            return Ok(false);
        }
        state.check_unique(user)?;
        state.users.insert(*user.id(), user.clone());
        Ok(true)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        let mut state = self.write()?;
        let removed = state.users.remove(&id).is_some();
        state.tokens.retain(|_, t| t.user_id != id);
        Ok(removed)
    }

    async fn put_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.users.contains_key(&token.user_id) {
            return Err(StoreError::ForeignKeyViolation(
                "password_reset_tokens_user_id_fkey".to_string(),
            ));
        }
        state.tokens.retain(|_, t| t.user_id != token.user_id);
        state.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        Ok(self.read()?.tokens.get(token).cloned())
    }

    async fn delete_reset_token(&self, token: &str) -> StoreResult<bool> {
        Ok(self.write()?.tokens.remove(token).is_some())
    }

    async fn redeem_reset_token(&self, token: &str, password_hash: &str) -> StoreResult<bool> {
        let mut state = self.write()?;
        let Some(reset) = state.tokens.remove(token) else {
            return Ok(false);
        };
        match state.users.get_mut(&reset.user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
