//! Accounts, login and password reset.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use configserver_auth::{
    JwtClaims, JwtIssuer, NewUser, PasswordHasher, PasswordResetToken, User, UserUpdate,
    validate_new_password,
};
use configserver_core::{DomainError, DomainResult, UserId};

use crate::email::{EmailMessage, EmailSender, password_reset_email, welcome_email};
use crate::store::StoreError;
use crate::users::UserStore;

/// Returned for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "invalid username or password";

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    jwt: Arc<dyn JwtIssuer>,
    mailer: Arc<dyn EmailSender>,
    public_url: String,
    reset_ttl: Duration,
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        jwt: Arc<dyn JwtIssuer>,
        mailer: Arc<dyn EmailSender>,
        public_url: impl Into<String>,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            jwt,
            mailer,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            reset_ttl,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> DomainResult<LoginResponse> {
        let invalid = || DomainError::unauthorized(INVALID_CREDENTIALS);

        let Some(mut user) = self.store.user_by_username(username.trim()).await? else {
            return Err(invalid());
        };
        if !user.enabled || !self.verify(password, &user.password_hash).await? {
            return Err(invalid());
        }

        let now = Utc::now();
        user.last_login = Some(now);
        self.store.update_user(&user).await?;

        let claims = JwtClaims::new(&user.username, user.id, user.role, now, self.jwt.ttl());
        let token = self
            .jwt
            .issue(&claims)
            .map_err(|e| DomainError::storage(format!("failed to issue token: {e}")))?;

        info!(user_id = %user.id, username = %user.username, "login succeeded");
        Ok(LoginResponse { user, token })
    }

    pub async fn list_users(&self) -> DomainResult<Vec<User>> {
        Ok(self.store.users().await?)
    }

    pub async fn get_user(&self, id: UserId) -> DomainResult<User> {
        self.store
            .user(id)
            .await?
            .ok_or_else(|| user_not_found(id))
    }

    /// Create an account with a random password and mail a set-password link.
    pub async fn create_user(&self, draft: &NewUser) -> DomainResult<User> {
        let password = Uuid::new_v4().to_string();
        let user = self.insert(draft, &password).await?;

        let token = self.issue_reset_token(user.id).await?;
        let link = format!("{}/set-password?token={}", self.public_url, token.token);
        self.dispatch(welcome_email(&user.email, &user.username, &link));

        info!(user_id = %user.id, username = %user.username, role = %user.role, "user created");
        Ok(user)
    }

    /// Create an account with a known password and no email. Used by seeding.
    pub async fn provision_user(&self, draft: &NewUser, password: &str) -> DomainResult<User> {
        let user = self.insert(draft, password).await?;
        info!(user_id = %user.id, username = %user.username, role = %user.role, "user provisioned");
        Ok(user)
    }

    async fn insert(&self, draft: &NewUser, password: &str) -> DomainResult<User> {
        draft.validate()?;
        if self.store.user_by_username(draft.username.trim()).await?.is_some() {
            return Err(DomainError::conflict(format!(
                "username '{}' already exists",
                draft.username.trim()
            )));
        }
        if self.store.user_by_email(draft.email.trim()).await?.is_some() {
            return Err(email_taken(draft.email.trim()));
        }

        let hash = self.hash(password).await?;
        let user = User::new(draft, hash, Utc::now())?;
        self.store.insert_user(&user).await.map_err(on_user_write)?;
        Ok(user)
    }

    /// Admin edit of email, role and enabled flag.
    pub async fn update_user(&self, id: UserId, update: &UserUpdate) -> DomainResult<User> {
        let mut user = self.get_user(id).await?;
        user.apply(update)?;

        if let Some(holder) = self.store.user_by_email(&user.email).await? {
            if holder.id != id {
                return Err(email_taken(&user.email));
            }
        }
        if !self.store.update_user(&user).await.map_err(on_user_write)? {
            return Err(user_not_found(id));
        }

        info!(user_id = %id, role = %user.role, enabled = user.enabled, "user updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: UserId) -> DomainResult<()> {
        if !self.store.delete_user(id).await? {
            return Err(user_not_found(id));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Issue a reset token and mail the link.
    ///
    /// Fails `NotFound` for unknown addresses; the HTTP layer hides that.
    pub async fn forgot_password(&self, email: &str) -> DomainResult<()> {
        let email = email.trim();
        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or_else(|| DomainError::not_found("no user with that email"))?;

        let token = self.issue_reset_token(user.id).await?;
        let link = format!("{}/reset-password?token={}", self.public_url, token.token);
        self.dispatch(password_reset_email(&user.email, &user.username, &link));

        info!(user_id = %user.id, "password reset requested");
        Ok(())
    }

    pub async fn validate_reset_token(&self, token: &str) -> DomainResult<bool> {
        Ok(self
            .store
            .reset_token(token)
            .await?
            .is_some_and(|t| !t.is_expired(Utc::now())))
    }

    /// Consume `token` and set a new password.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm: &str,
    ) -> DomainResult<()> {
        validate_new_password(password, confirm)?;

        let reset = self
            .store
            .reset_token(token)
            .await?
            .ok_or_else(|| DomainError::validation("invalid token"))?;
        if reset.is_expired(Utc::now()) {
            self.store.delete_reset_token(token).await?;
            return Err(DomainError::validation("token has expired"));
        }

        let hash = self.hash(password).await?;
        if !self.store.redeem_reset_token(token, &hash).await? {
            return Err(DomainError::validation("invalid token"));
        }

        info!(user_id = %reset.user_id, "password reset completed");
        Ok(())
    }

    async fn issue_reset_token(&self, user_id: UserId) -> DomainResult<PasswordResetToken> {
        let token = PasswordResetToken::issue(user_id, Utc::now(), self.reset_ttl);
        self.store.put_reset_token(&token).await?;
        Ok(token)
    }

    // bcrypt blocks; run it on the blocking pool.
    async fn hash(&self, plain: &str) -> DomainResult<String> {
        let hasher = self.hasher;
        let plain = plain.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| DomainError::storage(format!("password hashing task failed: {e}")))?
    }

    async fn verify(&self, plain: &str, hash: &str) -> DomainResult<bool> {
        let hasher = self.hasher;
        let (plain, hash) = (plain.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(|e| DomainError::storage(format!("password verification task failed: {e}")))
    }

    /// Fire-and-forget; delivery failures are logged only.
    fn dispatch(&self, message: EmailMessage) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            let to = message.to.clone();
            if let Err(e) = mailer.send(message).await {
                warn!(to = %to, error = %e, "email delivery failed");
            }
        });
    }
}

fn user_not_found(id: UserId) -> DomainError {
    DomainError::not_found(format!("user {id} not found"))
}

fn email_taken(email: &str) -> DomainError {
    DomainError::conflict(format!("email '{email}' is already in use"))
}

fn on_user_write(err: StoreError) -> DomainError {
    match err {
        StoreError::UniqueViolation(constraint) => {
            DomainError::conflict(format!("user already exists ({constraint})"))
        }
        other => other.into(),
    }
}
