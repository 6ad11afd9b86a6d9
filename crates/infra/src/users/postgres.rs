//! Postgres user store.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use configserver_auth::{PasswordResetToken, Role, User};
use configserver_core::UserId;

use super::UserStore;
use crate::pg::{map_sqlx_error, parse_column};
use crate::store::StoreResult;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, enabled, created_at, last_login";

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_user(&self, operation: &str, column: &str, value: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.as_ref().map(user_from_row).transpose()
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let read = |e: sqlx::Error| map_sqlx_error("decode users row", e);
    let role: String = row.try_get("role").map_err(read)?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(read)?),
        username: row.try_get("username").map_err(read)?,
        email: row.try_get("email").map_err(read)?,
        password_hash: row.try_get("password_hash").map_err(read)?,
        role: parse_column::<Role>("role", &role)?,
        enabled: row.try_get("enabled").map_err(read)?,
        created_at: row.try_get("created_at").map_err(read)?,
        last_login: row.try_get("last_login").map_err(read)?,
    })
}

fn token_from_row(row: &PgRow) -> StoreResult<PasswordResetToken> {
    let read = |e: sqlx::Error| map_sqlx_error("decode password_reset_tokens row", e);
    Ok(PasswordResetToken {
        token: row.try_get("token").map_err(read)?,
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(read)?),
        expires_at: row.try_get("expires_at").map_err(read)?,
    })
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.fetch_user("user_by_username", "username", username).await
    }

    #[instrument(skip(self), err)]
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.fetch_user("user_by_email", "email", email).await
    }

    #[instrument(skip(self), err)]
    async fn users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id, username = %user.username), err)]
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, enabled, created_at, last_login) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.enabled)
        .bind(user.created_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let done = sqlx::query(
            "UPDATE users SET email = $2, password_hash = $3, role = $4, enabled = $5, last_login = $6 \
             WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.enabled)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        Ok(done.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(done.rows_affected() == 1)
    }

    #[instrument(skip(self, token), fields(user_id = %token.user_id), err)]
    async fn put_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token, user_id, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at",
        )
        .bind(&token.token)
        .bind(token.user_id.as_uuid())
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_reset_token", e))?;
        Ok(())
    }

    #[instrument(skip_all, err)]
    async fn reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        let row = sqlx::query(
            "SELECT token, user_id, expires_at FROM password_reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("reset_token", e))?;
        row.as_ref().map(token_from_row).transpose()
    }

    #[instrument(skip_all, err)]
    async fn delete_reset_token(&self, token: &str) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM password_reset_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_reset_token", e))?;
        Ok(done.rows_affected() == 1)
    }

    #[instrument(skip_all, err)]
    async fn redeem_reset_token(&self, token: &str, password_hash: &str) -> StoreResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("redeem_reset_token", e))?;
        let user_id: Option<uuid::Uuid> = sqlx::query_scalar(
            "DELETE FROM password_reset_tokens WHERE token = $1 RETURNING user_id",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("redeem_reset_token", e))?;
        let Some(user_id) = user_id else {
            return Ok(false);
        };
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("redeem_reset_token", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("redeem_reset_token", e))?;
        Ok(true)
    }
}
