use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use configserver_auth::Permission;
use configserver_core::{DomainError, UserId};

use crate::app::routes::common::{json_body, parse_id, require};
use crate::app::{AppServices, dto, errors};
use crate::context::PrincipalContext;

/// Same answer whether or not the address is known.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If the email exists, a password reset link will be sent";

/// Admin-only account management (mounted behind auth).
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::USERS_MANAGE) {
        return r;
    }
    match services.users.list_users().await {
        Ok(users) => Json(dto::list::<_, dto::UserResponse>(users)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::USERS_MANAGE) {
        return r;
    }
    let id: UserId = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.users.get_user(id).await {
        Ok(u) => Json(dto::UserResponse::from(u)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::USERS_MANAGE) {
        return r;
    }
    let body = match json_body(body) {
        Ok(b) => b,
        Err(r) => return r,
    };
    let draft = match body.into_new_user() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.users.create_user(&draft).await {
        Ok(u) => (StatusCode::CREATED, Json(dto::UserResponse::from(u))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateUserRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::USERS_MANAGE) {
        return r;
    }
    let body = match json_body(body) {
        Ok(b) => b,
        Err(r) => return r,
    };
    let id: UserId = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let update = match body.into_update() {
        Ok(u) => u,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.users.update_user(id, &update).await {
        Ok(u) => Json(dto::UserResponse::from(u)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::USERS_MANAGE) {
        return r;
    }
    let id: UserId = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.users.delete_user(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ForgotPasswordRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(body) {
        Ok(b) => b,
        Err(r) => return r,
    };
    let email = body.email.unwrap_or_default();
    if email.trim().is_empty() {
        return errors::domain_error_to_response(DomainError::validation("email is required"));
    }
    match services.users.forgot_password(&email).await {
        Ok(()) | Err(DomainError::NotFound(_)) => {}
        Err(e) => tracing::warn!(error = %e, "password reset request failed"),
    }
    Json(json!({ "message": FORGOT_PASSWORD_MESSAGE })).into_response()
}

pub async fn validate_token(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::TokenQuery>,
) -> axum::response::Response {
    match services.users.validate_reset_token(&query.token).await {
        Ok(valid) => Json(json!({ "valid": valid })).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::TokenQuery>,
    body: Result<Json<dto::ResetPasswordRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(body) {
        Ok(b) => b,
        Err(r) => return r,
    };
    match services
        .users
        .reset_password(&query.token, &body.password, &body.confirm_password)
        .await
    {
        Ok(()) => Json(json!({ "message": "Password reset successfully" })).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
