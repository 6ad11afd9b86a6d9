use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::routes::common::json_body;
use crate::app::{AppServices, dto, errors};

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(body) {
        Ok(b) => b,
        Err(r) => return r,
    };
    match services.users.login(&body.username, &body.password).await {
        Ok(login) => (
            StatusCode::OK,
            Json(dto::LoginResponse {
                id: login.user.id,
                token: login.token,
                username: login.user.username,
                role: login.user.role,
            }),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
