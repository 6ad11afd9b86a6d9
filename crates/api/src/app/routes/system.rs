use axum::{Json, extract::Extension, response::IntoResponse};
use serde_json::json;

use configserver_catalog::Environment;

use crate::context::PrincipalContext;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}

pub async fn environments() -> impl IntoResponse {
    Json(
        Environment::ALL
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>(),
    )
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(json!({
        "userId": principal.user_id().to_string(),
        "username": principal.username(),
        "role": principal.role().as_str(),
        "permissions": principal
            .principal()
            .permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect::<Vec<_>>(),
    }))
}
