use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use configserver_auth::Permission;
use configserver_core::GroupId;

use crate::app::routes::common::{json_body, parse_id, require};
use crate::app::{AppServices, dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/:id", get(get_group).put(update_group).delete(delete_group))
        .route("/name/:name", get(get_group_by_name))
}

pub async fn list_groups(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_READ) {
        return r;
    }
    match services.config.list_groups().await {
        Ok(groups) => Json(dto::list::<_, dto::GroupResponse>(groups)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_READ) {
        return r;
    }
    let id: GroupId = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.config.get_group(id).await {
        Ok(g) => Json(dto::GroupResponse::from(g)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_group_by_name(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(name): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_READ) {
        return r;
    }
    match services.config.get_group_by_name(&name).await {
        Ok(g) => Json(dto::GroupResponse::from(g)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::GroupRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_WRITE) {
        return r;
    }
    let body = match json_body(body) {
        Ok(b) => b,
        Err(r) => return r,
    };
    match services
        .config
        .create_group(&body.into_draft(), &principal.acting_user())
        .await
    {
        Ok(g) => (StatusCode::CREATED, Json(dto::GroupResponse::from(g))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::GroupRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_WRITE) {
        return r;
    }
    let body = match json_body(body) {
        Ok(b) => b,
        Err(r) => return r,
    };
    let id: GroupId = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services
        .config
        .update_group(id, &body.into_draft(), &principal.acting_user())
        .await
    {
        Ok(g) => Json(dto::GroupResponse::from(g)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_WRITE) {
        return r;
    }
    let id: GroupId = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.config.delete_group(id, &principal.acting_user()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
