use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use configserver_auth::Permission;
use configserver_core::{GroupId, ItemId};

use crate::app::routes::common::{json_body, parse_id, require};
use crate::app::{AppServices, dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/group/:group_id", get(list_items_by_group))
        .route(
            "/group/:group_id/environment/:environment",
            get(list_items_by_group_and_env),
        )
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_READ) {
        return r;
    }
    match services.config.list_items().await {
        Ok(items) => Json(dto::list::<_, dto::ItemResponse>(items)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_READ) {
        return r;
    }
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.config.get_item(id).await {
        Ok(item) => Json(dto::ItemResponse::from(item)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_items_by_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(group_id): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_READ) {
        return r;
    }
    let group_id: GroupId = match parse_id(&group_id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.config.list_items_by_group(group_id).await {
        Ok(items) => Json(dto::list::<_, dto::ItemResponse>(items)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_items_by_group_and_env(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((group_id, environment)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_READ) {
        return r;
    }
    let group_id: GroupId = match parse_id(&group_id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services
        .config
        .list_items_by_group_and_env(group_id, &environment)
        .await
    {
        Ok(items) => Json(dto::list::<_, dto::ItemResponse>(items)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::ItemRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_WRITE) {
        return r;
    }
    let body = match json_body(body) {
        Ok(b) => b,
        Err(r) => return r,
    };
    let draft = match body.into_draft() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services
        .config
        .create_item(&draft, &principal.acting_user())
        .await
    {
        Ok(item) => (StatusCode::CREATED, Json(dto::ItemResponse::from(item))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::ItemRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_WRITE) {
        return r;
    }
    let body = match json_body(body) {
        Ok(b) => b,
        Err(r) => return r,
    };
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let draft = match body.into_draft() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services
        .config
        .update_item(id, &draft, &principal.acting_user())
        .await
    {
        Ok(item) => Json(dto::ItemResponse::from(item)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::CONFIG_WRITE) {
        return r;
    }
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.config.delete_item(id, &principal.acting_user()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
