use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use configserver_auth::Permission;
use configserver_catalog::EntityType;
use configserver_core::DomainError;

use crate::app::routes::common::require;
use crate::app::{AppServices, dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(recent_audit))
        .route("/:entity_type/:entity_id", get(audit_for_entity))
}

pub async fn recent_audit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AuditQuery>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::AUDIT_READ) {
        return r;
    }
    match services.config.recent_audit(query.limit).await {
        Ok(entries) => Json(dto::list::<_, dto::AuditEntryResponse>(entries)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn audit_for_entity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(r) = require(&principal, &Permission::AUDIT_READ) {
        return r;
    }
    let entity_type: EntityType = match entity_type.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let entity_id: Uuid = match entity_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::domain_error_to_response(DomainError::validation(format!(
                "invalid entity id '{entity_id}'"
            )));
        }
    };
    match services.config.audit_for_entity(entity_type, entity_id).await {
        Ok(entries) => Json(dto::list::<_, dto::AuditEntryResponse>(entries)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
