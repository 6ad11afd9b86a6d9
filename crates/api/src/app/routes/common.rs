use core::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;

use configserver_auth::Permission;
use configserver_core::DomainError;

use crate::app::errors;
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

/// Parse a path identifier, answering 400 on malformed input.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}

/// Require `permission`, answering 403 otherwise.
pub fn require(
    principal: &PrincipalContext,
    permission: &Permission,
) -> Result<(), axum::response::Response> {
    authorize_request(principal, permission).map_err(errors::forbidden)
}

/// Unwrap a JSON body; unreadable or incomplete bodies are a 400 validation error.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(value)| value).map_err(|rejection| {
        errors::domain_error_to_response(DomainError::validation(rejection.body_text()))
    })
}
