use axum::{
    Router,
    routing::{get, post},
};

pub mod audit;
pub mod auth;
pub mod common;
pub mod groups;
pub mod items;
pub mod system;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/environments", get(system::environments))
        .route("/api/users/forgot-password", post(users::forgot_password))
        .route("/api/users/validate-token", get(users::validate_token))
        .route("/api/users/reset-password", post(users::reset_password))
}

/// Endpoints behind the auth middleware.
pub fn protected_router() -> Router {
    Router::new()
        .route("/api/whoami", get(system::whoami))
        .nest("/api/groups", groups::router())
        .nest("/api/items", items::router())
        .nest("/api/audit", audit::router())
        .nest("/api/users", users::router())
}
