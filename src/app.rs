//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! Route composition lives here to keep `main` small and the router testable
//! in-process.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::token::TokenKeys;
use crate::store::AuthStore;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuthStore + Send + Sync>,
    pub token_keys: TokenKeys,
    pub session_ttl: Duration,
    pub reset_ttl: Duration,
    /// Gates the forgot-password token echo; see `api::auth::forgot_password`.
    pub dev_mode: bool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/signup", axum::routing::post(api::auth::signup))
        .route("/auth/signin", axum::routing::post(api::auth::signin))
        .route("/auth/signout", axum::routing::post(api::auth::signout))
        .route(
            "/auth/forgot-password",
            axum::routing::post(api::auth::forgot_password),
        )
        .route(
            "/auth/reset-password",
            axum::routing::post(api::auth::reset_password),
        )
        .route("/auth/me", axum::routing::get(api::auth::me))
        .route("/users", axum::routing::get(api::users::list_users))
        .route(
            "/users/:user_id",
            axum::routing::patch(api::users::update_profile),
        )
        .route(
            "/users/:user_id/role",
            axum::routing::patch(api::users::set_role),
        )
        .route(
            "/users/:user_id/active",
            axum::routing::patch(api::users::set_active),
        )
        .route(
            "/system/health",
            axum::routing::get(api::system::system_health),
        )
        .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
