//! Club Site Backend
//!
//! REST backend for a student club website: the public team roster with its
//! display ordering and derived categories, registrations, and an
//! authenticated area for managing members, yearly roles and profile images.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod crop;
pub mod db;
pub mod errors;
pub mod mailer;
pub mod media;
pub mod models;
pub mod team;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;
use mailer::Mailer;
use media::MediaStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub media: Arc<dyn MediaStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Multipart bodies carry up to a batch of images plus form fields
    let body_limit =
        state.config.max_upload_bytes * (api::MAX_FILES_PER_UPLOAD + 1) + 64 * 1024;

    let public_routes = Router::new()
        .route("/team", get(api::get_team))
        .route("/team/years", get(api::list_team_years))
        .route("/registrations", post(api::submit_registration))
        .route("/auth/login", post(api::login));

    let member_routes = Router::new()
        .route("/auth/logout", post(api::logout))
        .route("/revision", get(api::get_revision))
        .route("/me", get(api::get_me).put(api::update_me))
        .route("/uploads", post(api::upload_images))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_layer,
        ));

    let admin_routes = Router::new()
        .route("/members", get(api::list_members).post(api::invite_member))
        .route("/members/display-order", put(api::update_display_order))
        .route(
            "/members/{id}",
            get(api::get_member)
                .put(api::update_member)
                .delete(api::delete_member),
        )
        .route("/members/{id}/active", patch(api::toggle_member_active))
        .route("/members/{id}/password", post(api::reset_password))
        .route("/registrations", get(api::list_registrations))
        .route("/registrations/{id}", delete(api::delete_registration))
        // session_layer is outermost, so it runs before admin_layer
        .layer(middleware::from_fn(auth::admin_layer))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_layer,
        ));

    let api_routes = public_routes.merge(member_routes).merge(admin_routes);

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
