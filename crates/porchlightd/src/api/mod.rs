//! HTTP API for the porchlightd daemon

pub mod auth;
pub mod health;
pub mod sdk;
pub mod sites;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::sessions::require_session;
use crate::state::AppState;

pub use auth::{LoginRequest, MeResponse, RegisterRequest};
pub use health::HealthResponse;
pub use sites::{AddDomainRequest, CreateSiteRequest, CreateSiteResponse, UpdateSiteRequest};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors_enabled = state.config.cors_enabled;
    // The loader fetches /sdk/site-config from arbitrary third-party
    // origins; the session cookie is SameSite=Lax and never rides on
    // those requests.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes - no session required
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/sdk/site-config", get(sdk::site_config))
        .route("/sdk/loader", get(sdk::loader));

    // Session-protected routes
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/sites", post(sites::create_site))
        .route("/sites", get(sites::list_sites))
        .route("/sites/{id}", get(sites::get_site))
        .route("/sites/{id}", patch(sites::update_site))
        .route("/sites/{id}/domains", post(sites::add_domain))
        .route("/sites/{id}/settings/{key}", put(sites::set_setting))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        app.layer(cors)
    } else {
        app
    }
}
