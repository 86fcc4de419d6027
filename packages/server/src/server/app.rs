//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::auth::JwtService;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    create_organization_handler, delete_organization_handler, get_organization_handler,
    health_handler, update_organization_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: Arc<ServerDeps>,
}

/// Build the Axum application router
///
/// Organization routes sit behind JWT authentication; `/health` is public.
pub fn build_app(deps: ServerDeps, jwt_service: Arc<JwtService>) -> Router {
    let app_state = AxumAppState {
        deps: Arc::new(deps),
    };

    // CORS configuration - allow any origin for development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let organizations = Router::new()
        .route("/api/v1/organizations", post(create_organization_handler))
        .route(
            "/api/v1/organizations/:id",
            get(get_organization_handler)
                .put(update_organization_handler)
                .delete(delete_organization_handler),
        )
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }));

    Router::new()
        .merge(organizations)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
