//! API Routes
//!
//! - `/api/agency` - the streaming agency turn endpoint
//! - `/api/brands/{id}` - load/save the persisted brand aggregate
//! - `/api/health` - health check

pub mod brands;
pub mod chat;
pub mod health;

use axum::Router;
use tracing::info;

use crate::middleware::cors::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let allowed_origins = state.config.server.cors_allowed_origins.clone();
    let router = Router::new()
        .merge(chat::router(state.clone()))
        .merge(brands::router(state))
        .merge(health::router())
        .layer(tower_http::trace::TraceLayer::new_for_http());

    apply_cors(router, &allowed_origins)
}
