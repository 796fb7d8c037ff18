// Brandforge - multi-agent AI agency server for brand identity design

pub mod agents;
pub mod cache;
pub mod config;
pub mod db;
pub mod extract;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scrape;
pub mod stream;   // Multiplexed frame protocol (producer + consumer sides)
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
// Note: Import specific items from types module instead of glob to avoid name conflicts
// e.g., use brandforge::types::{AppResult, ProviderError};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
