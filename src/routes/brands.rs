use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, put},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::models::{AppState, BrandIdentity, ErrorResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/brands/{brand_id}", get(load_brand))
        .route("/api/brands/{brand_id}", put(save_brand))
        .with_state(state)
}

async fn load_brand(
    State(state): State<AppState>,
    Path(brand_id): Path<Uuid>,
) -> Result<ResponseJson<BrandIdentity>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.load(brand_id).await {
        Ok(Some(identity)) => Ok(Json(identity)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("brand {brand_id} not found"),
            }),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e.to_string() }),
        )),
    }
}

async fn save_brand(
    State(state): State<AppState>,
    Path(brand_id): Path<Uuid>,
    Json(identity): Json<BrandIdentity>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    match state.store.save(brand_id, &identity).await {
        Ok(()) => {
            info!(brand = %brand_id, "brand saved");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e.to_string() }),
        )),
    }
}
