//! Agency turn endpoint
//!
//! `POST /api/agency` runs the full persona pipeline for one user turn and
//! streams the multiplexed frame protocol back as chunked `text/plain`. The
//! pipeline runs in a spawned task writing into the frame channel; if the
//! client disconnects the receiver drops, every later send becomes a no-op
//! and the turn's results are discarded. The state extractor runs exactly
//! once, after the terminal task succeeds, and nothing is persisted from a
//! failed turn.

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::{run_agency_pipeline, AgencyDeps, Turn};
use crate::extract;
use crate::models::{AgencyRequest, AppState, BrandIdentity, ErrorResponse};
use crate::stream::FrameSink;
use crate::types::ImageData;
use crate::utils::retry::RetryConfig;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/agency", post(run_turn))
        .with_state(state)
}

async fn run_turn(
    State(state): State<AppState>,
    Json(request): Json<AgencyRequest>,
) -> Response {
    info!(
        message_len = request.new_message.content.len(),
        history_len = request.messages.len(),
        "agency turn received"
    );

    if state.config.llm.active_api_key().is_none() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "System configuration error: provider API key missing.".to_string(),
            }),
        )
            .into_response();
    }

    let brand_id = request.brand_id.unwrap_or_else(Uuid::new_v4);
    let image = request
        .new_message
        .image
        .as_deref()
        .and_then(ImageData::from_data_url);
    let turn = Turn {
        text: request.new_message.content,
        image,
        history: request.messages,
    };

    let deps = AgencyDeps {
        generator: state.generator.clone(),
        fetcher: state.fetcher.clone(),
        cache: state.cache.clone(),
        retry: RetryConfig {
            max_retries: state.config.llm.max_retries,
            base_delay: Duration::from_millis(state.config.llm.retry_base_delay_ms),
            jitter: true,
        },
    };
    let store = state.store.clone();

    let (sink, rx) = FrameSink::channel();
    tokio::spawn(async move {
        match run_agency_pipeline(&deps, &turn, &sink).await {
            Ok(full_text) => {
                persist_turn(store.as_ref(), brand_id, &full_text).await;
            }
            Err(e) => {
                // The user gets one generic notice, never a partial identity.
                warn!(brand = %brand_id, error = %e, "agency turn failed");
                sink.log("The agency could not complete this turn. Please try again.");
            }
        }
    });

    let body = Body::from_stream(
        UnboundedReceiverStream::new(rx)
            .map(|frame| Ok::<_, std::convert::Infallible>(frame.encode())),
    );
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// The single post-stream extractor pass. A missing or malformed structured
/// block skips the update; a storage failure skips persistence for the turn.
/// The raw text has already streamed to the user either way.
async fn persist_turn(store: &dyn crate::db::BrandStore, brand_id: Uuid, full_text: &str) {
    let existing = match store.load(brand_id).await {
        Ok(existing) => existing,
        Err(e) => {
            warn!(brand = %brand_id, error = %e, "brand load failed, skipping persistence");
            return;
        }
    };

    let mut aggregate = existing.unwrap_or_else(BrandIdentity::default);
    if !extract::apply_update(&mut aggregate, full_text) {
        info!(brand = %brand_id, "no structured update this turn");
        return;
    }

    match store.save(brand_id, &aggregate).await {
        Ok(()) => info!(brand = %brand_id, "brand aggregate updated"),
        Err(e) => warn!(brand = %brand_id, error = %e, "brand save failed"),
    }
}
