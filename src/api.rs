use crate::analysis_service::AnalysisService;
use crate::error::ErrorResult;
use crate::ticker::validate_ticker;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, instrument, warn};

pub type SharedAnalysisService = Arc<AnalysisService>;

/// Each analysis kicks off a multi-minute remote job, so callers are throttled per IP.
const ANALYSIS_PER_SECOND: u64 = 1;
const ANALYSIS_BURST: u32 = 5;

/// Builds the HTTP surface around a shared analysis service.
///
/// # Panics
///
/// Panics if `ANALYSIS_PER_SECOND` or `ANALYSIS_BURST` is zero, which the governor rejects.
pub fn router(service: SharedAnalysisService) -> Router {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(ANALYSIS_PER_SECOND)
            .burst_size(ANALYSIS_BURST)
            .finish()
            .expect("rate limit settings are non-zero"),
    );

    Router::new()
        .route(
            "/analysis/{symbol}",
            get(get_analysis_handler).layer(GovernorLayer::new(governor_conf)),
        )
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

#[instrument(skip(service))]
pub async fn get_analysis_handler(
    State(service): State<SharedAnalysisService>,
    Path(symbol): Path<String>,
) -> Response {
    debug!("Received analysis request");

    let ticker = match validate_ticker(&symbol) {
        Ok(ticker) => ticker,
        Err(e) => {
            warn!(error = %e, "Rejected invalid ticker");
            return (StatusCode::BAD_REQUEST, Json(ErrorResult::new(e.to_string()))).into_response();
        }
    };

    match service.analyze(&ticker).await {
        Ok(result) => {
            info!(ticker, fields = result.len(), "Returning analysis");
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(error) => {
            let status = if error.is_timeout() {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                StatusCode::BAD_GATEWAY
            };
            (status, Json(ErrorResult::from(&error))).into_response()
        }
    }
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
