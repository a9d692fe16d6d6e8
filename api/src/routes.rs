use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::PriceBarResponse;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DateFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub fetched: usize,
    pub inserted: usize,
}

pub fn app_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/stocks/:symbol",
            get(get_stock_data).post(update_stock_data),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Credentials are allowed, so methods and headers are mirrored instead of `*`.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Fetches the latest bars for `symbol` and stores the new ones.
async fn update_stock_data(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<(StatusCode, Json<RefreshResponse>)> {
    info!("Refresh requested for {}", symbol);
    let outcome = state.stocks.refresh(&state.db, &symbol).await?;

    Ok((
        StatusCode::CREATED,
        Json(RefreshResponse {
            message: outcome.message(),
            fetched: outcome.fetched(),
            inserted: outcome.inserted(),
        }),
    ))
}

/// Stored bars for `symbol`, optionally filtered by `start_date`/`end_date` (YYYY-MM-DD).
async fn get_stock_data(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(filter): Query<DateFilter>,
) -> ApiResult<Json<Vec<PriceBarResponse>>> {
    let rows = state
        .stocks
        .query(
            &state.db,
            &symbol,
            filter.start_date.as_deref(),
            filter.end_date.as_deref(),
        )
        .await?;
    Ok(Json(rows))
}
