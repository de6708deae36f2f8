//! HTTP surface: `/stock`, `/health`, `/debug`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use common::NormalizedSnapshot;
use serde::Serialize;
use serde_json::json;
use snapshot::{CachedView, RefreshCache};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub cache: Arc<RefreshCache>,
    pub started_at: Instant,
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockMeta {
    stale: bool,
    age_seconds: i64,
    last_scraped: String,
}

#[derive(Debug, Serialize)]
struct StockResponse<'a> {
    #[serde(flatten)]
    snapshot: &'a NormalizedSnapshot,
    #[serde(rename = "_meta")]
    meta: StockMeta,
}

impl<'a> StockResponse<'a> {
    fn from_view(view: &'a CachedView) -> Self {
        Self {
            snapshot: &view.snapshot,
            meta: StockMeta {
                stale: view.stale,
                age_seconds: view.age_seconds(),
                last_scraped: iso(view.last_scraped_at),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime: String,
    scrapes: u64,
    errors: u64,
    last_scraped: Option<String>,
    has_data: bool,
    is_currently_scraping: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugResponse<'a> {
    data: Option<&'a NormalizedSnapshot>,
    last_scraped: Option<String>,
    scrape_count: u64,
    errors: u64,
    is_running: bool,
}

async fn get_stock(State(state): State<Arc<AppState>>) -> Response {
    match state.cache.view().await {
        Some(view) => Json(StockResponse::from_view(&view)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "No data available yet. Scraper is warming up.",
                "lastScraped": null
            })),
        )
            .into_response(),
    }
}

async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.cache.stats().await;
    Json(HealthResponse {
        status: "ok",
        uptime: format!("{:.1}s", state.started_at.elapsed().as_secs_f64()),
        scrapes: stats.success_count,
        errors: stats.error_count,
        last_scraped: stats.last_scraped_at.map(iso),
        has_data: stats.has_data,
        is_currently_scraping: stats.refresh_in_flight,
    })
}

async fn get_debug(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.cache.snapshot().await;
    let stats = state.cache.stats().await;
    Json(DebugResponse {
        data: snapshot.as_deref(),
        last_scraped: stats.last_scraped_at.map(iso),
        scrape_count: stats.success_count,
        errors: stats.error_count,
        is_running: stats.refresh_in_flight,
    })
    .into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/stock", get(get_stock))
        .route("/health", get(get_health))
        .route("/debug", get(get_debug))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
