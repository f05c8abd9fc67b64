//! Thin HTTP surface over the analyzer.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::analysis::AnalysisResult;
use crate::config::Config;
use crate::pipeline::{unix_now, Analyzer};
use crate::ratelimit::RateLimiter;
use crate::scrape::FetchError;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
    limiter: Arc<RateLimiter<IpAddr>>,
}

impl AppState {
    pub fn new(analyzer: Analyzer, rate_limit_per_minute: usize) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            limiter: Arc::new(RateLimiter::per_minute(rate_limit_per_minute)),
        }
    }
}

/// JSON error body. Never carries raw provider output.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.1 });
        (self.0, Json(body)).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        let status = match e {
            FetchError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            FetchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            FetchError::Network(_) | FetchError::Status(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError(status, e.to_string())
    }
}

#[derive(Deserialize)]
struct UrlBody {
    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
struct AnalysisBody {
    analysis: AnalysisResult,
}

pub fn router(state: AppState, config: &Config) -> Router {
    let origins: Vec<HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/providers", get(providers))
        .route("/api/analyze", post(analyze))
        .route("/api/scrape", post(scrape))
        .route("/api/generate-components", post(generate_components))
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(middleware::from_fn_with_state(state.clone(), rate_limit)),
        )
        .with_state(state)
}

async fn rate_limit(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = connect
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.limiter.check(&ip) {
        log::warn!("Rate limit exceeded for {ip}");
        return ApiError(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".into()).into_response();
    }
    next.run(request).await
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.analyzer.dispatcher().registry().names(),
        "timestamp": unix_now(),
    }))
}

async fn providers(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.analyzer.dispatcher().registry();
    Json(json!({
        "providers": registry.descriptors(),
        "activeProvider": registry.names().first(),
    }))
}

fn require_url(body: &UrlBody) -> Result<&str, ApiError> {
    let url = body.url.trim();
    if url.is_empty() {
        return Err(ApiError(StatusCode::BAD_REQUEST, "URL is required".into()));
    }
    Ok(url)
}

async fn analyze(State(state): State<AppState>, Json(body): Json<UrlBody>) -> Result<Response, ApiError> {
    let url = require_url(&body)?;
    log::info!("Analyze request for {url}");
    let outcome = state.analyzer.analyze(url).await?;
    Ok(Json(outcome).into_response())
}

async fn scrape(State(state): State<AppState>, Json(body): Json<UrlBody>) -> Result<Response, ApiError> {
    let url = require_url(&body)?;
    let signals = state.analyzer.fetcher().fetch(url).await?;
    Ok(Json(json!({ "success": true, "signals": signals })).into_response())
}

async fn generate_components(
    State(state): State<AppState>,
    Json(body): Json<AnalysisBody>,
) -> impl IntoResponse {
    Json(state.analyzer.generate_components(&body.analysis).await)
}
