use std::time::{Duration, Instant};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::breaker::RateLimitBreaker;
use crate::config::{GatewayConfig, RuntimeEnv, StartupError};
use crate::gate::{GateDecision, ModerationGate};
use crate::metrics;
use crate::moderation::{ModerationClient, ModerationClientConfig};
use crate::search::{SearchClient, SearchClientConfig, SearchError, SearchPage};
use crate::verdict_cache::VerdictCache;
use crate::video_url::extract_video_id;

#[derive(Clone)]
pub struct AppState {
    config: GatewayConfig,
    gate: ModerationGate,
    search: SearchClient,
}

type ApiError = (StatusCode, ErrorResponse);

pub fn router(config: GatewayConfig) -> Result<Router, StartupError> {
    let moderation = ModerationClient::new(ModerationClientConfig {
        endpoint: config.moderation_url.clone(),
        api_key: config.moderation_api_key.clone(),
        models: config.moderation_models.clone(),
        max_chars: config.moderation_max_chars,
        timeout: Duration::from_millis(config.moderation_timeout_ms),
    })
    .map_err(|_| StartupError {
        code: "ERR_MODERATION_CLIENT",
        message: "failed to initialize moderation client".to_string(),
    })?;

    let search = SearchClient::new(SearchClientConfig {
        endpoint: config.search_url.clone(),
        api_key: config.search_api_key.clone(),
        page_size: config.search_page_size,
        timeout: Duration::from_millis(config.search_timeout_ms),
    })
    .map_err(|_| StartupError {
        code: "ERR_SEARCH_CLIENT",
        message: "failed to initialize search client".to_string(),
    })?;

    let cache = VerdictCache::new(
        config.cache_max_entries,
        Duration::from_millis(config.cache_ttl_ms),
    );
    let breaker = RateLimitBreaker::new(Duration::from_millis(config.breaker_cooldown_ms));
    let gate = ModerationGate::new(cache, breaker, moderation, config.on_unavailable);

    let state = AppState {
        config,
        gate,
        search,
    };

    Ok(Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/search", get(search_videos))
        .route("/api/resolve", get(resolve_video_url))
        .with_state(state))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics_endpoint() -> Response {
    match metrics::render() {
        Ok((body, content_type)) => {
            let mut headers = HeaderMap::new();
            if let Ok(value) = HeaderValue::from_str(content_type.as_str()) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            (headers, body).into_response()
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            categories: None,
            details: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default, rename = "pageToken")]
    page_token: Option<String>,
}

async fn search_videos(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let started = Instant::now();
    let span = tracing::info_span!(
        "search.request",
        route = "/api/search",
        latency_ms = tracing::field::Empty,
        outcome = tracing::field::Empty,
    );

    let result = handle_search(&state, &params).instrument(span.clone()).await;
    span.record("latency_ms", started.elapsed().as_millis() as u64);

    let response = match result {
        Ok(page) => {
            span.record("outcome", "ok");
            (StatusCode::OK, Json(page)).into_response()
        }
        Err((status, body)) => {
            span.record("outcome", body.code.unwrap_or("error"));
            (status, Json(body)).into_response()
        }
    };

    metrics::observe_http_request(
        "/api/search",
        "GET",
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}

async fn handle_search(state: &AppState, params: &SearchParams) -> Result<SearchPage, ApiError> {
    let q = params.q.as_deref().map(str::trim).unwrap_or("");
    if q.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("Missing required query 'q'"),
        ));
    }

    match state.gate.evaluate(q).await {
        GateDecision::Allow => {}
        GateDecision::Block { categories } => {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: "Query blocked by content moderation".to_string(),
                    code: Some("MODERATION_BLOCKED"),
                    categories: Some(categories),
                    details: None,
                },
            ));
        }
        GateDecision::Unavailable { cause } => {
            // Debug detail is withheld in production.
            let details = (state.config.runtime_env != RuntimeEnv::Production)
                .then(|| serde_json::to_value(cause).ok())
                .flatten();
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "Search temporarily unavailable (moderation unavailable)".to_string(),
                    code: Some("MODERATION_UNAVAILABLE"),
                    categories: None,
                    details,
                },
            ));
        }
    }

    match state.search.search(q, params.page_token.as_deref()).await {
        Ok(page) => Ok(page),
        Err(SearchError::MissingCredentials) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("Search provider credentials are not configured"),
        )),
        Err(SearchError::Upstream { status, body }) => Err((
            status,
            ErrorResponse {
                error: "Video search provider error".to_string(),
                code: None,
                categories: None,
                details: Some(serde_json::Value::String(body)),
            },
        )),
        Err(err @ (SearchError::Transport(_) | SearchError::InvalidResponse)) => {
            tracing::error!(error = %err, "search request failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Search request failed"),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResolveParams {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResolveResponse {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

/// Convenience for pasted video URLs: resolves a recognizable video URL to
/// its id without involving moderation or the search provider. Absence of a
/// match is not an error; the caller falls back to a normal search.
async fn resolve_video_url(Query(params): Query<ResolveParams>) -> Response {
    let started = Instant::now();
    let video_id = params.q.as_deref().and_then(extract_video_id);
    let response = (StatusCode::OK, Json(ResolveResponse { video_id })).into_response();

    metrics::observe_http_request(
        "/api/resolve",
        "GET",
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}
