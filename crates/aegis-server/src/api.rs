//! HTTP routes over the gateway.
//!
//! Dropping a request future (client disconnect) cancels the submission,
//! which leaves the cache and statistics untouched.

use aegis_core::{AggregateStats, LLMResponse, PromptRequest};
use aegis_routing::{Gateway, GatewayError};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

/// Error body returned by every route.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Failure of an API call.
#[derive(Debug)]
pub enum ApiError {
    /// The gateway rejected or failed the request.
    Gateway(GatewayError),
    /// The body was not a valid prompt request.
    MalformedBody(JsonRejection),
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self::Gateway(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Gateway(error) => (
                StatusCode::from_u16(error.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                ErrorBody {
                    error: error.code(),
                    message: error.to_string(),
                },
            ),
            Self::MalformedBody(rejection) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "validation_error",
                    message: rejection.body_text(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the router; CORS admits the configured origins, or any origin when none are listed.
pub fn router(gateway: Gateway) -> Router {
    let cors = cors_layer(&gateway.config().server.cors_origins);

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/stats", get(stats))
        .route("/api/stats/reset", post(reset_stats))
        .layer(cors)
        .with_state(gateway)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(%origin, %error, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "message": "Aegis API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
        "chat": "/api/chat",
        "stats": "/api/stats",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "aegis-gateway" }))
}

async fn chat(
    State(gateway): State<Gateway>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<LLMResponse>, ApiError> {
    let Json(request) = body.map_err(ApiError::MalformedBody)?;
    let response = gateway.submit(request).await.map_err(|error| {
        tracing::warn!(code = error.code(), %error, "chat request failed");
        error
    })?;
    Ok(Json(response))
}

async fn stats(State(gateway): State<Gateway>) -> Json<AggregateStats> {
    Json(gateway.stats())
}

async fn reset_stats(State(gateway): State<Gateway>) -> StatusCode {
    gateway.reset_stats();
    tracing::info!("statistics reset");
    StatusCode::NO_CONTENT
}
