//! HTTP adapter over the gateway pipeline

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::VERSION;
use crate::config::GatewayConfig;
use crate::format::{Rendered, render_error};
use crate::pipeline::{Failure, Gateway, RequestContext};

/// Header carrying the caller identity used for flag evaluation
pub const IDENTITY_HEADER: &str = "x-user-id";

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, HeaderValue::from_static(self.content_type))],
            self.body,
        )
            .into_response()
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        if status.is_server_error() {
            error!("{} ({})", self, self.error.code().as_str());
        } else {
            info!("{} ({})", self, self.error.code().as_str());
        }

        (status, render_error(&self.error, self.format)).into_response()
    }
}

pub fn router(gateway: Arc<Gateway>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/ciudad/{nombre}/restaurantes", get(get_restaurants))
        .route("/api/v1/ciudad/{nombre}/clima/{fecha}", get(get_weather))
        .route(
            "/api/v1/ciudad/{nombre}/clima/{fecha}/resumen",
            get(get_weather_summary),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(gateway)
}

fn request_context(headers: &HeaderMap) -> RequestContext<'_> {
    RequestContext {
        accept: header_str(headers, header::ACCEPT.as_str()),
        identity: header_str(headers, IDENTITY_HEADER).filter(|id| !id.trim().is_empty()),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": VERSION })),
    )
}

async fn get_restaurants(
    State(gateway): State<Arc<Gateway>>,
    Path(nombre): Path<String>,
    headers: HeaderMap,
) -> Result<Rendered, Failure> {
    gateway
        .get_restaurants(&nombre, request_context(&headers))
        .await
}

async fn get_weather(
    State(gateway): State<Arc<Gateway>>,
    Path((nombre, fecha)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Rendered, Failure> {
    gateway
        .get_weather(&nombre, &fecha, request_context(&headers))
        .await
}

async fn get_weather_summary(
    State(gateway): State<Arc<Gateway>>,
    Path((nombre, fecha)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Rendered, Failure> {
    gateway
        .get_weather_summary(&nombre, &fecha, request_context(&headers))
        .await
}

/// Serve the gateway until Ctrl-C
pub async fn run(config: &GatewayConfig) -> anyhow::Result<()> {
    let gateway = Arc::new(Gateway::from_config(config)?);
    let app = router(gateway);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Geodata gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| "HTTP server error")?;

    info!("Geodata gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
    }
}
