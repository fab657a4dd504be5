use std::any::Any;
use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

use rentdesk_agent::AgentRuntime;
use rentdesk_core::InterfaceError;
use rentdesk_db::SharedStore;

use crate::{chat, health, records};

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
    pub store: SharedStore,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/chat", post(chat::chat).fallback(chat::method_not_allowed))
        .route("/api/records", get(records::records))
        .route("/health", get(health::health))
        .with_state(state)
        .layer(cors)
        .layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(
        event_name = "http.handler_panicked",
        correlation_id = "unknown",
        "request handler panicked"
    );
    let error = InterfaceError::Internal {
        message: "handler panicked".to_string(),
        correlation_id: "unknown".to_string(),
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": error.reason_code(), "reply": error.user_message() })),
    )
        .into_response()
}
