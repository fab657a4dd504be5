use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use rentdesk_agent::{ChatRequest, DirectiveOutcome};
use rentdesk_core::{Intent, InterfaceError, LookupSelector};

use crate::routes::AppState;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Debug, Default, Deserialize)]
struct ChatBody {
    message: Option<String>,
    query: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl ChatBody {
    /// `message` wins over its `query` alias; blank values count as absent.
    fn message(&self) -> Option<&str> {
        [self.message.as_deref(), self.query.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|message| !message.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub intent: Intent,
    pub directives: Vec<DirectiveOutcome>,
}

pub async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    // Unparseable bodies are treated like bodies without a message.
    let body = serde_json::from_slice::<ChatBody>(&body).unwrap_or_default();
    let Some(message) = body.message() else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "No message provided" })))
            .into_response();
    };

    let selector = body.kind.as_deref().and_then(|kind| match kind.parse::<LookupSelector>() {
        Ok(selector) => Some(selector),
        Err(reason) => {
            tracing::debug!(event_name = "chat.selector_ignored", reason = %reason, "unknown type");
            None
        }
    });

    let request = ChatRequest::new(message).with_selector(selector);
    let correlation_id = request.correlation_id.clone();

    let mut response = match state.runtime.handle(request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ChatResponse {
                reply: outcome.reply,
                intent: outcome.intent,
                directives: outcome.directives,
            }),
        )
            .into_response(),
        Err(error) => {
            tracing::error!(
                event_name = "chat.request_failed",
                correlation_id = %correlation_id,
                error = %error,
                "chat request failed"
            );
            interface_error_response(error.into_interface(correlation_id.clone()))
        }
    };

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

pub async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "error": "Method not allowed" }))).into_response()
}

fn interface_error_response(error: InterfaceError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": error.reason_code(), "reply": error.user_message() })))
        .into_response()
}
