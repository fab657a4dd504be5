use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use rentdesk_core::domain::collections;
use rentdesk_core::ApplicationError;
use rentdesk_db::Record;

use crate::routes::AppState;

/// Raw booking and review documents, read in one snapshot.
pub async fn records(State(state): State<AppState>) -> Response {
    match state.store.snapshot(&[collections::BOOKINGS, collections::REVIEWS]).await {
        Ok(snapshot) => Json(json!({
            "bookings": values(snapshot.records(collections::BOOKINGS)),
            "reviews": values(snapshot.records(collections::REVIEWS)),
        }))
        .into_response(),
        Err(error) => {
            let error = ApplicationError::Persistence(error.to_string()).into_interface("records");
            tracing::error!(
                event_name = "records.fetch_failed",
                correlation_id = error.correlation_id(),
                reason_code = error.reason_code(),
                error = %error,
                "records snapshot failed"
            );
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({ "error": "Failed to fetch records" }))).into_response()
        }
    }
}

fn values(records: &[Record]) -> Vec<Value> {
    records.iter().map(|record| record.value.clone()).collect()
}
