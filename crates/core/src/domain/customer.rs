use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const BARGAINER_TAG: &str = "BARGAINER";

/// Annotation stored under `customerNotes/<phone>`. One note per phone; writes replace it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerNote {
    pub tag: String,
    pub timestamp: DateTime<Utc>,
}

impl CustomerNote {
    pub fn bargainer(timestamp: DateTime<Utc>) -> Self {
        Self { tag: BARGAINER_TAG.to_string(), timestamp }
    }
}

/// True when a raw note document carries the BARGAINER tag, regardless of its timestamp shape.
pub fn document_is_bargainer(document: &Value) -> bool {
    document
        .get("tag")
        .and_then(Value::as_str)
        .map(|tag| tag.trim().eq_ignore_ascii_case(BARGAINER_TAG))
        .unwrap_or(false)
}
