use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Day key used under `dailyVisitors/`, formatted `YYYY-MM-DD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisitDate(pub NaiveDate);

impl VisitDate {
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    pub fn key(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVisitor {
    pub visitor_id: String,
    pub booked: bool,
}

impl DailyVisitor {
    /// Anything other than a literal `booked: true` counts as not booked.
    pub fn from_document(visitor_id: &str, document: &Value) -> Self {
        Self {
            visitor_id: visitor_id.to_string(),
            booked: document.get("booked").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}
