use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [Self::Active, Self::Completed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Title-cases free text and matches it against the known statuses.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let normalized = title_case(raw.trim());
        Self::ALL.into_iter().find(|status| status.as_str() == normalized)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status as stored: either one of the known values or whatever text the record carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredStatus {
    Known(BookingStatus),
    Other(String),
    Missing,
}

impl StoredStatus {
    pub fn known(&self) -> Option<BookingStatus> {
        match self {
            Self::Known(status) => Some(*status),
            Self::Other(_) | Self::Missing => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Known(status) => status.as_str(),
            Self::Other(raw) => raw,
            Self::Missing => "Unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Booking {
    pub id: BookingId,
    pub name: String,
    pub phone: String,
    pub console: String,
    pub final_price: Decimal,
    pub status: StoredStatus,
}

impl Booking {
    /// Reads a booking document without rejecting it: absent text fields become empty and
    /// an absent, non-numeric or negative `finalPrice` becomes zero.
    pub fn from_document(id: &str, document: &Value) -> Self {
        let status = match document.get("status").and_then(Value::as_str) {
            Some(raw) if !raw.trim().is_empty() => BookingStatus::parse_lenient(raw)
                .map(StoredStatus::Known)
                .unwrap_or_else(|| StoredStatus::Other(raw.trim().to_string())),
            _ => StoredStatus::Missing,
        };

        Self {
            id: BookingId(id.to_string()),
            name: text_field(document, "name"),
            phone: text_field(document, "phone"),
            console: text_field(document, "console"),
            final_price: document.get("finalPrice").map(coerce_decimal).unwrap_or(Decimal::ZERO),
            status,
        }
    }
}

pub fn title_case(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect::<String>()
        }
        None => String::new(),
    }
}

fn text_field(document: &Value, key: &str) -> String {
    match document.get(key) {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    }
}

fn coerce_decimal(value: &Value) -> Decimal {
    let raw = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        _ => return Decimal::ZERO,
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO)
}
