use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Serialize;

use rentdesk_core::domain::collections;
use rentdesk_core::domain::customer::document_is_bargainer;
use rentdesk_core::{Booking, BookingStatus, DailyVisitor};
use rentdesk_db::{SharedStore, Snapshot, StoreError};

/// Returned in place of a report when the records store cannot be read.
pub const DATA_UNAVAILABLE: &str = "Business data is currently unavailable.";

const FIELD_WIDTH: usize = 60;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportTotals {
    pub total_bookings: usize,
    pub total_revenue: Decimal,
    pub completed: usize,
    pub cancelled: usize,
    pub active: usize,
    pub total_visitors: usize,
    pub booked_visitors: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BookingLine {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub console: String,
    pub final_price: Decimal,
    pub status: String,
    pub bargainer: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BusinessReport {
    pub totals: ReportTotals,
    pub bookings: Vec<BookingLine>,
}

impl BusinessReport {
    /// Folds one snapshot into totals plus a block per booking, in snapshot order.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let bargainers = snapshot
            .records(collections::CUSTOMER_NOTES)
            .iter()
            .filter(|record| document_is_bargainer(&record.value))
            .map(|record| record.key.as_str())
            .collect::<BTreeSet<_>>();

        let mut totals = ReportTotals::default();
        let mut bookings = Vec::new();
        for record in snapshot.records(collections::BOOKINGS) {
            let booking = Booking::from_document(&record.key, &record.value);
            totals.total_bookings += 1;
            match totals.total_revenue.checked_add(booking.final_price) {
                Some(sum) => totals.total_revenue = sum,
                None => tracing::warn!(
                    event_name = "report.revenue_overflow",
                    booking_id = %booking.id.0,
                    "booking price left out of total revenue"
                ),
            }
            match booking.status.known() {
                Some(BookingStatus::Completed) => totals.completed += 1,
                Some(BookingStatus::Cancelled) => totals.cancelled += 1,
                Some(BookingStatus::Active) => totals.active += 1,
                None => {}
            }

            bookings.push(BookingLine {
                bargainer: !booking.phone.is_empty() && bargainers.contains(booking.phone.as_str()),
                id: booking.id.0,
                name: booking.name,
                phone: booking.phone,
                console: booking.console,
                final_price: booking.final_price,
                status: booking.status.label().to_string(),
            });
        }

        // Visitors are grouped by day: `dailyVisitors/<date>/<visitor>`.
        for day in snapshot.records(collections::DAILY_VISITORS) {
            let Some(visitors) = day.value.as_object() else {
                continue;
            };
            for (visitor_id, document) in visitors {
                totals.total_visitors += 1;
                if DailyVisitor::from_document(visitor_id, document).booked {
                    totals.booked_visitors += 1;
                }
            }
        }

        Self { totals, bookings }
    }

    pub fn render(&self) -> String {
        let totals = &self.totals;
        let mut lines = vec![
            "Business summary".to_string(),
            format!("Total bookings: {}", totals.total_bookings),
            format!("Total revenue: {}", totals.total_revenue.normalize()),
            format!(
                "Completed: {} | Cancelled: {} | Active: {}",
                totals.completed, totals.cancelled, totals.active
            ),
            format!(
                "Visitors: {} | Booked visitors: {}",
                totals.total_visitors, totals.booked_visitors
            ),
            String::new(),
        ];

        if self.bookings.is_empty() {
            lines.push("Bookings: none".to_string());
            return lines.join("\n");
        }

        lines.push("Bookings:".to_string());
        for line in &self.bookings {
            lines.push(format!(
                "- Booking {}: {} ({}), console {}, price {}, status {}",
                clip(&line.id),
                clip(&line.name),
                clip(&line.phone),
                clip(&line.console),
                line.final_price.normalize(),
                clip(&line.status),
            ));
            lines.push(format!(
                "  Customer tag: {}",
                if line.bargainer { "BARGAINER" } else { "none" }
            ));
        }
        lines.join("\n")
    }
}

fn clip(text: &str) -> String {
    match text.char_indices().nth(FIELD_WIDTH) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub struct ReportBuilder {
    store: SharedStore,
}

impl ReportBuilder {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn try_build(&self) -> Result<BusinessReport, StoreError> {
        let snapshot = self
            .store
            .snapshot(&[
                collections::BOOKINGS,
                collections::CUSTOMER_NOTES,
                collections::DAILY_VISITORS,
            ])
            .await?;
        Ok(BusinessReport::from_snapshot(&snapshot))
    }

    /// Rendered report, or [`DATA_UNAVAILABLE`] when the store read fails.
    pub async fn build(&self) -> String {
        match self.try_build().await {
            Ok(report) => report.render(),
            Err(error) => {
                tracing::warn!(
                    event_name = "report.store_unavailable",
                    error = %error,
                    "business report degraded to sentinel"
                );
                DATA_UNAVAILABLE.to_string()
            }
        }
    }
}
