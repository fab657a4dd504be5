use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use rentdesk_core::domain::{collections, record_path};
use rentdesk_core::VisitDate;

use crate::store::{DocumentStore, StoreError};

struct DemoBooking {
    id: &'static str,
    name: &'static str,
    phone: &'static str,
    console: &'static str,
    final_price: u32,
    status: &'static str,
}

const DEMO_BOOKINGS: &[DemoBooking] = &[
    DemoBooking {
        id: "BK-1001",
        name: "Asha Menon",
        phone: "9876500001",
        console: "PS5",
        final_price: 1200,
        status: "Completed",
    },
    DemoBooking {
        id: "BK-1002",
        name: "Ravi Kumar",
        phone: "9876500002",
        console: "Xbox Series X",
        final_price: 900,
        status: "Active",
    },
    DemoBooking {
        id: "BK-1003",
        name: "Meera Shah",
        phone: "9876500003",
        console: "Nintendo Switch",
        final_price: 650,
        status: "Cancelled",
    },
    DemoBooking {
        id: "BK-1004",
        name: "Kabir Das",
        phone: "9876500004",
        console: "PS5",
        final_price: 1500,
        status: "Active",
    },
];

const DEMO_REVIEWS: &[(&str, &str, u8)] = &[
    ("RV-2001", "Smooth pickup, console was spotless.", 5),
    ("RV-2002", "Controller drift on the second pad.", 3),
];

const DEMO_BARGAINERS: &[&str] = &["9876500002"];

const DEMO_VISITORS: &[(&str, bool)] =
    &[("visitor-01", true), ("visitor-02", false), ("visitor-03", false), ("visitor-04", true)];

/// Deterministic demo records for local runs and CLI smoke checks.
///
/// Visitors are written under the day passed to [`DemoDataset::load`] so the
/// "visitors who didn't book" directive has data to report.
pub struct DemoDataset;

impl DemoDataset {
    pub async fn load(store: &dyn DocumentStore, day: VisitDate) -> Result<SeedResult, StoreError> {
        for booking in DEMO_BOOKINGS {
            store
                .set(
                    &record_path(collections::BOOKINGS, booking.id),
                    json!({
                        "name": booking.name,
                        "phone": booking.phone,
                        "console": booking.console,
                        "finalPrice": booking.final_price,
                        "status": booking.status,
                    }),
                )
                .await?;
        }

        for (id, text, stars) in DEMO_REVIEWS {
            store
                .set(
                    &record_path(collections::REVIEWS, id),
                    json!({ "text": text, "stars": stars }),
                )
                .await?;
        }

        let tagged_at = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).single().unwrap_or_else(Utc::now);
        for phone in DEMO_BARGAINERS {
            store
                .set(
                    &record_path(collections::CUSTOMER_NOTES, phone),
                    json!({ "tag": rentdesk_core::BARGAINER_TAG, "timestamp": tagged_at.to_rfc3339() }),
                )
                .await?;
        }

        let day_path = record_path(collections::DAILY_VISITORS, &day.key());
        for (visitor, booked) in DEMO_VISITORS {
            store.set(&record_path(&day_path, visitor), json!({ "booked": booked })).await?;
        }

        Ok(SeedResult {
            bookings: DEMO_BOOKINGS.len(),
            reviews: DEMO_REVIEWS.len(),
            customer_notes: DEMO_BARGAINERS.len(),
            visitors: DEMO_VISITORS.len(),
            visit_date: day.key(),
        })
    }

    /// Checks every seeded record is still present.
    pub async fn verify(
        store: &dyn DocumentStore,
        day: VisitDate,
    ) -> Result<VerificationResult, StoreError> {
        let day_collection = record_path(collections::DAILY_VISITORS, &day.key());
        let snapshot = store
            .snapshot(&[
                collections::BOOKINGS,
                collections::REVIEWS,
                collections::CUSTOMER_NOTES,
                day_collection.as_str(),
            ])
            .await?;

        let has = |collection: &str, key: &str| {
            snapshot.records(collection).iter().any(|record| record.key == key)
        };

        let mut checks = Vec::new();
        for booking in DEMO_BOOKINGS {
            checks.push((booking.id.to_string(), has(collections::BOOKINGS, booking.id)));
        }
        for (id, _, _) in DEMO_REVIEWS {
            checks.push((id.to_string(), has(collections::REVIEWS, id)));
        }
        for phone in DEMO_BARGAINERS {
            checks.push((phone.to_string(), has(collections::CUSTOMER_NOTES, phone)));
        }
        for (visitor, _) in DEMO_VISITORS {
            checks.push((visitor.to_string(), has(&day_collection, visitor)));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded records, leaving anything else in place.
    pub async fn clean(store: &dyn DocumentStore, day: VisitDate) -> Result<(), StoreError> {
        for booking in DEMO_BOOKINGS {
            store.remove(&record_path(collections::BOOKINGS, booking.id)).await?;
        }
        for (id, _, _) in DEMO_REVIEWS {
            store.remove(&record_path(collections::REVIEWS, id)).await?;
        }
        for phone in DEMO_BARGAINERS {
            store.remove(&record_path(collections::CUSTOMER_NOTES, phone)).await?;
        }
        let day_path = record_path(collections::DAILY_VISITORS, &day.key());
        for (visitor, _) in DEMO_VISITORS {
            store.remove(&record_path(&day_path, visitor)).await?;
        }
        Ok(())
    }

    /// Ids of the seeded visitors that did not book, in key order.
    pub fn unbooked_visitors() -> Vec<&'static str> {
        DEMO_VISITORS.iter().filter(|(_, booked)| !booked).map(|(visitor, _)| *visitor).collect()
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub bookings: usize,
    pub reviews: usize,
    pub customer_notes: usize,
    pub visitors: usize,
    pub visit_date: String,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

impl VerificationResult {
    pub fn missing(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, present)| !present)
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// Document body of a seeded booking, for tests that compare against the store.
pub fn demo_booking_document(id: &str) -> Option<Value> {
    DEMO_BOOKINGS.iter().find(|booking| booking.id == id).map(|booking| {
        json!({
            "name": booking.name,
            "phone": booking.phone,
            "console": booking.console,
            "finalPrice": booking.final_price,
            "status": booking.status,
        })
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{demo_booking_document, DemoDataset};
    use crate::store::{DocumentStore, InMemoryDocumentStore, SqlDocumentStore};
    use crate::{connect_with_settings, migrations};
    use rentdesk_core::VisitDate;

    fn day() -> VisitDate {
        VisitDate(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap_or_default())
    }

    #[tokio::test]
    async fn seed_then_verify_reports_all_present() {
        let store = InMemoryDocumentStore::default();
        let seeded = DemoDataset::load(&store, day()).await.expect("seed");
        assert_eq!(seeded.bookings, 4);
        assert_eq!(seeded.visit_date, "2026-10-19");

        let verification = DemoDataset::verify(&store, day()).await.expect("verify");
        assert!(verification.all_present, "missing: {:?}", verification.missing());
    }

    #[tokio::test]
    async fn verify_flags_removed_records() {
        let store = InMemoryDocumentStore::default();
        DemoDataset::load(&store, day()).await.expect("seed");
        store.remove("reviews/RV-2002").await.expect("remove review");

        let verification = DemoDataset::verify(&store, day()).await.expect("verify");
        assert!(!verification.all_present);
        assert_eq!(verification.missing(), vec!["RV-2002"]);
    }

    #[tokio::test]
    async fn seed_is_repeatable_on_sqlite_and_clean_removes_it() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let store = SqlDocumentStore::new(pool);

        DemoDataset::load(&store, day()).await.expect("first seed");
        DemoDataset::load(&store, day()).await.expect("second seed");

        let bookings = store.read_all("bookings").await.expect("read bookings");
        assert_eq!(bookings.len(), 4);
        assert_eq!(Some(bookings[0].value.clone()), demo_booking_document("BK-1001"));

        DemoDataset::clean(&store, day()).await.expect("clean");
        let verification = DemoDataset::verify(&store, day()).await.expect("verify");
        assert!(verification.checks.iter().all(|(_, present)| !present));
    }

    #[test]
    fn unbooked_visitors_are_listed_in_key_order() {
        assert_eq!(DemoDataset::unbooked_visitors(), vec!["visitor-02", "visitor-03"]);
    }
}
