pub mod booking;
pub mod customer;
pub mod review;
pub mod visitor;

/// Top-level collections of the business-records store.
pub mod collections {
    pub const BOOKINGS: &str = "bookings";
    pub const CUSTOMER_NOTES: &str = "customerNotes";
    pub const REVIEWS: &str = "reviews";
    pub const DAILY_VISITORS: &str = "dailyVisitors";
}

/// Joins a collection and a record key into a store path.
pub fn record_path(collection: &str, key: &str) -> String {
    format!("{collection}/{key}")
}
