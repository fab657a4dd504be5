pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod store;

pub use connection::{connect_with_settings, DbPool};
pub use fixtures::{DemoDataset, SeedResult, VerificationResult};
pub use store::{
    open, DocumentStore, InMemoryDocumentStore, Record, SharedStore, Snapshot, SqlDocumentStore,
    StoreError,
};
