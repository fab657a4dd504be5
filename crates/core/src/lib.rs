pub mod config;
pub mod domain;
pub mod errors;
pub mod intent;

pub use domain::booking::{Booking, BookingId, BookingStatus, StoredStatus};
pub use domain::customer::{CustomerNote, BARGAINER_TAG};
pub use domain::review::ReviewId;
pub use domain::visitor::{DailyVisitor, VisitDate};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use intent::{classify, Intent, LookupSelector, LookupSource, Route};
