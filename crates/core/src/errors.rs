use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid booking status `{0}`")]
    InvalidBookingStatus(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures a use case reports to its caller. Completion and lookup failures never show
/// up here; the runtime degrades them into a reply.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("records store failure: {0}")]
    Persistence(String),
}

/// What an HTTP handler renders. `message` is for logs only; clients get `user_message`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::Internal { .. } => 500,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::Internal { .. } => "internal_error",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "No message provided",
            Self::Internal { .. } => "AI encountered an error. Please try again.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. } | Self::Internal { correlation_id, .. } => {
                correlation_id
            }
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Domain(error) => {
                InterfaceError::BadRequest { message: error.to_string(), correlation_id }
            }
            Self::Persistence(message) => InterfaceError::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn blank_message_maps_to_bad_request() {
        let interface = ApplicationError::from(DomainError::InvariantViolation(
            "chat message must not be blank".to_owned(),
        ))
        .into_interface("req-1");

        assert_eq!(interface.status_code(), 400);
        assert_eq!(interface.correlation_id(), "req-1");
        assert_eq!(interface.user_message(), "No message provided");
    }

    #[test]
    fn store_failure_maps_to_internal_without_leaking_detail() {
        let interface =
            ApplicationError::Persistence("disk I/O error at /var/rentdesk.db".to_owned())
                .into_interface("records");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.status_code(), 500);
        assert_eq!(interface.reason_code(), "internal_error");
        assert!(!interface.user_message().contains("rentdesk.db"));
        assert!(interface.to_string().contains("disk I/O error"));
    }
}
