use rentdesk_core::config::DirectivesConfig;
use rentdesk_core::{BookingId, BookingStatus, DomainError, ReviewId};

use crate::directives::Directive;

/// Characters that would change the meaning of a store path if they reached a record key.
const FORBIDDEN_KEY_CHARS: [char; 6] = ['/', '.', '$', '#', '[', ']'];

/// A directive that passed policy, with its values already normalised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApprovedAction {
    SetBookingStatus { booking_id: BookingId, status: BookingStatus },
    DeleteReview { review_id: ReviewId },
    TagBargainer { phone: String },
    VisitorReport,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveDecision {
    Allow(ApprovedAction),
    Deny { reason_code: &'static str, user_message: String },
    Degrade { reason_code: &'static str, user_message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectivePolicy {
    pub review_deletion_enabled: bool,
    pub customer_tagging_enabled: bool,
}

impl Default for DirectivePolicy {
    fn default() -> Self {
        Self { review_deletion_enabled: true, customer_tagging_enabled: true }
    }
}

impl From<&DirectivesConfig> for DirectivePolicy {
    fn from(config: &DirectivesConfig) -> Self {
        Self {
            review_deletion_enabled: config.review_deletion_enabled,
            customer_tagging_enabled: config.customer_tagging_enabled,
        }
    }
}

impl DirectivePolicy {
    pub fn evaluate(&self, directive: &Directive) -> DirectiveDecision {
        match directive {
            Directive::ChangeBookingStatus { booking_id, requested_status } => {
                if let Some(denied) = deny_unsafe_key("booking", &booking_id.0) {
                    return denied;
                }
                match parse_status(requested_status) {
                    Ok(status) => DirectiveDecision::Allow(ApprovedAction::SetBookingStatus {
                        booking_id: booking_id.clone(),
                        status,
                    }),
                    Err(_) => DirectiveDecision::Deny {
                        reason_code: "invalid_booking_status",
                        user_message: format!(
                            "Cannot update booking {booking_id}: \"{requested_status}\" is not a valid status (allowed: {}).",
                            allowed_statuses()
                        ),
                    },
                }
            }
            Directive::DeleteReview { review_id } => {
                if let Some(denied) = deny_unsafe_key("review", &review_id.0) {
                    return denied;
                }
                if !self.review_deletion_enabled {
                    return DirectiveDecision::Degrade {
                        reason_code: "review_deletion_disabled",
                        user_message: format!(
                            "Review deletion is disabled; review {review_id} was not deleted."
                        ),
                    };
                }
                DirectiveDecision::Allow(ApprovedAction::DeleteReview {
                    review_id: review_id.clone(),
                })
            }
            Directive::TagBargainer { phone } => {
                if !self.customer_tagging_enabled {
                    return DirectiveDecision::Degrade {
                        reason_code: "customer_tagging_disabled",
                        user_message: format!(
                            "Customer tagging is disabled; customer {phone} was not tagged."
                        ),
                    };
                }
                DirectiveDecision::Allow(ApprovedAction::TagBargainer { phone: phone.clone() })
            }
            Directive::VisitorReport => DirectiveDecision::Allow(ApprovedAction::VisitorReport),
        }
    }
}

fn parse_status(raw: &str) -> Result<BookingStatus, DomainError> {
    BookingStatus::parse_lenient(raw)
        .ok_or_else(|| DomainError::InvalidBookingStatus(raw.to_string()))
}

fn allowed_statuses() -> String {
    BookingStatus::ALL.iter().map(BookingStatus::as_str).collect::<Vec<_>>().join(", ")
}

fn deny_unsafe_key(record: &str, key: &str) -> Option<DirectiveDecision> {
    key.contains(FORBIDDEN_KEY_CHARS).then(|| DirectiveDecision::Deny {
        reason_code: "invalid_record_id",
        user_message: format!("Cannot act on {record} \"{key}\": record ids may not contain / . $ # [ or ]."),
    })
}
