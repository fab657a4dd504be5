use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use rentdesk_core::domain::{collections, record_path};
use rentdesk_core::{CustomerNote, DailyVisitor, VisitDate};
use rentdesk_db::{SharedStore, StoreError};

use crate::directives::{parse_directives, Directive, DirectiveKind};
use crate::guardrails::{ApprovedAction, DirectiveDecision, DirectivePolicy};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied,
    Rejected,
    Failed,
}

/// What happened to one directive, plus the line appended to the reply for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectiveOutcome {
    pub kind: DirectiveKind,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<&'static str>,
    pub line: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReport {
    pub reply: String,
    pub outcomes: Vec<DirectiveOutcome>,
}

pub struct DirectiveExecutor {
    store: SharedStore,
    policy: DirectivePolicy,
}

impl DirectiveExecutor {
    pub fn new(store: SharedStore, policy: DirectivePolicy) -> Self {
        Self { store, policy }
    }

    pub async fn apply(&self, reply: &str) -> ExecutionReport {
        self.apply_on(reply, VisitDate::today(), Utc::now()).await
    }

    /// Parses `reply`, runs each directive in priority order and appends one line per
    /// directive. A failing directive never stops the ones after it.
    pub async fn apply_on(&self, reply: &str, today: VisitDate, now: DateTime<Utc>) -> ExecutionReport {
        let directives = parse_directives(reply);
        if directives.is_empty() {
            return ExecutionReport { reply: reply.to_string(), outcomes: Vec::new() };
        }

        let mut outcomes = Vec::with_capacity(directives.len());
        for directive in &directives {
            outcomes.push(self.run(directive, today, now).await);
        }

        let lines = outcomes.iter().map(|outcome| outcome.line.as_str()).collect::<Vec<_>>();
        ExecutionReport { reply: format!("{}\n\n{}", reply.trim_end(), lines.join("\n")), outcomes }
    }

    async fn run(&self, directive: &Directive, today: VisitDate, now: DateTime<Utc>) -> DirectiveOutcome {
        let kind = directive.kind();
        let action = match self.policy.evaluate(directive) {
            DirectiveDecision::Allow(action) => action,
            DirectiveDecision::Deny { reason_code, user_message }
            | DirectiveDecision::Degrade { reason_code, user_message } => {
                tracing::info!(
                    event_name = "directive.rejected",
                    kind = kind.as_str(),
                    reason_code,
                    "directive refused by policy"
                );
                return DirectiveOutcome {
                    kind,
                    status: OutcomeStatus::Rejected,
                    reason_code: Some(reason_code),
                    line: user_message,
                };
            }
        };

        match self.perform(&action, today, now).await {
            Ok(line) => {
                tracing::info!(event_name = "directive.applied", kind = kind.as_str(), "{line}");
                DirectiveOutcome { kind, status: OutcomeStatus::Applied, reason_code: None, line }
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "directive.store_failed",
                    kind = kind.as_str(),
                    error = %error,
                    "directive could not be applied"
                );
                DirectiveOutcome {
                    kind,
                    status: OutcomeStatus::Failed,
                    reason_code: Some("store_unavailable"),
                    line: format!(
                        "Could not {}: the records store is unavailable.",
                        describe(&action)
                    ),
                }
            }
        }
    }

    async fn perform(
        &self,
        action: &ApprovedAction,
        today: VisitDate,
        now: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        match action {
            ApprovedAction::SetBookingStatus { booking_id, status } => {
                let mut fields = Map::new();
                fields.insert("status".to_string(), Value::from(status.as_str()));
                self.store
                    .update_fields(&record_path(collections::BOOKINGS, &booking_id.0), fields)
                    .await?;
                Ok(format!("Booking {booking_id} status updated to {status}."))
            }
            ApprovedAction::DeleteReview { review_id } => {
                self.store.remove(&record_path(collections::REVIEWS, &review_id.0)).await?;
                Ok(format!("Review {review_id} deleted."))
            }
            ApprovedAction::TagBargainer { phone } => {
                let note = CustomerNote::bargainer(now);
                self.store
                    .set(
                        &record_path(collections::CUSTOMER_NOTES, phone),
                        json!({ "tag": note.tag, "timestamp": note.timestamp.to_rfc3339() }),
                    )
                    .await?;
                Ok(format!("Customer {phone} tagged as {}.", note.tag))
            }
            ApprovedAction::VisitorReport => {
                let day = today.key();
                let visitors = self
                    .store
                    .read_all(&record_path(collections::DAILY_VISITORS, &day))
                    .await?;
                let unbooked = visitors
                    .iter()
                    .map(|record| DailyVisitor::from_document(&record.key, &record.value))
                    .filter(|visitor| !visitor.booked)
                    .map(|visitor| visitor.visitor_id)
                    .collect::<Vec<_>>();
                let listed = if unbooked.is_empty() { "None".to_string() } else { unbooked.join(", ") };
                Ok(format!("Visitors who didn't book today ({day}): {listed}"))
            }
        }
    }
}

fn describe(action: &ApprovedAction) -> String {
    match action {
        ApprovedAction::SetBookingStatus { booking_id, .. } => format!("update booking {booking_id}"),
        ApprovedAction::DeleteReview { review_id } => format!("delete review {review_id}"),
        ApprovedAction::TagBargainer { phone } => format!("tag customer {phone}"),
        ApprovedAction::VisitorReport => "list today's visitors".to_string(),
    }
}
