use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use rentdesk_core::intent::{route, Route};
use rentdesk_core::{ApplicationError, DomainError, Intent, LookupSelector, LookupSource};
use rentdesk_db::SharedStore;

use crate::executor::{DirectiveExecutor, DirectiveOutcome};
use crate::guardrails::DirectivePolicy;
use crate::llm::{CompletionClient, CompletionFailure, FALLBACK_REPLY};
use crate::lookup::LookupAggregator;
use crate::prompts;
use crate::report::ReportBuilder;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub correlation_id: String,
    pub message: String,
    pub selector: Option<LookupSelector>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { correlation_id: Uuid::new_v4().to_string(), message: message.into(), selector: None }
    }

    pub fn with_selector(mut self, selector: Option<LookupSelector>) -> Self {
        self.selector = selector;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatOutcome {
    pub correlation_id: String,
    pub intent: Intent,
    pub reply: String,
    pub directives: Vec<DirectiveOutcome>,
    pub context_sources: Vec<LookupSource>,
    pub completion_failure: Option<CompletionFailure>,
}

/// Runs one message through classification, context gathering, completion and, for
/// business requests, directive execution.
pub struct AgentRuntime {
    reports: ReportBuilder,
    lookups: LookupAggregator,
    completion: CompletionClient,
    executor: DirectiveExecutor,
    default_sources: Vec<LookupSource>,
}

impl AgentRuntime {
    pub fn new(
        store: SharedStore,
        completion: CompletionClient,
        lookups: LookupAggregator,
        policy: DirectivePolicy,
    ) -> Self {
        Self {
            reports: ReportBuilder::new(Arc::clone(&store)),
            lookups,
            completion,
            executor: DirectiveExecutor::new(store, policy),
            default_sources: vec![LookupSource::News, LookupSource::Wikipedia, LookupSource::Web],
        }
    }

    pub fn with_default_sources(mut self, sources: Vec<LookupSource>) -> Self {
        self.default_sources = sources;
        self
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<ChatOutcome, ApplicationError> {
        let started = Instant::now();
        let correlation_id = request.correlation_id;
        let message = request.message.trim();
        if message.is_empty() {
            return Err(DomainError::InvariantViolation("chat message must not be blank".to_string())
                .into());
        }

        let route = route(message, request.selector, &self.default_sources);
        let intent = route.intent();
        tracing::info!(
            event_name = "chat.routed",
            correlation_id = %correlation_id,
            intent = intent.as_str(),
            "chat request classified"
        );

        let mut context_sources = Vec::new();
        let prompt = match &route {
            Route::Business => prompts::business(&self.reports.build().await, message),
            Route::Lookup(sources) => {
                let context = self.lookups.gather(message, sources).await;
                if let Some(context) = &context {
                    context_sources = context.sources();
                }
                prompts::general(context.as_ref(), message)
            }
            Route::Direct => prompts::general(None, message),
        };

        let (reply, completion_failure) = match self.completion.complete(&prompt).await {
            Ok(reply) => (reply, None),
            Err(failure) => {
                tracing::warn!(
                    event_name = "chat.completion_failed",
                    correlation_id = %correlation_id,
                    reason_code = failure.reason_code(),
                    error = %failure,
                    "substituting fallback reply"
                );
                (FALLBACK_REPLY.to_string(), Some(failure))
            }
        };

        let (reply, directives) = if intent == Intent::Business && completion_failure.is_none() {
            let execution = self.executor.apply(&reply).await;
            (execution.reply, execution.outcomes)
        } else {
            (reply, Vec::new())
        };

        tracing::info!(
            event_name = "chat.completed",
            correlation_id = %correlation_id,
            intent = intent.as_str(),
            directives = directives.len(),
            context_sources = context_sources.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat request handled"
        );

        Ok(ChatOutcome {
            correlation_id,
            intent,
            reply,
            directives,
            context_sources,
            completion_failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::{AgentRuntime, ChatRequest};
    use crate::executor::OutcomeStatus;
    use crate::guardrails::DirectivePolicy;
    use crate::llm::tests::FakeLlm;
    use crate::llm::{CompletionClient, CompletionFailure, FALLBACK_REPLY};
    use crate::lookup::tests::{Behaviour, FakeLookup};
    use crate::lookup::LookupAggregator;
    use crate::report::DATA_UNAVAILABLE;
    use crate::testing::FailingStore;
    use rentdesk_core::{ApplicationError, Intent, LookupSelector, LookupSource};
    use rentdesk_db::{DocumentStore, InMemoryDocumentStore};

    fn lookups(services: Vec<Arc<FakeLookup>>) -> LookupAggregator {
        let mut aggregator = LookupAggregator::new(Duration::from_millis(100), 3)
            .with_overall_timeout(Duration::from_millis(300));
        for service in services {
            aggregator.register(service);
        }
        aggregator
    }

    fn runtime(
        store: Arc<dyn DocumentStore>,
        llm: Arc<FakeLlm>,
        services: Vec<Arc<FakeLookup>>,
    ) -> AgentRuntime {
        AgentRuntime::new(
            store,
            CompletionClient::new(llm, Duration::from_millis(200)),
            lookups(services),
            DirectivePolicy::default(),
        )
    }

    fn bookings_store() -> Arc<InMemoryDocumentStore> {
        Arc::new(InMemoryDocumentStore::with_root(json!({
            "bookings": {"B17": {"name": "Asha", "phone": "111", "finalPrice": 300, "status": "Active"}}
        })))
    }

    #[tokio::test]
    async fn business_request_gets_report_and_applies_directives() {
        let store = bookings_store();
        let llm = Arc::new(FakeLlm::replying("Done. Change booking B17 status to Completed."));
        let news = FakeLookup::new(LookupSource::News, Behaviour::Items(vec!["headline"]));
        let runtime = runtime(store.clone(), llm.clone(), vec![news.clone()]);

        let outcome = runtime
            .handle(ChatRequest::new("mark booking B17 completed"))
            .await
            .expect("outcome");

        assert_eq!(outcome.intent, Intent::Business);
        assert!(outcome.reply.ends_with("Booking B17 status updated to Completed."));
        assert_eq!(outcome.directives[0].status, OutcomeStatus::Applied);
        assert!(llm.last_prompt().unwrap_or_default().contains("- Booking B17:"));
        assert_eq!(news.calls.load(Ordering::SeqCst), 0);

        let booking = store.get("bookings/B17").await.expect("read").unwrap_or_default();
        assert_eq!(booking["status"], "Completed");
    }

    #[tokio::test]
    async fn general_request_blends_context_and_skips_directives() {
        let store = bookings_store();
        let llm = Arc::new(FakeLlm::replying("Change booking B17 status to Cancelled."));
        let wiki = FakeLookup::new(LookupSource::Wikipedia, Behaviour::Items(vec!["A console."]));
        let runtime = runtime(store.clone(), llm.clone(), vec![wiki]);

        let outcome = runtime.handle(ChatRequest::new("what is a PS5?")).await.expect("outcome");

        assert_eq!(outcome.intent, Intent::General);
        assert_eq!(outcome.context_sources, vec![LookupSource::Wikipedia]);
        assert!(outcome.directives.is_empty());
        assert!(llm.last_prompt().unwrap_or_default().contains("Wikipedia:\n- A console."));
        let booking = store.get("bookings/B17").await.expect("read").unwrap_or_default();
        assert_eq!(booking["status"], "Active");
    }

    #[tokio::test]
    async fn failing_lookups_fall_back_to_a_direct_answer() {
        let llm = Arc::new(FakeLlm::replying("Plain answer."));
        let runtime = runtime(
            bookings_store(),
            llm.clone(),
            vec![
                FakeLookup::new(LookupSource::News, Behaviour::Fail),
                FakeLookup::new(LookupSource::Wikipedia, Behaviour::Hang),
                FakeLookup::new(LookupSource::Web, Behaviour::Fail),
            ],
        );

        let outcome = runtime.handle(ChatRequest::new("weather tomorrow?")).await.expect("outcome");

        assert_eq!(outcome.reply, "Plain answer.");
        assert!(outcome.context_sources.is_empty());
        assert!(!llm.last_prompt().unwrap_or_default().contains("Context:"));
    }

    #[tokio::test]
    async fn selector_overrides_business_keywords() {
        let llm = Arc::new(FakeLlm::replying("Scores."));
        let sports = FakeLookup::new(LookupSource::Sports, Behaviour::Items(vec!["2-1"]));
        let runtime = runtime(bookings_store(), llm, vec![sports.clone()]);

        let request = ChatRequest::new("booking of the stadium")
            .with_selector(Some(LookupSelector::Only(LookupSource::Sports)));
        let outcome = runtime.handle(request).await.expect("outcome");

        assert_eq!(outcome.intent, Intent::General);
        assert_eq!(sports.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completion_failure_substitutes_fallback() {
        let llm = Arc::new(FakeLlm::slow(Duration::from_secs(5)));
        let runtime = runtime(bookings_store(), llm.clone(), Vec::new());

        let outcome = runtime.handle(ChatRequest::new("total revenue?")).await.expect("outcome");

        assert_eq!(outcome.reply, FALLBACK_REPLY);
        assert!(matches!(outcome.completion_failure, Some(CompletionFailure::Timeout(_))));
        assert!(outcome.directives.is_empty());
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn store_outage_degrades_business_prompt() {
        let llm = Arc::new(FakeLlm::replying("No data right now."));
        let runtime = runtime(Arc::new(FailingStore), llm.clone(), Vec::new());

        let outcome = runtime.handle(ChatRequest::new("revenue today?")).await.expect("outcome");

        assert_eq!(outcome.reply, "No data right now.");
        assert!(llm.last_prompt().unwrap_or_default().contains(DATA_UNAVAILABLE));
    }

    #[tokio::test]
    async fn blank_message_is_rejected_before_any_call() {
        let llm = Arc::new(FakeLlm::replying("unused"));
        let news = FakeLookup::new(LookupSource::News, Behaviour::Items(vec!["n"]));
        let runtime = runtime(bookings_store(), llm.clone(), vec![news.clone()]);

        let error = runtime.handle(ChatRequest::new("   ")).await;

        assert!(matches!(error, Err(ApplicationError::Domain(_))));
        assert_eq!(llm.calls(), 0);
        assert_eq!(news.calls.load(Ordering::SeqCst), 0);
    }
}
