//! Chat pipeline for the rental desk.
//!
//! A message is routed by [`rentdesk_core::intent`], enriched with either the business
//! report (`report`) or public lookups (`lookup`), answered through the completion client
//! (`llm`), and, for business requests, scanned for directives (`directives`) that pass the
//! policy (`guardrails`) before the executor (`executor`) applies them to the store.
//!
//! The LLM only proposes record changes. Whether a change is allowed, and how it is written,
//! is decided here.

pub mod directives;
pub mod executor;
pub mod guardrails;
pub mod llm;
pub mod lookup;
pub mod prompts;
pub mod report;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use directives::{parse_directives, Directive, DirectiveKind};
pub use executor::{DirectiveExecutor, DirectiveOutcome, ExecutionReport, OutcomeStatus};
pub use guardrails::{ApprovedAction, DirectiveDecision, DirectivePolicy};
pub use llm::{CompletionClient, CompletionFailure, HttpLlmClient, LlmClient, FALLBACK_REPLY};
pub use lookup::{ExternalContext, LookupAggregator, LookupFailure, LookupService};
pub use report::{BusinessReport, ReportBuilder, DATA_UNAVAILABLE};
pub use runtime::{AgentRuntime, ChatOutcome, ChatRequest};
