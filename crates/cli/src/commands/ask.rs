use std::sync::Arc;
use std::time::Duration;

use crate::commands::{prepare, CommandResult};
use rentdesk_agent::{
    lookup, AgentRuntime, ChatOutcome, ChatRequest, CompletionClient, DirectivePolicy,
    HttpLlmClient,
};
use rentdesk_core::LookupSelector;

pub fn run(message: &str, kind: Option<&str>) -> CommandResult {
    if message.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_input", "No message provided", 7);
    }
    let selector = match kind.map(str::parse::<LookupSelector>).transpose() {
        Ok(selector) => selector,
        Err(reason) => return CommandResult::failure("ask", "invalid_input", reason, 7),
    };

    let (config, runtime) = match prepare("ask") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result: Result<ChatOutcome, (&'static str, String, u8)> = runtime.block_on(async {
        let store = rentdesk_db::open(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let llm = HttpLlmClient::from_config(&config.llm)
            .map_err(|error| ("completion_init", error.to_string(), 5u8))?;
        let lookups = lookup::from_config(&config.lookup)
            .map_err(|error| ("lookup_init", error.to_string(), 5u8))?;

        let agent = AgentRuntime::new(
            store,
            CompletionClient::new(Arc::new(llm), Duration::from_secs(config.llm.timeout_secs)),
            lookups,
            DirectivePolicy::from(&config.directives),
        )
        .with_default_sources(config.lookup.default_sources.clone());

        agent
            .handle(ChatRequest::new(message).with_selector(selector))
            .await
            .map_err(|error| ("chat", error.to_string(), 6u8))
    });

    match result {
        Ok(outcome) => CommandResult::success("ask", render_outcome(&outcome)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ask", error_class, message, exit_code)
        }
    }
}

fn render_outcome(outcome: &ChatOutcome) -> String {
    let mut lines = vec![format!("[{}] {}", outcome.intent.as_str(), outcome.reply)];
    if !outcome.context_sources.is_empty() {
        let sources = outcome
            .context_sources
            .iter()
            .map(|source| source.label())
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("context: {sources}"));
    }
    if let Some(failure) = &outcome.completion_failure {
        lines.push(format!("completion failed: {}", failure.reason_code()));
    }
    lines.join("\n")
}
