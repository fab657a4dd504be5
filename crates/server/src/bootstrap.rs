use std::sync::Arc;
use std::time::Duration;

use rentdesk_agent::{
    lookup, AgentRuntime, CompletionClient, DirectivePolicy, HttpLlmClient, LlmClient,
};
use rentdesk_core::config::{AppConfig, ConfigError};
use rentdesk_db::{SharedStore, StoreError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub store: SharedStore,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("records store could not be opened: {0}")]
    Store(#[source] StoreError),
    #[error("completion client could not be built: {0}")]
    Completion(#[source] anyhow::Error),
    #[error("lookup services could not be built: {0}")]
    Lookup(#[source] anyhow::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let llm = HttpLlmClient::from_config(&config.llm).map_err(BootstrapError::Completion)?;
    bootstrap_with_llm(config, Arc::new(llm)).await
}

/// Same as [`bootstrap_with_config`] but with a caller-supplied completion service.
pub async fn bootstrap_with_llm(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    let store = rentdesk_db::open(&config.database).await.map_err(BootstrapError::Store)?;
    info!(
        event_name = "system.bootstrap.store_opened",
        correlation_id = "bootstrap",
        in_memory = config.database.is_in_memory(),
        "records store ready"
    );

    let lookups = lookup::from_config(&config.lookup).map_err(BootstrapError::Lookup)?;
    info!(
        event_name = "system.bootstrap.lookups_registered",
        correlation_id = "bootstrap",
        sources = ?lookups.registered_sources(),
        "lookup services registered"
    );

    let completion = CompletionClient::new(llm, Duration::from_secs(config.llm.timeout_secs));
    let runtime = AgentRuntime::new(
        Arc::clone(&store),
        completion,
        lookups,
        DirectivePolicy::from(&config.directives),
    )
    .with_default_sources(config.lookup.default_sources.clone());

    Ok(Application { config, store, runtime: Arc::new(runtime) })
}
