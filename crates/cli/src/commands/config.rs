use std::env;
use std::fs;
use std::path::Path;

use rentdesk_core::config::{resolve_config_path, AppConfig, LoadOptions};
use rentdesk_core::LookupSource;
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let sources = config
        .lookup
        .default_sources
        .iter()
        .map(LookupSource::label)
        .collect::<Vec<_>>()
        .join(",");

    let fields: Vec<(&str, &str, String)> = vec![
        ("database.url", "RENTDESK_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "RENTDESK_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            "RENTDESK_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        ("llm.provider", "RENTDESK_LLM_PROVIDER", format!("{:?}", config.llm.provider)),
        ("llm.model", "RENTDESK_LLM_MODEL", config.llm.model.clone()),
        (
            "llm.base_url",
            "RENTDESK_LLM_BASE_URL",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        ("llm.api_key", "RENTDESK_LLM_API_KEY", redact(config.llm.api_key.as_ref())),
        ("llm.timeout_secs", "RENTDESK_LLM_TIMEOUT_SECS", config.llm.timeout_secs.to_string()),
        (
            "lookup.timeout_secs",
            "RENTDESK_LOOKUP_TIMEOUT_SECS",
            config.lookup.timeout_secs.to_string(),
        ),
        ("lookup.max_items", "RENTDESK_LOOKUP_MAX_ITEMS", config.lookup.max_items.to_string()),
        (
            "lookup.news_api_key",
            "RENTDESK_LOOKUP_NEWS_API_KEY",
            redact(config.lookup.news_api_key.as_ref()),
        ),
        ("lookup.default_sources", "RENTDESK_LOOKUP_DEFAULT_SOURCES", sources),
        ("server.bind_address", "RENTDESK_SERVER_BIND_ADDRESS", config.server.bind_address.clone()),
        ("server.port", "RENTDESK_SERVER_PORT", config.server.port.to_string()),
        (
            "directives.review_deletion_enabled",
            "RENTDESK_DIRECTIVES_REVIEW_DELETION_ENABLED",
            config.directives.review_deletion_enabled.to_string(),
        ),
        (
            "directives.customer_tagging_enabled",
            "RENTDESK_DIRECTIVES_CUSTOMER_TAGGING_ENABLED",
            config.directives.customer_tagging_enabled.to_string(),
        ),
        ("logging.level", "RENTDESK_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "RENTDESK_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.into_iter().map(|(key, env_key, value)| {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        render_line(key, &value, &source)
    }));
    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if config_file_doc.is_some_and(|doc| contains_path(doc, key_path)) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: &str) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if secret.expose_secret().trim().is_empty() => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
        None => "<unset>".to_string(),
    }
}
