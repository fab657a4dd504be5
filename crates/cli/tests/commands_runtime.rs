use std::env;
use std::sync::{Mutex, OnceLock};

use rentdesk_cli::commands::{ask, config, migrate, report, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_for_sqlite_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = sqlite_url(&dir);
    with_env(&[("RENTDESK_DATABASE_URL", url.as_str())], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
    assert!(dir.path().join("records.db").exists());
}

#[test]
fn migrate_is_a_noop_for_memory_store() {
    with_env(&[("RENTDESK_DATABASE_URL", "memory://")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().unwrap_or_default().contains("in-memory"));
    });
}

#[test]
fn migrate_returns_config_failure_for_unsupported_database() {
    with_env(&[("RENTDESK_DATABASE_URL", "postgres://localhost/rentdesk")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_returns_summary_for_memory_store() {
    with_env(&[("RENTDESK_DATABASE_URL", "memory://")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("  - bookings: 4"));
        assert!(message.contains("  - reviews: 2"));
        assert!(message.contains("memory:// does not outlive this command"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = sqlite_url(&dir);
    with_env(&[("RENTDESK_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn report_reflects_seeded_records() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = sqlite_url(&dir);
    with_env(&[("RENTDESK_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = report::run();
        assert_eq!(result.exit_code, 0);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "report");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("Total bookings: 4"));
        assert!(message.contains("Completed: 1 | Cancelled: 1 | Active: 2"));
        assert!(message.contains("Visitors: 4 | Booked visitors: 2"));
        assert!(message.contains("- Booking BK-1002: Ravi Kumar (9876500002)"));
        assert!(message.contains("Customer tag: BARGAINER"));
    });
}

#[test]
fn report_on_empty_store_lists_no_bookings() {
    with_env(&[("RENTDESK_DATABASE_URL", "memory://")], || {
        let result = report::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("Total bookings: 0"));
        assert!(message.ends_with("Bookings: none"));
    });
}

#[test]
fn ask_rejects_blank_message_before_touching_services() {
    with_env(&[("RENTDESK_DATABASE_URL", "postgres://not-checked")], || {
        let result = ask::run("   ", None);
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["error_class"], "invalid_input");
        assert_eq!(payload["message"], "No message provided");
    });
}

#[test]
fn ask_rejects_unknown_lookup_type() {
    with_env(&[], || {
        let result = ask::run("who won the match?", Some("carrier-pigeon"));
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
        assert!(payload["message"].as_str().unwrap_or_default().contains("carrier-pigeon"));
    });
}

#[test]
fn config_attributes_env_values_and_redacts_keys() {
    with_env(
        &[
            ("RENTDESK_DATABASE_URL", "memory://"),
            ("RENTDESK_LLM_PROVIDER", "openai"),
            ("RENTDESK_LLM_API_KEY", "sk-test-secret"),
        ],
        || {
            let output = config::run();
            assert!(output.contains(
                "- database.url = memory:// (source: env (RENTDESK_DATABASE_URL))"
            ));
            assert!(output.contains(
                "- llm.api_key = <redacted> (source: env (RENTDESK_LLM_API_KEY))"
            ));
            assert!(output.contains("- server.port = "));
            assert!(!output.contains("sk-test-secret"));
        },
    );
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[("RENTDESK_DATABASE_URL", "mysql://nope")], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed:"));
    });
}

fn sqlite_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}", dir.path().join("records.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "RENTDESK_DATABASE_URL",
        "RENTDESK_DATABASE_MAX_CONNECTIONS",
        "RENTDESK_DATABASE_TIMEOUT_SECS",
        "RENTDESK_LLM_PROVIDER",
        "RENTDESK_LLM_API_KEY",
        "RENTDESK_LLM_BASE_URL",
        "RENTDESK_LLM_MODEL",
        "RENTDESK_LLM_TIMEOUT_SECS",
        "RENTDESK_LOOKUP_TIMEOUT_SECS",
        "RENTDESK_LOOKUP_MAX_ITEMS",
        "RENTDESK_LOOKUP_NEWS_API_KEY",
        "RENTDESK_LOOKUP_DEFAULT_SOURCES",
        "RENTDESK_SERVER_BIND_ADDRESS",
        "RENTDESK_SERVER_PORT",
        "RENTDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "RENTDESK_DIRECTIVES_REVIEW_DELETION_ENABLED",
        "RENTDESK_DIRECTIVES_CUSTOMER_TAGGING_ENABLED",
        "RENTDESK_LOGGING_LEVEL",
        "RENTDESK_LOGGING_FORMAT",
        "RENTDESK_LOG_LEVEL",
        "RENTDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
