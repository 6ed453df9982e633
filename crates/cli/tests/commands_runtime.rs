use std::env;
use std::future::pending;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tripsmith_agent::{AgentRuntime, LlmClient, LlmError, SearchClient, SearchError, SearchHit};
use tripsmith_cli::commands;
use tripsmith_cli::commands::chat::{converse, Presenter};
use tripsmith_core::config::{ConfigOverrides, LoadOptions, LogFormat};
use tripsmith_core::domain::session::TripSession;

const LLM_KEY: &str = "AIzaSyTestKey0123456789";
const SEARCH_KEY: &str = "tvly-test-0123456789";

#[test]
fn doctor_json_passes_with_both_credentials() {
    with_env(&[("GEMINI_API_KEY", LLM_KEY), ("TAVILY_API_KEY", SEARCH_KEY)], || {
        let result = commands::doctor::run(LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks should be an array")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(
            names,
            ["config_validation", "llm_credentials", "search_credentials", "runtime_wiring"]
        );
    });
}

#[test]
fn doctor_skips_dependent_checks_when_keys_are_missing() {
    with_env(&[], || {
        let result = commands::doctor::run(LoadOptions::default(), true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().expect("checks should be an array");
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert!(checks[1..].iter().all(|check| check["status"] == "skipped"));
    });
}

#[test]
fn doctor_human_output_flags_short_keys() {
    with_env(&[("GEMINI_API_KEY", LLM_KEY), ("TRIPSMITH_SEARCH_API_KEY", "tvly")], || {
        let result = commands::doctor::run(LoadOptions::default(), false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [ok] llm_credentials"));
        assert!(result.output.contains("- [fail] search_credentials"));
    });
}

#[test]
fn config_redacts_keys_and_reports_alias_source() {
    with_env(
        &[
            ("GEMINI_API_KEY", LLM_KEY),
            ("TRIPSMITH_SEARCH_API_KEY", SEARCH_KEY),
            ("TRIPSMITH_LLM_MODEL", "gemini-1.5-pro"),
        ],
        || {
            let output = commands::config::run(LoadOptions::default());

            assert!(!output.contains(LLM_KEY));
            assert!(!output.contains(SEARCH_KEY));
            assert!(output.contains("- llm.api_key = <redacted> (source: env (GEMINI_API_KEY))"));
            assert!(output
                .contains("- search.api_key = tvly-*** (source: env (TRIPSMITH_SEARCH_API_KEY))"));
            assert!(output
                .contains("- llm.model = gemini-1.5-pro (source: env (TRIPSMITH_LLM_MODEL))"));
            assert!(output.contains("- search.max_retries = 0 (source: default)"));
        },
    );
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[("TAVILY_API_KEY", SEARCH_KEY)], || {
        let output = commands::config::run(LoadOptions::default());
        assert!(output.starts_with("config validation failed:"));
        assert!(output.contains("GEMINI_API_KEY"));
    });
}

#[test]
fn chat_without_credentials_returns_structured_failure() {
    with_env(&[], || {
        let result = commands::chat::run(LoadOptions::default(), false);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "chat");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        let message = payload["message"].as_str().expect("message should be a string");
        assert!(message
            .starts_with("The planner is not configured. Check the API credentials and restart."));
        assert!(message.contains("GEMINI_API_KEY"));
    });
}

#[test]
fn config_attributes_command_line_overrides() {
    with_env(
        &[
            ("GEMINI_API_KEY", LLM_KEY),
            ("TAVILY_API_KEY", SEARCH_KEY),
            ("TRIPSMITH_LLM_MODEL", "gemini-from-env"),
        ],
        || {
            let output = commands::config::run(LoadOptions {
                overrides: ConfigOverrides {
                    llm_model: Some("gemini-1.5-flash".to_string()),
                    log_format: Some(LogFormat::Json),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            });

            assert!(output.contains("- llm.model = gemini-1.5-flash (source: override (--model))"));
            assert!(output.contains("- logging.format = Json (source: override (--log-format))"));
            assert!(output.contains("- logging.level = info (source: default)"));
        },
    );
}

struct CannedLlm;

#[async_trait]
impl LlmClient for CannedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if prompt.starts_with("Extract ONLY the travel destination") {
            return Ok("Lisbon".to_string());
        }
        Ok(String::new())
    }
}

struct NoResults;

#[async_trait]
impl SearchClient for NoResults {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn converse_greets_replies_and_says_goodbye() {
    let agent = AgentRuntime::with_clients(Arc::new(CannedLlm), Arc::new(NoResults))
        .expect("runtime should build with fake clients");
    let mut session = TripSession::new();
    let input: &[u8] = b"hi\n\nI'd like to see Lisbon\nhelp\nquit\nnever read\n";
    let mut output = Vec::new();

    converse(&agent, &mut session, input, &mut output, Presenter::plain(), pending())
        .await
        .expect("conversation should finish cleanly");

    let transcript = String::from_utf8(output).expect("output should be utf-8");
    assert!(transcript
        .starts_with("Assistant: Hi! I'm your travel assistant. Where would you like to go?"));
    assert!(transcript.contains(
        "Assistant: Hello! 😊 I'm your travel planning assistant. Where would you like to go?"
    ));
    assert!(transcript.contains("Assistant: Great choice! Lisbon sounds wonderful."));
    assert!(transcript.contains("start over"));
    assert!(transcript.ends_with("Safe travels!\n"));
    assert_eq!(session.slots.destination.as_deref(), Some("Lisbon"));
}

#[tokio::test]
async fn converse_start_over_prints_fresh_greeting() {
    let agent = AgentRuntime::with_clients(Arc::new(CannedLlm), Arc::new(NoResults))
        .expect("runtime should build with fake clients");
    let mut session = TripSession::new();
    let input: &[u8] = b"hi\nLisbon please\nstart over\n";
    let mut output = Vec::new();

    converse(&agent, &mut session, input, &mut output, Presenter::plain(), pending())
        .await
        .expect("conversation should finish cleanly");

    assert!(session.slots.destination.is_none());
    assert_eq!(session.transcript.len(), 1);
    let transcript = String::from_utf8(output).expect("output should be utf-8");
    let last_reply = transcript
        .lines()
        .filter(|line| line.starts_with("Assistant: ") || line.starts_with("> Assistant: "))
        .last()
        .expect("at least one reply");
    assert!(last_reply.ends_with(&session.transcript.messages()[0].content));
}

struct HangingLlm;

#[async_trait]
impl LlmClient for HangingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        pending().await
    }
}

#[tokio::test]
async fn shutdown_during_a_turn_ends_the_session() {
    let agent = AgentRuntime::with_clients(Arc::new(HangingLlm), Arc::new(NoResults))
        .expect("runtime should build with fake clients");
    let mut session = TripSession::new();
    let input: &[u8] = b"hi\nLisbon\nnever read\n";
    let mut output = Vec::new();

    converse(
        &agent,
        &mut session,
        input,
        &mut output,
        Presenter::plain(),
        tokio::time::sleep(Duration::from_millis(100)),
    )
    .await
    .expect("conversation should finish cleanly");

    let transcript = String::from_utf8(output).expect("output should be utf-8");
    assert!(transcript.contains("Where would you like to go?"));
    assert!(transcript.ends_with("Safe travels!\n"));
    assert!(session.slots.destination.is_none());
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TRIPSMITH_LLM_API_KEY",
        "GEMINI_API_KEY",
        "TRIPSMITH_LLM_BASE_URL",
        "TRIPSMITH_LLM_MODEL",
        "TRIPSMITH_LLM_TIMEOUT_SECS",
        "TRIPSMITH_LLM_MAX_RETRIES",
        "TRIPSMITH_SEARCH_API_KEY",
        "TAVILY_API_KEY",
        "TRIPSMITH_SEARCH_BASE_URL",
        "TRIPSMITH_SEARCH_TIMEOUT_SECS",
        "TRIPSMITH_SEARCH_MAX_RETRIES",
        "TRIPSMITH_SEARCH_INCLUDE_ANSWER",
        "TRIPSMITH_LOGGING_LEVEL",
        "TRIPSMITH_LOGGING_FORMAT",
        "TRIPSMITH_LOG_LEVEL",
        "TRIPSMITH_LOG_FORMAT",
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
