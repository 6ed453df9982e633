use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use tripsmith_core::config::{
    AppConfig, ConfigOverrides, LoadOptions, LLM_API_KEY_ALIAS_ENV, LLM_API_KEY_ENV,
    SEARCH_API_KEY_ALIAS_ENV, SEARCH_API_KEY_ENV,
};

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    override_flag: Option<&'static str>,
}

impl Field {
    fn new(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Self {
        Self { key, value, env_keys, override_flag: None }
    }

    fn overridden_by(mut self, flag: &'static str, is_set: bool) -> Self {
        if is_set {
            self.override_flag = Some(flag);
        }
        self
    }
}

pub fn run(options: LoadOptions) -> String {
    let explicit_path = options.config_path.clone();
    let overrides = options.overrides.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];
    for field in fields(&config, &overrides) {
        let source = match field.override_flag {
            Some(flag) => format!("override ({flag})"),
            None => field_source(
                field.key,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        };
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig, overrides: &ConfigOverrides) -> Vec<Field> {
    let llm = &config.llm;
    let search = &config.search;
    let logging = &config.logging;

    vec![
        Field::new(
            "llm.api_key",
            redact_token(llm.api_key.expose_secret()),
            &[LLM_API_KEY_ENV, LLM_API_KEY_ALIAS_ENV],
        ),
        Field::new("llm.base_url", llm.base_url.clone(), &["TRIPSMITH_LLM_BASE_URL"]),
        Field::new("llm.model", llm.model.clone(), &["TRIPSMITH_LLM_MODEL"])
            .overridden_by("--model", overrides.llm_model.is_some()),
        Field::new(
            "llm.timeout_secs",
            llm.timeout_secs.to_string(),
            &["TRIPSMITH_LLM_TIMEOUT_SECS"],
        ),
        Field::new("llm.max_retries", llm.max_retries.to_string(), &["TRIPSMITH_LLM_MAX_RETRIES"]),
        Field::new(
            "search.api_key",
            redact_token(search.api_key.expose_secret()),
            &[SEARCH_API_KEY_ENV, SEARCH_API_KEY_ALIAS_ENV],
        ),
        Field::new("search.base_url", search.base_url.clone(), &["TRIPSMITH_SEARCH_BASE_URL"]),
        Field::new(
            "search.timeout_secs",
            search.timeout_secs.to_string(),
            &["TRIPSMITH_SEARCH_TIMEOUT_SECS"],
        ),
        Field::new(
            "search.max_retries",
            search.max_retries.to_string(),
            &["TRIPSMITH_SEARCH_MAX_RETRIES"],
        ),
        Field::new(
            "search.include_answer",
            search.include_answer.to_string(),
            &["TRIPSMITH_SEARCH_INCLUDE_ANSWER"],
        ),
        Field::new(
            "logging.level",
            logging.level.clone(),
            &["TRIPSMITH_LOGGING_LEVEL", "TRIPSMITH_LOG_LEVEL"],
        )
        .overridden_by("--log-level", overrides.log_level.is_some()),
        Field::new(
            "logging.format",
            format!("{:?}", logging.format),
            &["TRIPSMITH_LOGGING_FORMAT", "TRIPSMITH_LOG_FORMAT"],
        )
        .overridden_by("--log-format", overrides.log_format.is_some()),
    ]
}

fn detect_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then_some(path);
    }

    ["tripsmith.toml", "config/tripsmith.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
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

/// Keeps a recognisable prefix (`tvly-***`) and hides everything else.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        if prefix.len() <= 8 {
            return format!("{prefix}-***");
        }
    }

    "<redacted>".to_string()
}
