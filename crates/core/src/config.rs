use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LLM_API_KEY_ENV: &str = "TRIPSMITH_LLM_API_KEY";
pub const LLM_API_KEY_ALIAS_ENV: &str = "GEMINI_API_KEY";
pub const SEARCH_API_KEY_ENV: &str = "TRIPSMITH_SEARCH_API_KEY";
pub const SEARCH_API_KEY_ALIAS_ENV: &str = "TAVILY_API_KEY";

const MAX_RETRIES_LIMIT: u32 = 5;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub include_answer: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Number of additional attempts a remote call may make after the first one.
///
/// `max_retries == 0` means every remote call is attempted exactly once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self { max_retries: 0 }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl LlmConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { max_retries: self.max_retries }
    }
}

impl SearchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { max_retries: self.max_retries }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                model: "gemini-1.5-pro".to_string(),
                timeout_secs: 60,
                max_retries: 0,
            },
            search: SearchConfig {
                api_key: String::new().into(),
                base_url: "https://api.tavily.com".to_string(),
                timeout_secs: 30,
                max_retries: 0,
                include_answer: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("tripsmith.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = secret_value(api_key);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(search) = patch.search {
            if let Some(api_key) = search.api_key {
                self.search.api_key = secret_value(api_key);
            }
            if let Some(base_url) = search.base_url {
                self.search.base_url = base_url;
            }
            if let Some(timeout_secs) = search.timeout_secs {
                self.search.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = search.max_retries {
                self.search.max_retries = max_retries;
            }
            if let Some(include_answer) = search.include_answer {
                self.search.include_answer = include_answer;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let llm_api_key = read_env(LLM_API_KEY_ENV).or_else(|| read_env(LLM_API_KEY_ALIAS_ENV));
        if let Some(value) = llm_api_key {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("TRIPSMITH_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("TRIPSMITH_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("TRIPSMITH_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TRIPSMITH_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TRIPSMITH_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("TRIPSMITH_LLM_MAX_RETRIES", &value)?;
        }

        let search_api_key =
            read_env(SEARCH_API_KEY_ENV).or_else(|| read_env(SEARCH_API_KEY_ALIAS_ENV));
        if let Some(value) = search_api_key {
            self.search.api_key = secret_value(value);
        }
        if let Some(value) = read_env("TRIPSMITH_SEARCH_BASE_URL") {
            self.search.base_url = value;
        }
        if let Some(value) = read_env("TRIPSMITH_SEARCH_TIMEOUT_SECS") {
            self.search.timeout_secs = parse_u64("TRIPSMITH_SEARCH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TRIPSMITH_SEARCH_MAX_RETRIES") {
            self.search.max_retries = parse_u32("TRIPSMITH_SEARCH_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("TRIPSMITH_SEARCH_INCLUDE_ANSWER") {
            self.search.include_answer = parse_bool("TRIPSMITH_SEARCH_INCLUDE_ANSWER", &value)?;
        }

        let log_level =
            read_env("TRIPSMITH_LOGGING_LEVEL").or_else(|| read_env("TRIPSMITH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TRIPSMITH_LOGGING_FORMAT").or_else(|| read_env("TRIPSMITH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_search(&self.search)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tripsmith.toml"), PathBuf::from("config/tripsmith.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_api_key(
    key_path: &str,
    env_hint: &str,
    value: &SecretString,
) -> Result<(), ConfigError> {
    let api_key = value.expose_secret();
    if api_key.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{key_path} is required. Set `{env_hint}` in the environment or a .env file"
        )));
    }
    if api_key.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "{key_path} must not contain whitespace (check `{env_hint}` for stray quotes or spaces)"
        )));
    }
    Ok(())
}

fn validate_base_url(key_path: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{key_path} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn validate_timeout(key_path: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key_path} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_retries(key_path: &str, max_retries: u32) -> Result<(), ConfigError> {
    if max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "{key_path} must be at most {MAX_RETRIES_LIMIT}"
        )));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    validate_api_key("llm.api_key", LLM_API_KEY_ALIAS_ENV, &llm.api_key)?;
    validate_base_url("llm.base_url", &llm.base_url)?;
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    validate_timeout("llm.timeout_secs", llm.timeout_secs)?;
    validate_retries("llm.max_retries", llm.max_retries)
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    validate_api_key("search.api_key", SEARCH_API_KEY_ALIAS_ENV, &search.api_key)?;
    validate_base_url("search.base_url", &search.base_url)?;
    validate_timeout("search.timeout_secs", search.timeout_secs)?;
    validate_retries("search.max_retries", search.max_retries)
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    search: Option<SearchPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    include_answer: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
