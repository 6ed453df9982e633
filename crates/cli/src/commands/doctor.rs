use secrecy::ExposeSecret;
use serde::Serialize;
use tripsmith_agent::AgentRuntime;
use tripsmith_core::config::{
    AppConfig, LoadOptions, LLM_API_KEY_ALIAS_ENV, SEARCH_API_KEY_ALIAS_ENV,
};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 3] = ["llm_credentials", "search_credentials", "runtime_wiring"];

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_credential(
                "llm_credentials",
                config.llm.api_key.expose_secret(),
                LLM_API_KEY_ALIAS_ENV,
                &format!("model `{}` at {}", config.llm.model, config.llm.base_url),
            ));
            checks.push(check_credential(
                "search_credentials",
                config.search.api_key.expose_secret(),
                SEARCH_API_KEY_ALIAS_ENV,
                &format!("search endpoint {}", config.search.base_url),
            ));
            checks.push(check_runtime_wiring(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_credential(name: &'static str, key: &str, env_hint: &str, target: &str) -> DoctorCheck {
    let length = key.chars().count();
    if length < 8 {
        return DoctorCheck {
            name,
            status: CheckStatus::Fail,
            details: format!("api key looks truncated ({length} chars); re-check `{env_hint}`"),
        };
    }
    DoctorCheck {
        name,
        status: CheckStatus::Pass,
        details: format!("api key present for {target}"),
    }
}

fn check_runtime_wiring(config: &AppConfig) -> DoctorCheck {
    match AgentRuntime::from_config(config) {
        Ok(_) => DoctorCheck {
            name: "runtime_wiring",
            status: CheckStatus::Pass,
            details: "http clients and itinerary template initialised".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "runtime_wiring",
            status: CheckStatus::Fail,
            details: format!("{error:#}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
