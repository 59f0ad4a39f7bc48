//! Running a list of keywords against one session

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{info, warn};

use crate::errors::{Result, TestabilityError};
use crate::session::Session;

/// One keyword invocation, as written in a batch file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStep {
    pub keyword: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub keyword: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// Parse batch steps given inline as JSON, or from a file with an `@` prefix
pub fn parse_batch(commands: &str) -> Result<Vec<BatchStep>> {
    let content = match commands.strip_prefix('@') {
        Some(file_path) => std::fs::read_to_string(file_path).map_err(|e| {
            TestabilityError::config(format!(
                "Failed to read commands from file {}: {}",
                file_path, e
            ))
        })?,
        None => commands.to_string(),
    };

    serde_json::from_str(&content)
        .map_err(|e| TestabilityError::config(format!("Invalid batch commands: {}", e)))
}

/// Run `steps` in order. With `stop_on_error` the first failure ends the
/// batch and later steps are not reported.
pub async fn run_batch(
    session: &mut Session,
    steps: &[BatchStep],
    stop_on_error: bool,
) -> Vec<BatchResult> {
    info!("Executing {} batch commands", steps.len());
    let mut results = Vec::with_capacity(steps.len());

    for step in steps {
        let started = Instant::now();
        let outcome = session.run_keyword(&step.keyword, &step.args).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(value) => BatchResult {
                keyword: step.keyword.clone(),
                ok: true,
                value: Some(value),
                error: None,
                exit_code: None,
                duration_ms,
            },
            Err(e) => {
                warn!("{} failed: {}", step.keyword, e);
                BatchResult {
                    keyword: step.keyword.clone(),
                    ok: false,
                    value: None,
                    error: Some(e.to_string()),
                    exit_code: Some(e.exit_code()),
                    duration_ms,
                }
            }
        };

        let failed = !result.ok;
        results.push(result);
        if failed && stop_on_error {
            break;
        }
    }

    let failures = results.iter().filter(|r| !r.ok).count();
    info!(
        "Batch execution complete: {} succeeded, {} failed",
        results.len() - failures,
        failures
    );
    results
}

/// Exit code of the first failed step, if any
pub fn first_failure(results: &[BatchResult]) -> Option<i32> {
    results.iter().find_map(|r| r.exit_code)
}
