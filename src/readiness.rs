//! Blocking the calling task until the page agent reports readiness.
//!
//! The host cannot be notified by the browser, so readiness is polled: each
//! poll runs an asynchronous script whose callback fires once the agent has
//! no pending work, bounded by the time left before the deadline.

use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::{Result, TestabilityError};
use crate::page::PageError;
use crate::scripts;
use crate::session::Session;
use crate::settings::{format_timestr, parse_bool, parse_timestr};

/// Pause between readiness polls
pub const POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Shortest budget given to a single evaluation
pub const MIN_EVALUATION_BUDGET: Duration = Duration::from_millis(50);

// Deadline used when a timeout does not fit the clock
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    /// Evaluation failed for a reason other than "not ready yet"
    EvaluationFailed(String),
}

/// Deadline bookkeeping for a fixed-interval poll loop
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    deadline: Instant,
    interval: Duration,
}

impl Poller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            deadline: now
                .checked_add(timeout)
                .unwrap_or_else(|| now + FAR_FUTURE),
            interval,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Budget for the next evaluation: never past the deadline by more
    /// than [`MIN_EVALUATION_BUDGET`], never longer than one interval
    pub fn budget(&self) -> Duration {
        self.remaining()
            .min(self.interval)
            .max(MIN_EVALUATION_BUDGET)
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Sleep until the next poll. Returns `false` once the deadline passed.
    pub async fn tick(&self) -> bool {
        if self.expired() {
            return false;
        }
        tokio::time::sleep(self.interval.min(self.remaining())).await;
        true
    }
}

fn classify(result: std::result::Result<Value, PageError>) -> Option<WaitOutcome> {
    match result {
        Ok(Value::Bool(true)) => Some(WaitOutcome::Ready),
        Ok(_) | Err(PageError::ScriptTimeout) => None,
        Err(e) => Some(WaitOutcome::EvaluationFailed(e.to_string())),
    }
}

impl Session {
    /// Explicitly wait until the page agent is ready or the timeout passes.
    ///
    /// Both overrides are coerced like their setters and default to the
    /// session settings.
    pub async fn wait_for_testability_ready(
        &mut self,
        timeout: Option<&str>,
        error_on_timeout: Option<&str>,
    ) -> Result<()> {
        debug!(
            "Session: wait_for_testability_ready({:?}, {:?})",
            timeout, error_on_timeout
        );
        let timeout = match timeout {
            Some(t) => parse_timestr(t)?,
            None => self.settings().timeout,
        };
        let error_on_timeout = match error_on_timeout {
            Some(v) => parse_bool(v)?,
            None => self.settings().error_on_timeout,
        };
        self.wait_for_ready(timeout, error_on_timeout).await
    }

    /// Wait with explicit parameters, applying the timeout and error policy
    pub async fn wait_for_ready(&mut self, timeout: Duration, error_on_timeout: bool) -> Result<()> {
        let outcome = self
            .poll_script(
                "wait_for_testability_ready",
                scripts::WAIT_FOR_TESTABILITY,
                timeout,
            )
            .await?;
        settle(outcome, timeout, error_on_timeout, "testability")
    }

    /// Wait until `document.readyState` is `complete`
    pub async fn wait_for_document_ready(&mut self) -> Result<()> {
        debug!("Session: wait_for_document_ready()");
        let timeout = self.settings().timeout;
        let error_on_timeout = self.settings().error_on_timeout;
        let outcome = self
            .poll_script(
                "wait_for_document_ready",
                scripts::WAIT_FOR_DOCUMENT_READY,
                timeout,
            )
            .await?;
        settle(outcome, timeout, error_on_timeout, "document")
    }

    /// Raw poll loop, for callers that want the outcome itself.
    ///
    /// Only failures raised by other listeners are returned as errors;
    /// page failures become [`WaitOutcome::EvaluationFailed`].
    pub async fn poll_script(
        &mut self,
        keyword: &str,
        script: &str,
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        let poller = Poller::new(timeout, POLL_INTERVAL);
        loop {
            let result = match self
                .run_async_script(keyword, script, vec![], poller.budget())
                .await
            {
                Ok(value) => Ok(value),
                Err(TestabilityError::Evaluation(e)) => Err(e),
                Err(other) => return Err(other),
            };
            if let Some(outcome) = classify(result) {
                return Ok(outcome);
            }
            if !poller.tick().await {
                return Ok(WaitOutcome::TimedOut);
            }
        }
    }
}

fn settle(outcome: WaitOutcome, timeout: Duration, error_on_timeout: bool, what: &str) -> Result<()> {
    match outcome {
        WaitOutcome::Ready => {
            debug!("{} ready", what);
            Ok(())
        }
        WaitOutcome::TimedOut if error_on_timeout => {
            Err(TestabilityError::Timeout(format_timestr(timeout)))
        }
        WaitOutcome::TimedOut => {
            warn!(
                "{} not ready within {}, continuing",
                what,
                format_timestr(timeout)
            );
            Ok(())
        }
        WaitOutcome::EvaluationFailed(e) => {
            warn!("Waiting for {} readiness failed, continuing: {}", what, e);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "readiness_test.rs"]
mod readiness_test;
