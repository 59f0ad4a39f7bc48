use thiserror::Error;

use crate::page::PageError;

/// Result alias used across the library
pub type Result<T, E = TestabilityError> = std::result::Result<T, E>;

/// Error type for every keyword, with exit codes for the CLI
#[derive(Debug, Error)]
pub enum TestabilityError {
    /// Readiness wait exceeded its deadline (exit code 5)
    #[error("Timed out waiting for testability ready callback to trigger within {0}")]
    Timeout(String),
    /// Script or browser command failed (exit code 6)
    #[error("Script evaluation failed: {0}")]
    Evaluation(#[from] PageError),
    /// Invalid duration, boolean or configuration value (exit code 7)
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// Keyword assertion did not hold (exit code 8)
    #[error("{0}")]
    Assertion(String),
    /// Element not found (exit code 2)
    #[error("No elements found matching locator: {0}")]
    ElementNotFound(String),
    /// Keyword name not known to the session (exit code 3)
    #[error("Unknown keyword: {0}")]
    UnknownKeyword(String),
    /// WebDriver connection failed (exit code 4)
    #[error("WebDriver connection failed: {0}")]
    WebDriverFailed(String),
    /// Generic error (exit code 1)
    #[error(transparent)]
    Other(anyhow::Error),
}

impl TestabilityError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TestabilityError::Other(_) => 1,
            TestabilityError::ElementNotFound(_) => 2,
            TestabilityError::UnknownKeyword(_) => 3,
            TestabilityError::WebDriverFailed(_) => 4,
            TestabilityError::Timeout(_) => 5,
            TestabilityError::Evaluation(_) => 6,
            TestabilityError::Configuration(_) => 7,
            TestabilityError::Assertion(_) => 8,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        TestabilityError::Configuration(msg.into())
    }
}

impl From<anyhow::Error> for TestabilityError {
    fn from(err: anyhow::Error) -> Self {
        // Errors that were ours before being wrapped keep their kind
        let err = match err.downcast::<TestabilityError>() {
            Ok(inner) => return inner,
            Err(err) => err,
        };

        let msg = err.to_string();
        if msg.contains("Failed to connect to WebDriver")
            || msg.contains("geckodriver")
            || msg.contains("chromedriver")
        {
            TestabilityError::WebDriverFailed(msg)
        } else {
            TestabilityError::Other(err)
        }
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;
