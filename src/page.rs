//! The remote-command boundary between the session and a browser tab.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::types::{ElementHandle, Locator};

/// Failure of a single browser command
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PageError {
    /// An asynchronous script did not call back within its budget
    #[error("script timeout")]
    ScriptTimeout,
    /// Locator matched nothing, or the handle went stale
    #[error("no such element: {0}")]
    NoSuchElement(String),
    /// The script threw inside the page
    #[error("javascript error: {0}")]
    Script(String),
    /// Any other command failure (session gone, navigation raced, ...)
    #[error("command failed: {0}")]
    Command(String),
}

/// One browser tab driven over a synchronous remote-command channel.
///
/// Scripts follow WebDriver conventions: `execute` returns the value of a
/// `return` statement, `execute_async` resolves through the callback passed
/// as the last entry of `arguments`.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), PageError>;

    async fn back(&self) -> Result<(), PageError>;

    async fn forward(&self) -> Result<(), PageError>;

    async fn current_url(&self) -> Result<String, PageError>;

    async fn find(&self, locator: &Locator) -> Result<ElementHandle, PageError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), PageError>;

    async fn clear(&self, element: &ElementHandle) -> Result<(), PageError>;

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), PageError>;

    /// Press the pointer on `source`, move it over `target` and release
    async fn drag_and_drop(
        &self,
        source: &ElementHandle,
        target: &ElementHandle,
    ) -> Result<(), PageError>;

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, PageError>;

    /// Run an asynchronous script, giving up with [`PageError::ScriptTimeout`]
    /// once `budget` has elapsed without a callback.
    async fn execute_async(
        &self,
        script: &str,
        args: Vec<Value>,
        budget: Duration,
    ) -> Result<Value, PageError>;

    async fn close_window(&self) -> Result<(), PageError>;

    async fn quit(&self) -> Result<(), PageError>;
}
