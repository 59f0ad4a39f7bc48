//! # testability
#![allow(clippy::uninlined_format_args)]
//!
//! Automatic waiting for asynchronous page activity in WebDriver-driven UI tests.
//!
//! A small page agent is injected into every loaded page. It counts pending
//! timers, `fetch`/`XMLHttpRequest` calls and CSS transitions/animations.
//! Before each interaction (find, click, change value) the session polls the
//! agent until it reports no pending work, so tests stop sleeping and stop
//! racing the application.
//!
//! ## Primary Use Case
//!
//! Test code drives a [`Session`] the way it would drive a plain WebDriver
//! client; readiness waits happen transparently through the hook chain.
//! The `testability` binary runs keyword batches for scripted checks.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Start a driver first
//! geckodriver --port 4444
//!
//! # Run a batch of keywords (inline JSON or @file)
//! testability run '[{"keyword": "Go To", "args": ["https://example.com"]},
//!                   {"keyword": "Click Element", "args": ["css:a.more"]}]'
//! testability run @steps.json --browser chrome --stop-on-error
//!
//! # Check whether a page can be instrumented and settles in time
//! testability check "https://example.com" --timeout "10 seconds"
//! ```
//!
//! ### Configuration
//!
//! Settings come from `~/.testability/config.json` (or `--config PATH`),
//! then `TESTABILITY_*` environment variables, then command line flags:
//!
//! ```json
//! {
//!   "automatic_wait": true,
//!   "automatic_injection": true,
//!   "timeout": "30s",
//!   "error_on_timeout": true,
//!   "browser": "firefox",
//!   "agent": {"maxTimeout": 5000, "blacklist": [{"url": "/poll$", "method": "GET"}]}
//! }
//! ```
//!
//! Logs go to stderr and honour `RUST_LOG` (default `testability=info`);
//! results go to stdout as JSON.
//!
//! ## Library Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use testability::{BrowserType, Session, WebDriverPage};
//!
//! # async fn example() -> testability::Result<()> {
//! let page = WebDriverPage::connect(BrowserType::Firefox, "http://localhost:4444", true).await?;
//! let mut session = Session::new(Arc::new(page));
//!
//! session.set_testability_timeout("10 seconds")?;
//! session.go_to("https://example.com").await?;
//! // Waits for pending timers, requests and animations first
//! session.click_element("css:button.submit").await?;
//!
//! session.disable_testability_automatic_wait();
//! session.wait_for_testability_ready(Some("5s"), Some("false")).await?;
//! session.close_browser().await?;
//! # Ok(())
//! # }
//! ```

/// Keyword batches for the CLI
pub mod batch;

/// Configuration file and environment overrides
pub mod config;

/// Element visibility, overlay and attribute keywords
pub mod elements;

/// Error types and exit codes
pub mod errors;

/// Page agent injection
pub mod instrument;

/// Settings keywords and name-based dispatch
pub mod keywords;

/// Before/after hooks around browser actions
pub mod listener;

/// The browser command boundary
pub mod page;

/// Readiness polling
pub mod readiness;

/// Scripts evaluated in the page
pub mod scripts;

/// One browser session
pub mod session;

/// Testability settings and value coercion
pub mod settings;

/// Locators and element handles
pub mod types;

/// WebDriver-backed page
pub mod webdriver;

pub use config::TestabilityConfig;
pub use errors::{Result, TestabilityError};
pub use instrument::{AgentBundle, AgentConfig, BlacklistEntry};
pub use listener::{Action, Event, EventListener, Phase, SAFE_KEYWORDS, TestabilityListener};
pub use page::{Page, PageError};
pub use readiness::{POLL_INTERVAL, WaitOutcome};
pub use session::Session;
pub use settings::TestabilitySettings;
pub use types::{ElementHandle, Locator};
pub use webdriver::{BrowserType, WebDriverPage};
