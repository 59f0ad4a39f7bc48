#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use testability::batch::{first_failure, parse_batch, run_batch};
use testability::settings::{parse_bool, parse_timestr};
use testability::{
    Session, TestabilityConfig, TestabilityError, WaitOutcome, WebDriverPage, scripts,
};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_TIMEOUT: i32 = 5;
const EXIT_EVALUATION_FAILED: i32 = 6;

#[derive(Parser)]
#[command(name = "testability")]
#[command(
    about = "Wait for asynchronous page activity in WebDriver-driven UI tests",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ~/.testability/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute keywords in batch against one browser session
    Run {
        /// Commands as JSON or file path (use @ prefix for file, e.g., @steps.json)
        commands: String,

        /// Stop on first error
        #[arg(long)]
        stop_on_error: bool,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Open a URL, instrument it and report whether it becomes ready
    Check {
        /// URL to check
        url: String,

        #[command(flatten)]
        browser: BrowserArgs,
    },
}

#[derive(Args)]
struct BrowserArgs {
    /// Browser to use (firefox, chrome)
    #[arg(short, long)]
    browser: Option<String>,

    /// WebDriver URL (defaults to the browser's driver port)
    #[arg(long)]
    webdriver: Option<String>,

    /// Run browser in visible mode (disables headless)
    #[arg(long = "no-headless")]
    no_headless: bool,

    /// Readiness timeout, e.g. "10 seconds" or "1.5"
    #[arg(long)]
    timeout: Option<String>,

    /// Fail when readiness times out (true/false)
    #[arg(long)]
    error_on_timeout: Option<String>,
}

impl BrowserArgs {
    /// Command line flags win over file and environment
    fn apply(&self, config: &mut TestabilityConfig) -> testability::Result<()> {
        if let Some(browser) = &self.browser {
            config.browser = browser
                .parse()
                .map_err(|e: anyhow::Error| TestabilityError::Configuration(e.to_string()))?;
        }
        if let Some(url) = &self.webdriver {
            config.webdriver_url = Some(url.clone());
        }
        if self.no_headless {
            config.headless = false;
        }
        if let Some(timeout) = &self.timeout {
            config.timeout = parse_timestr(timeout)?;
        }
        if let Some(value) = &self.error_on_timeout {
            config.error_on_timeout = parse_bool(value)?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let result = run().await;

    // Handle exit codes based on error type
    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            // Convert to our error type to get proper exit code
            let testability_err: TestabilityError = err.into();

            // Output JSON error to stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": testability_err.to_string(),
                "exit_code": testability_err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            // Also log to stderr for human reading
            eprintln!("Error: {}", testability_err);
            std::process::exit(testability_err.exit_code());
        }
    }
}

async fn run() -> Result<i32> {
    // Initialize tracing to stderr (so JSON output to stdout remains clean)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "testability=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr) // Output logs to stderr
                .with_target(false), // Don't show target module in logs
        )
        .init();

    let cli = Cli::parse();

    let mut config = TestabilityConfig::load(cli.config.as_deref())?;
    config.apply_env()?;

    match cli.command {
        Commands::Run {
            commands,
            stop_on_error,
            browser,
        } => {
            browser.apply(&mut config)?;
            let steps = parse_batch(&commands)?;
            let mut session = open_session(&config).await?;

            let results = run_batch(&mut session, &steps, stop_on_error).await;
            println!("{}", serde_json::to_string_pretty(&results)?);

            let closed_by_batch = steps
                .iter()
                .any(|s| testability::keywords::normalize_keyword(&s.keyword) == "close_browser");
            if !closed_by_batch && let Err(e) = session.close_browser().await {
                warn!("Failed to close browser: {}", e);
            }

            Ok(first_failure(&results).unwrap_or(EXIT_SUCCESS))
        }

        Commands::Check { url, browser } => {
            browser.apply(&mut config)?;
            let mut session = open_session(&config).await?;
            let outcome = check(&mut session, &url, &config).await;
            if let Err(e) = session.close_browser().await {
                warn!("Failed to close browser: {}", e);
            }
            outcome
        }
    }
}

async fn open_session(config: &TestabilityConfig) -> testability::Result<Session> {
    let page =
        WebDriverPage::connect(config.browser, &config.webdriver_url(), config.headless).await?;
    Session::from_config(Arc::new(page), config)
}

async fn check(session: &mut Session, url: &str, config: &TestabilityConfig) -> Result<i32> {
    session.go_to(url).await?;
    session.instrument_browser().await?;
    let installed = session.is_testability_installed().await?;

    let started = Instant::now();
    let outcome = session
        .poll_script(
            "wait_for_testability_ready",
            scripts::WAIT_FOR_TESTABILITY,
            config.timeout,
        )
        .await?;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let (status, code) = match &outcome {
        WaitOutcome::Ready => ("ready", EXIT_SUCCESS),
        WaitOutcome::TimedOut => ("timed_out", EXIT_TIMEOUT),
        WaitOutcome::EvaluationFailed(_) => ("evaluation_failed", EXIT_EVALUATION_FAILED),
    };
    info!("{} is {} after {}ms", url, status, elapsed_ms);

    let report = json!({
        "url": url,
        "installed": installed,
        "status": status,
        "elapsed_ms": elapsed_ms,
        "error": match outcome {
            WaitOutcome::EvaluationFailed(e) => Some(e),
            _ => None,
        },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(code)
}
