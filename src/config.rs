//! Configuration file, environment overrides and the plugin argument form

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{Result, TestabilityError};
use crate::instrument::AgentConfig;
use crate::settings::{DEFAULT_TIMEOUT, TestabilitySettings, parse_bool, parse_timestr, timestr};
use crate::webdriver::BrowserType;

/// Prefix of the environment variables read by [`TestabilityConfig::apply_env`]
pub const ENV_PREFIX: &str = "TESTABILITY_";

/// Everything needed to start a session, as stored in `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestabilityConfig {
    pub automatic_wait: bool,
    pub automatic_injection: bool,
    #[serde(with = "timestr")]
    pub timeout: Duration,
    pub error_on_timeout: bool,
    /// Page agent script to inject instead of the embedded one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_bundle: Option<PathBuf>,
    /// Handed to the page agent on injection
    pub agent: AgentConfig,
    /// Defaults to the browser's usual driver port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webdriver_url: Option<String>,
    pub browser: BrowserType,
    pub headless: bool,
}

impl Default for TestabilityConfig {
    fn default() -> Self {
        Self {
            automatic_wait: true,
            automatic_injection: true,
            timeout: DEFAULT_TIMEOUT,
            error_on_timeout: true,
            agent_bundle: None,
            agent: AgentConfig::default(),
            webdriver_url: None,
            browser: BrowserType::Firefox,
            headless: true,
        }
    }
}

impl TestabilityConfig {
    /// `~/.testability/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".testability").join("config.json"))
    }

    /// Load from `path`, or from the default location if it exists.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No configuration file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path).map_err(|e| {
            TestabilityError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            TestabilityError::config(format!("Invalid configuration in {}: {}", path.display(), e))
        })?;
        config.agent.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `TESTABILITY_*` environment variables on top of this config
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(std::env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX)))
    }

    fn apply_vars(&mut self, vars: impl IntoIterator<Item = (String, String)>) -> Result<()> {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            debug!("Config override from {}", key);
            match name {
                "AUTOMATIC_WAIT" => self.automatic_wait = parse_bool(&value)?,
                "AUTOMATIC_INJECTION" => self.automatic_injection = parse_bool(&value)?,
                "TIMEOUT" => self.timeout = parse_timestr(&value)?,
                "ERROR_ON_TIMEOUT" => self.error_on_timeout = parse_bool(&value)?,
                "AGENT_BUNDLE" => self.agent_bundle = Some(PathBuf::from(value)),
                "WEBDRIVER_URL" => self.webdriver_url = Some(value),
                "BROWSER" => {
                    self.browser = value
                        .parse()
                        .map_err(|e: anyhow::Error| TestabilityError::config(e.to_string()))?
                }
                "HEADLESS" => self.headless = parse_bool(&value)?,
                _ => debug!("Ignoring unknown variable {}", key),
            }
        }
        Ok(())
    }

    /// Parse the `;`-separated plugin argument form:
    /// `automatic_wait;timeout;error_on_timeout;automatic_injection`.
    ///
    /// Trailing fields may be left out and keep their defaults.
    pub fn from_plugin_args(args: &str) -> Result<Self> {
        let mut config = Self::default();
        let fields: Vec<&str> = args.split(';').map(str::trim).collect();
        if fields.len() > 4 {
            return Err(TestabilityError::config(format!(
                "Expected at most 4 plugin arguments, got {}: '{}'",
                fields.len(),
                args
            )));
        }

        for (index, field) in fields.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            match index {
                0 => config.automatic_wait = parse_bool(field)?,
                1 => config.timeout = parse_timestr(field)?,
                2 => config.error_on_timeout = parse_bool(field)?,
                _ => config.automatic_injection = parse_bool(field)?,
            }
        }
        Ok(config)
    }

    /// Session settings carried by this config
    pub fn settings(&self) -> TestabilitySettings {
        TestabilitySettings {
            automatic_wait: self.automatic_wait,
            automatic_injection: self.automatic_injection,
            timeout: self.timeout,
            error_on_timeout: self.error_on_timeout,
        }
    }

    /// WebDriver endpoint, falling back to the browser's default port
    pub fn webdriver_url(&self) -> String {
        self.webdriver_url
            .clone()
            .unwrap_or_else(|| self.browser.default_webdriver_url().to_string())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
