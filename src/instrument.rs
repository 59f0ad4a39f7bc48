//! Page agent injection.
//!
//! Instrumentation lives in the page's JavaScript realm, so it is probed on
//! every call and never remembered host-side: a navigation throws it away.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::errors::{Result, TestabilityError};
use crate::scripts;
use crate::session::Session;

const EMBEDDED_AGENT: &str = include_str!("../assets/testability.js");

/// Script text of the page agent
#[derive(Debug, Clone)]
pub struct AgentBundle {
    source: Cow<'static, str>,
}

impl AgentBundle {
    /// The agent shipped with this crate
    pub fn embedded() -> Self {
        Self {
            source: Cow::Borrowed(EMBEDDED_AGENT),
        }
    }

    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            source: Cow::Owned(source.into()),
        }
    }

    /// Read the agent from `path`, or fall back to the embedded one
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|e| {
                    TestabilityError::config(format!(
                        "Failed to read page agent bundle {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                if source.trim().is_empty() {
                    return Err(TestabilityError::config(format!(
                        "Page agent bundle {} is empty",
                        path.display()
                    )));
                }
                debug!("Loaded page agent bundle from {}", path.display());
                Ok(Self::inline(source))
            }
            None => Ok(Self::embedded()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Network calls matching `url` (a JavaScript regular expression) and,
/// if given, `method` are not tracked by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Settings handed to the agent as `window.testabilityConfig`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Timers scheduled this many milliseconds out or more are not tracked
    #[serde(
        rename = "maxTimeout",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blacklist: Vec<BlacklistEntry>,
    /// Keys passed through to the agent untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_timeout == Some(0) {
            return Err(TestabilityError::config("maxTimeout must be positive"));
        }
        if let Some(entry) = self.blacklist.iter().find(|e| e.url.trim().is_empty()) {
            return Err(TestabilityError::config(format!(
                "Blacklist entry has an empty url pattern: {:?}",
                entry
            )));
        }
        Ok(())
    }
}

impl Session {
    /// Whether the agent is loaded in the current window.
    ///
    /// A failing probe reads as `false`.
    pub async fn is_testability_installed(&mut self) -> Result<bool> {
        debug!("Session: is_testability_installed()");
        match self
            .run_script("is_testability_installed", scripts::IS_INSTALLED, vec![])
            .await
        {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            Err(TestabilityError::Evaluation(e)) => {
                warn!("Testability probe failed, assuming not installed: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Inject and instrument the agent unless the page already has it
    pub async fn instrument_browser(&mut self) -> Result<()> {
        debug!("Session: instrument_browser()");
        if self.is_testability_installed().await? {
            return Ok(());
        }
        self.inject_testability().await
    }

    async fn inject_testability(&mut self) -> Result<()> {
        info!("Injecting testability page agent");
        let config = serde_json::to_value(&self.agent_config)
            .map_err(|e| TestabilityError::config(format!("Unserializable agent config: {}", e)))?;
        let bundle = self.agent_bundle.source().to_string();

        self.run_script("instrument_browser", scripts::SET_AGENT_CONFIG, vec![config])
            .await?;
        self.run_script("instrument_browser", &bundle, vec![]).await?;
        self.run_script("instrument_browser", scripts::INSTRUMENT_BROWSER, vec![])
            .await?;
        Ok(())
    }

    /// Configuration for the next injection. Pages that already carry the
    /// agent keep the configuration they were instrumented with.
    pub fn set_testability_config(&mut self, config: AgentConfig) -> Result<()> {
        config.validate()?;
        debug!("Session: set_testability_config({:?})", config);
        self.agent_config = config;
        Ok(())
    }

    pub fn testability_config(&self) -> &AgentConfig {
        &self.agent_config
    }
}

#[cfg(test)]
#[path = "instrument_test.rs"]
mod instrument_test;
