//! Settings keywords and name-based keyword dispatch.

use serde_json::{Value, json};
use tracing::debug;

use crate::errors::{Result, TestabilityError};
use crate::instrument::AgentConfig;
use crate::session::Session;
use crate::settings::{format_timestr, parse_bool, parse_timestr};

impl Session {
    pub fn set_testability_automatic_wait(&mut self, enabled: &str) -> Result<()> {
        debug!("Session: set_testability_automatic_wait({})", enabled);
        self.settings_mut().automatic_wait = parse_bool(enabled)?;
        Ok(())
    }

    pub fn enable_testability_automatic_wait(&mut self) {
        debug!("Session: enable_testability_automatic_wait()");
        self.settings_mut().automatic_wait = true;
    }

    pub fn disable_testability_automatic_wait(&mut self) {
        debug!("Session: disable_testability_automatic_wait()");
        self.settings_mut().automatic_wait = false;
    }

    pub fn set_testability_automatic_injection(&mut self, enabled: &str) -> Result<()> {
        debug!("Session: set_testability_automatic_injection({})", enabled);
        self.settings_mut().automatic_injection = parse_bool(enabled)?;
        Ok(())
    }

    pub fn enable_testability_automatic_injection(&mut self) {
        debug!("Session: enable_testability_automatic_injection()");
        self.settings_mut().automatic_injection = true;
    }

    pub fn disable_testability_automatic_injection(&mut self) {
        debug!("Session: disable_testability_automatic_injection()");
        self.settings_mut().automatic_injection = false;
    }

    /// Set the global readiness timeout, returning the previous one
    pub fn set_testability_timeout(&mut self, timeout: &str) -> Result<String> {
        debug!("Session: set_testability_timeout({})", timeout);
        let timeout = parse_timestr(timeout)?;
        let previous = std::mem::replace(&mut self.settings_mut().timeout, timeout);
        Ok(format_timestr(previous))
    }

    pub fn get_testability_timeout(&self) -> String {
        format_timestr(self.settings().timeout)
    }

    pub fn set_testability_error_on_timeout(&mut self, value: &str) -> Result<()> {
        debug!("Session: set_testability_error_on_timeout({})", value);
        self.settings_mut().error_on_timeout = parse_bool(value)?;
        Ok(())
    }

    pub fn get_testability_error_on_timeout(&self) -> bool {
        self.settings().error_on_timeout
    }

    /// Run a keyword by name with JSON arguments.
    ///
    /// Names are matched the way test authors write them, so
    /// `"Wait For Testability Ready"` and `"wait_for_testability_ready"`
    /// are the same keyword.
    pub async fn run_keyword(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let keyword = normalize_keyword(name);
        debug!("Session: run_keyword({}, {:?})", keyword, args);
        let args = Args { keyword: &keyword, values: args };

        let result = match keyword.as_str() {
            "go_to" => self.go_to(&args.string(0)?).await.map(|_| Value::Null)?,
            "go_back" => self.go_back().await.map(|_| Value::Null)?,
            "go_forward" => self.go_forward().await.map(|_| Value::Null)?,
            "get_location" => json!(self.get_location().await?),
            "click_element" => {
                self.click_element(&args.string(0)?).await?;
                Value::Null
            }
            "input_text" => {
                self.input_text(&args.string(0)?, &args.string(1)?).await?;
                Value::Null
            }
            "clear_element_text" => {
                self.clear_element_text(&args.string(0)?).await?;
                Value::Null
            }
            "execute_javascript" => {
                let script = args.string(0)?;
                self.execute_javascript(&script, args.rest(1)).await?
            }
            "execute_async_javascript" => {
                let script = args.string(0)?;
                self.execute_async_javascript(&script, args.rest(1)).await?
            }
            "close_window" => {
                self.close_window().await?;
                Value::Null
            }
            "close_browser" => {
                self.close_browser().await?;
                Value::Null
            }

            "wait_for_testability_ready" => {
                let timeout = args.optional(0)?;
                let error_on_timeout = args.optional(1)?;
                self.wait_for_testability_ready(timeout.as_deref(), error_on_timeout.as_deref())
                    .await?;
                Value::Null
            }
            "wait_for_document_ready" => {
                self.wait_for_document_ready().await?;
                Value::Null
            }
            "is_testability_installed" => json!(self.is_testability_installed().await?),
            "instrument_browser" => {
                self.instrument_browser().await?;
                Value::Null
            }
            "set_testability_config" => {
                let config: AgentConfig = serde_json::from_value(args.value(0)?.clone())
                    .map_err(|e| TestabilityError::config(format!("Invalid agent config: {}", e)))?;
                self.set_testability_config(config)?;
                Value::Null
            }

            "set_testability_automatic_wait" => {
                self.set_testability_automatic_wait(&args.string(0)?)?;
                Value::Null
            }
            "enable_testability_automatic_wait" => {
                self.enable_testability_automatic_wait();
                Value::Null
            }
            "disable_testability_automatic_wait" => {
                self.disable_testability_automatic_wait();
                Value::Null
            }
            "set_testability_automatic_injection" => {
                self.set_testability_automatic_injection(&args.string(0)?)?;
                Value::Null
            }
            "enable_testability_automatic_injection" => {
                self.enable_testability_automatic_injection();
                Value::Null
            }
            "disable_testability_automatic_injection" => {
                self.disable_testability_automatic_injection();
                Value::Null
            }
            "set_testability_timeout" => json!(self.set_testability_timeout(&args.string(0)?)?),
            "get_testability_timeout" => json!(self.get_testability_timeout()),
            "set_testability_error_on_timeout" => {
                self.set_testability_error_on_timeout(&args.string(0)?)?;
                Value::Null
            }
            "get_testability_error_on_timeout" => json!(self.get_testability_error_on_timeout()),

            "hide_element" => {
                self.hide_element(&args.string(0)?).await?;
                Value::Null
            }
            "show_element" => {
                self.show_element(&args.string(0)?).await?;
                Value::Null
            }
            "toggle_element_visibility" => {
                self.toggle_element_visibility(&args.string(0)?).await?;
                Value::Null
            }
            "is_element_blocked" => json!(self.is_element_blocked(&args.string(0)?).await?),
            "element_should_be_blocked" => {
                self.element_should_be_blocked(&args.string(0)?).await?;
                Value::Null
            }
            "element_should_not_be_blocked" => {
                self.element_should_not_be_blocked(&args.string(0)?).await?;
                Value::Null
            }
            "set_element_attribute" => {
                self.set_element_attribute(&args.string(0)?, &args.string(1)?, &args.string(2)?)
                    .await?;
                Value::Null
            }
            "drag_and_drop" => {
                let html5 = match args.optional(2)? {
                    Some(flag) => parse_bool(&flag)?,
                    None => false,
                };
                self.drag_and_drop(&args.string(0)?, &args.string(1)?, html5)
                    .await?;
                Value::Null
            }
            "get_webelement_at" => {
                let element = self.get_webelement_at(args.number(0)?, args.number(1)?).await?;
                element.map(|e| e.to_json()).unwrap_or(Value::Null)
            }
            "scroll_to_bottom" => {
                self.scroll_to_bottom().await?;
                Value::Null
            }
            "scroll_to_top" => {
                self.scroll_to_top().await?;
                Value::Null
            }

            _ => return Err(TestabilityError::UnknownKeyword(name.to_string())),
        };
        Ok(result)
    }
}

/// `"Wait For Testability Ready"` -> `"wait_for_testability_ready"`
pub fn normalize_keyword(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

struct Args<'a> {
    keyword: &'a str,
    values: &'a [Value],
}

impl Args<'_> {
    fn value(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or_else(|| {
            TestabilityError::config(format!(
                "Keyword '{}' expects an argument at position {}",
                self.keyword,
                index + 1
            ))
        })
    }

    fn string(&self, index: usize) -> Result<String> {
        match self.optional(index)? {
            Some(s) => Ok(s),
            None => Err(TestabilityError::config(format!(
                "Keyword '{}' expects an argument at position {}",
                self.keyword,
                index + 1
            ))),
        }
    }

    /// Scalars as text, `null` or a missing argument as `None`
    fn optional(&self, index: usize) -> Result<Option<String>> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(TestabilityError::config(format!(
                "Keyword '{}' expects a scalar at position {}, got {}",
                self.keyword,
                index + 1,
                other
            ))),
        }
    }

    fn number(&self, index: usize) -> Result<f64> {
        let value = self.value(index)?;
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| {
                TestabilityError::config(format!(
                    "Keyword '{}' expects a number at position {}, got {}",
                    self.keyword,
                    index + 1,
                    value
                ))
            })
    }

    fn rest(&self, from: usize) -> Vec<Value> {
        self.values.iter().skip(from).cloned().collect()
    }
}

#[cfg(test)]
#[path = "keywords_test.rs"]
mod keywords_test;
