use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

use crate::errors::TestabilityError;

/// W3C key under which element references travel in JSON
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Element locator, parsed from `strategy:value` text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locator {
    /// CSS selector
    Css(String),
    /// Element id attribute
    Id(String),
    /// Exact link text
    LinkText(String),
    /// XPath expression
    XPath(String),
}

impl FromStr for Locator {
    type Err = TestabilityError;

    /// Parse `id:`, `css:`, `xpath:`, `link:`, `name:`, `class:` and `tag:`
    /// prefixes; text starting with `//` is XPath, anything else is CSS.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TestabilityError::config("Locator must not be empty"));
        }
        if s.starts_with("//") || s.starts_with("(//") {
            return Ok(Locator::XPath(s.to_string()));
        }

        if let Some((strategy, value)) = s.split_once([':', '=']) {
            let value = value.trim();
            let strategy = strategy.trim().to_lowercase();
            let parsed = match strategy.as_str() {
                "id" => Some(Locator::Id(value.to_string())),
                "css" => Some(Locator::Css(value.to_string())),
                "xpath" => Some(Locator::XPath(value.to_string())),
                "link" => Some(Locator::LinkText(value.to_string())),
                "name" => Some(Locator::Css(format!("[name=\"{}\"]", value))),
                "class" => Some(Locator::Css(format!(".{}", value))),
                "tag" => Some(Locator::Css(value.to_string())),
                // Not a strategy prefix, e.g. `a:hover` or `input[type=text]`
                _ => None,
            };
            if let Some(locator) = parsed {
                if locator.value().is_empty() {
                    return Err(TestabilityError::config(format!(
                        "Locator '{}' has an empty value",
                        s
                    )));
                }
                return Ok(locator);
            }
        }

        Ok(Locator::Css(s.to_string()))
    }
}

impl Locator {
    /// The selector text without its strategy
    pub fn value(&self) -> &str {
        match self {
            Locator::Css(v) | Locator::Id(v) | Locator::LinkText(v) | Locator::XPath(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(v) => write!(f, "css:{}", v),
            Locator::Id(v) => write!(f, "id:{}", v),
            Locator::LinkText(v) => write!(f, "link:{}", v),
            Locator::XPath(v) => write!(f, "xpath:{}", v),
        }
    }
}

/// Reference to an element found in the current page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// WebDriver element id
    pub id: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Build a handle from a script result, if it is an element reference
    pub fn from_reference(value: &Value) -> Option<Self> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(ElementHandle::new)
    }

    /// JSON form accepted as a script argument
    pub fn to_json(&self) -> Value {
        json!({ ELEMENT_KEY: self.id })
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
