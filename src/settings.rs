//! Per-session testability settings and the coercions every setter uses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{Result, TestabilityError};

/// Default readiness timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest timeout `parse_timestr` accepts (one year)
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Settings shared by every keyword of one browser session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestabilitySettings {
    /// Wait for readiness before every tracked interaction
    pub automatic_wait: bool,
    /// Instrument every freshly loaded page
    pub automatic_injection: bool,
    /// How long a readiness wait may block
    #[serde(with = "timestr")]
    pub timeout: Duration,
    /// Fail the step when readiness times out
    pub error_on_timeout: bool,
}

impl Default for TestabilitySettings {
    fn default() -> Self {
        Self {
            automatic_wait: true,
            automatic_injection: true,
            timeout: DEFAULT_TIMEOUT,
            error_on_timeout: true,
        }
    }
}

/// Parse a duration given as plain seconds (`"1.5"`), as a timer
/// (`"00:01:30"`, `"01:30.5"`) or as a time string (`"10 seconds"`,
/// `"1 min 30 s"`, `"250ms"`).
///
/// Anything longer than [`MAX_TIMEOUT`] is rejected.
pub fn parse_timestr(input: &str) -> Result<Duration> {
    let text = input.trim();
    if text.is_empty() {
        return Err(TestabilityError::config("Timeout must not be empty"));
    }

    if let Ok(secs) = text.parse::<f64>() {
        return seconds_to_duration(secs, input);
    }
    if text.contains(':') {
        return seconds_to_duration(parse_timer(text, input)?, input);
    }

    let duration = humantime::parse_duration(&normalize_timestr(text))
        .map_err(|e| TestabilityError::config(format!("Invalid time string '{}': {}", input, e)))?;
    check_bound(duration, input)
}

fn seconds_to_duration(secs: f64, input: &str) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(TestabilityError::config(format!(
            "Timeout must be a non-negative number of seconds, got '{}'",
            input
        )));
    }
    let duration = Duration::try_from_secs_f64(secs)
        .map_err(|e| TestabilityError::config(format!("Invalid timeout '{}': {}", input, e)))?;
    check_bound(duration, input)
}

fn check_bound(duration: Duration, input: &str) -> Result<Duration> {
    if duration > MAX_TIMEOUT {
        return Err(TestabilityError::config(format!(
            "Timeout '{}' exceeds the maximum of {}",
            input,
            format_timestr(MAX_TIMEOUT)
        )));
    }
    Ok(duration)
}

// `[hh:]mm:ss[.fff]`, seconds being the only fractional field
fn parse_timer(text: &str, input: &str) -> Result<f64> {
    let invalid = || TestabilityError::config(format!("Invalid timer '{}'", input));

    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }
    let Some((seconds, units)) = parts.split_last() else {
        return Err(invalid());
    };
    let seconds: &str = seconds;

    let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !units.iter().all(|p| is_digits(*p))
        || !seconds.split_once('.').map_or(is_digits(seconds), |(whole, frac)| {
            is_digits(whole) && (frac.is_empty() || is_digits(frac))
        })
    {
        return Err(invalid());
    }

    let mut total = seconds.parse::<f64>().map_err(|_| invalid())?;
    for (unit, part) in units.iter().rev().enumerate() {
        let value = part.parse::<f64>().map_err(|_| invalid())?;
        total += value * 60f64.powi(unit as i32 + 1);
    }
    Ok(total)
}

/// Format a duration the way `parse_timestr` reads it back (`"1m 30s"`)
pub fn format_timestr(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

/// Coerce a truthy-ish string into a boolean, rejecting anything ambiguous
pub fn parse_bool(input: &str) -> Result<bool> {
    match input.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "none" | "" => Ok(false),
        _ => Err(TestabilityError::config(format!(
            "Expected a boolean value, got '{}'",
            input
        ))),
    }
}

// Lowercases and glues numbers to their units ("30 Seconds" -> "30seconds")
fn normalize_timestr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut last_digit = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space && !(last_digit && c.is_alphabetic()) {
            out.push(' ');
        }
        pending_space = false;
        last_digit = c.is_ascii_digit();
        out.push(c);
    }
    out
}

/// Serde adapter storing durations as time strings, accepting numbers too
pub(crate) mod timestr {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use serde_json::Value;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestr(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => return Err(D::Error::custom(format!("expected time string, got {}", other))),
        };
        super::parse_timestr(&text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod settings_test;
