//! Shared argument decoding, validation and formatting helpers

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::AppError;

pub const MAX_GENERATED_RECORDS: u32 = 1_000;
pub const MAX_CONCURRENT_USERS: u32 = 1_000;
pub const NOT_SPECIFIED: &str = "Not specified";

static DURATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*(s|m|h)\s*$").expect("valid duration regex"));
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

pub fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decodes tool arguments into a typed struct.
pub fn parse_arguments<T: DeserializeOwned>(arguments: Map<String, Value>) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|err| AppError::bad_request("invalid_arguments", err.to_string()))
}

/// Lowercased, trimmed choice from `allowed`, or `default` when absent.
pub fn normalize_choice(
    value: Option<String>,
    allowed: &[&'static str],
    default: &'static str,
    field: &'static str,
) -> Result<&'static str, AppError> {
    let Some(value) = value
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
    else {
        return Ok(default);
    };

    allowed
        .iter()
        .copied()
        .find(|candidate| *candidate == value)
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_argument",
                format!("{field} must be one of: {}", allowed.join(", ")),
            )
        })
}

pub fn ensure_range(value: u32, min: u32, max: u32, field: &'static str) -> Result<u32, AppError> {
    if value < min || value > max {
        return Err(AppError::bad_request(
            "invalid_argument",
            format!("{field} must be between {min} and {max}"),
        ));
    }
    Ok(value)
}

/// Parses durations such as `30s`, `5m` or `1h` into seconds.
pub fn parse_duration_secs(value: &str) -> Result<u64, AppError> {
    let invalid = || {
        AppError::bad_request(
            "invalid_duration",
            "duration must look like 30s, 5m or 1h",
        )
    };

    let captures = DURATION_PATTERN.captures(value).ok_or_else(invalid)?;
    let amount: u64 = captures[1].parse().map_err(|_| invalid())?;
    let unit = match &captures[2] {
        "s" => 1,
        "m" => 60,
        _ => 3_600,
    };

    match amount.checked_mul(unit) {
        Some(0) | None => Err(invalid()),
        Some(seconds) => Ok(seconds),
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Text form of an argument value for template substitution.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_SPECIFIED.to_string(),
        Some(Value::String(text)) if text.trim().is_empty() => NOT_SPECIFIED.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => Map::from_iter([("value".to_string(), other)]),
    }
}
