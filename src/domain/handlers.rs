//! Built-in tool handlers

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::analysis_engine::{insights, AnalysisKind};
use crate::domain::{
    tools::{ToolHandler, ToolOutput},
    utils::{
        ensure_range, into_object, is_valid_email, normalize_choice, now_utc, parse_arguments,
        parse_duration_secs, MAX_CONCURRENT_USERS, MAX_GENERATED_RECORDS,
    },
    Collaborators,
};
use crate::errors::AppError;

const DATA_TYPES: [&str; 4] = ["users", "orders", "products", "mixed"];
const DATA_FORMATS: [&str; 3] = ["json", "csv", "xml"];
const REPORT_FORMATS: [&str; 3] = ["html", "json", "pdf"];
const DEFAULT_CONCURRENT_USERS: u32 = 10;
const DEFAULT_DURATION: &str = "30s";

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Deserialize)]
struct GenerateTestDataArgs {
    #[serde(rename = "type")]
    kind: String,
    count: u32,
    format: Option<String>,
}

pub struct GenerateTestData;

#[async_trait]
impl ToolHandler for GenerateTestData {
    async fn call(
        &self,
        collaborators: &Collaborators,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, AppError> {
        let args: GenerateTestDataArgs = parse_arguments(arguments)?;
        if args.kind.trim().is_empty() {
            return Err(AppError::bad_request("invalid_argument", "type is required"));
        }
        let kind = normalize_choice(Some(args.kind), &DATA_TYPES, "users", "type")?;
        let count = ensure_range(args.count, 1, MAX_GENERATED_RECORDS, "count")? as usize;
        let format = normalize_choice(args.format, &DATA_FORMATS, "json", "format")?;

        let data = match kind {
            "users" => collaborators.users(count).await?,
            "orders" => collaborators.orders(count).await?,
            "products" => collaborators.products(count).await?,
            _ => {
                let share = (count / 3).max(1);
                json!({
                    "users": collaborators.users(share).await?,
                    "orders": collaborators.orders(share).await?,
                    "products": collaborators.products(share).await?,
                })
            }
        };

        Ok(into_object(json!({
            "data": data,
            "count": count,
            "type": kind,
            "format": format,
            "generated_at": now_utc(),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeArgs {
    data: Value,
    analysis_type: String,
    ai_provider: Option<String>,
}

pub struct AnalyzeWithAi;

#[async_trait]
impl ToolHandler for AnalyzeWithAi {
    async fn call(
        &self,
        collaborators: &Collaborators,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, AppError> {
        let args: AnalyzeArgs = parse_arguments(arguments)?;
        let kind = AnalysisKind::parse(&args.analysis_type);
        let requested_provider = args
            .ai_provider
            .map(|provider| provider.trim().to_ascii_lowercase())
            .filter(|provider| !provider.is_empty())
            .unwrap_or_else(|| collaborators.analysis_engine.provider().to_string());

        let outcome = collaborators.analyze(&kind, &args.data).await;

        Ok(into_object(json!({
            "analysis_id": Uuid::new_v4().to_string(),
            "analysis_type": kind.as_str(),
            "provider": outcome.provider,
            "requested_provider": requested_provider,
            "analysis": outcome.text,
            "insights": insights(&kind, &args.data),
            "fallback_used": outcome.fallback_used,
            "analyzed_at": now_utc(),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct ValidateArgs {
    test_data: Map<String, Value>,
    #[serde(default)]
    validation_rules: Vec<String>,
    #[serde(default)]
    strict_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ValidationRule {
    Required(String),
    Email(String),
    Positive(String),
    NonEmpty(String),
    Unknown(String),
}

impl ValidationRule {
    fn parse(raw: &str) -> Self {
        let Some((kind, field)) = raw.split_once(':') else {
            return Self::Unknown(raw.to_string());
        };
        let field = field.trim().to_string();
        if field.is_empty() {
            return Self::Unknown(raw.to_string());
        }

        match kind.trim().to_ascii_lowercase().as_str() {
            "required" => Self::Required(field),
            "email" => Self::Email(field),
            "positive" => Self::Positive(field),
            "non_empty" => Self::NonEmpty(field),
            _ => Self::Unknown(raw.to_string()),
        }
    }

    /// Issue message when `data` violates the rule.
    fn check(&self, data: &Map<String, Value>, strict: bool) -> Option<(String, String)> {
        let present = |field: &str| data.get(field).filter(|value| !value.is_null());

        match self {
            Self::Required(field) => present(field)
                .is_none()
                .then(|| (field.clone(), format!("{field} is required"))),
            Self::Email(field) => match present(field) {
                Some(Value::String(text)) if is_valid_email(text) => None,
                Some(_) => Some((field.clone(), format!("{field} must be a valid email address"))),
                None => None,
            },
            Self::Positive(field) => match present(field).and_then(Value::as_f64) {
                Some(number) if number > 0.0 => None,
                Some(_) => Some((field.clone(), format!("{field} must be positive"))),
                None if present(field).is_some() => {
                    Some((field.clone(), format!("{field} must be a number")))
                }
                None => None,
            },
            Self::NonEmpty(field) => {
                let empty = match present(field) {
                    Some(Value::String(text)) => text.trim().is_empty(),
                    Some(Value::Array(items)) => items.is_empty(),
                    Some(Value::Object(map)) => map.is_empty(),
                    Some(_) => false,
                    None => true,
                };
                empty.then(|| (field.clone(), format!("{field} must not be empty")))
            }
            Self::Unknown(raw) => {
                strict.then(|| (String::new(), format!("unknown validation rule: {raw}")))
            }
        }
    }
}

pub struct ValidateTestData;

#[async_trait]
impl ToolHandler for ValidateTestData {
    async fn call(
        &self,
        _collaborators: &Collaborators,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, AppError> {
        let args: ValidateArgs = parse_arguments(arguments)?;

        let issues: Vec<Value> = args
            .validation_rules
            .iter()
            .filter_map(|raw| {
                ValidationRule::parse(raw)
                    .check(&args.test_data, args.strict_mode)
                    .map(|(field, message)| json!({ "rule": raw, "field": field, "message": message }))
            })
            .collect();

        let status = if issues.is_empty() { "passed" } else { "failed" };

        Ok(into_object(json!({
            "validation_status": status,
            "issues_found": issues.len(),
            "issues": issues,
            "rules_applied": args.validation_rules.len(),
            "strict_mode": args.strict_mode,
            "validated_at": now_utc(),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct PerformanceArgs {
    endpoint: String,
    concurrent_users: Option<u32>,
    duration: Option<String>,
}

pub struct RunPerformanceTest;

#[async_trait]
impl ToolHandler for RunPerformanceTest {
    async fn call(
        &self,
        _collaborators: &Collaborators,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, AppError> {
        let args: PerformanceArgs = parse_arguments(arguments)?;
        let endpoint = args.endpoint.trim();
        if endpoint.is_empty() {
            return Err(AppError::bad_request("invalid_argument", "endpoint is required"));
        }

        let users = ensure_range(
            args.concurrent_users.unwrap_or(DEFAULT_CONCURRENT_USERS),
            1,
            MAX_CONCURRENT_USERS,
            "concurrent_users",
        )?;
        let duration = args
            .duration
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DURATION.to_string());
        let duration_secs = parse_duration_secs(&duration)?;

        Ok(into_object(simulate_load(endpoint, users, &duration, duration_secs)))
    }
}

/// Deterministic load profile for a simulated run.
fn simulate_load(endpoint: &str, users: u32, duration: &str, duration_secs: u64) -> Value {
    let avg_ms = 120.0 + f64::from(users).sqrt() * 12.5;
    let throughput = f64::from(users) * 1_000.0 / avg_ms;
    let error_rate = match users {
        0..=100 => 0.02,
        101..=500 => 0.1,
        _ => 0.5,
    };

    json!({
        "test_status": "completed",
        "endpoint": endpoint,
        "concurrent_users": users,
        "duration": duration,
        "duration_seconds": duration_secs,
        "total_requests": (throughput * duration_secs as f64).round() as u64,
        "avg_response_time_ms": round1(avg_ms),
        "p95_response_time_ms": round1(avg_ms * 2.3),
        "throughput_rps": round1(throughput),
        "error_rate_percent": error_rate,
        "simulated": true,
        "tested_at": now_utc(),
    })
}

#[derive(Debug, Deserialize)]
struct ReportArgs {
    test_results: Map<String, Value>,
    report_format: Option<String>,
    include_metrics: Option<bool>,
}

pub struct GenerateTestReport;

#[async_trait]
impl ToolHandler for GenerateTestReport {
    async fn call(
        &self,
        _collaborators: &Collaborators,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, AppError> {
        let args: ReportArgs = parse_arguments(arguments)?;
        let format = normalize_choice(args.report_format, &REPORT_FORMATS, "html", "report_format")?;

        let count = |field: &str| args.test_results.get(field).and_then(Value::as_u64);
        let passed = count("passed").unwrap_or(0);
        let failed = count("failed").unwrap_or(0);
        let skipped = count("skipped").unwrap_or(0);
        let total = match count("total") {
            Some(total) => total,
            None => passed
                .checked_add(failed)
                .and_then(|sum| sum.checked_add(skipped))
                .ok_or_else(|| {
                    AppError::bad_request(
                        "invalid_argument",
                        "test_results counts exceed the supported range",
                    )
                })?,
        };

        let mut report = into_object(json!({
            "report_generated": true,
            "report_id": Uuid::new_v4().to_string(),
            "report_format": format,
            "report_url": format!("/reports/latest.{format}"),
            "summary": {
                "total": total,
                "passed": passed,
                "failed": failed,
                "skipped": skipped,
                "status": if failed == 0 { "passed" } else { "failed" },
            },
            "generated_at": now_utc(),
        }));

        if args.include_metrics.unwrap_or(true) {
            let rate = |part: u64| {
                if total == 0 {
                    0.0
                } else {
                    round1(part.min(total) as f64 * 100.0 / total as f64)
                }
            };
            report.insert(
                "metrics".to_string(),
                json!({
                    "success_rate_percent": rate(passed),
                    "failure_rate_percent": rate(failed),
                    "skip_rate_percent": rate(skipped),
                }),
            );
        }

        Ok(report)
    }
}
