use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisKind {
    Summary,
    Recommendations,
    Documentation,
    Patterns,
    General(String),
}

impl AnalysisKind {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "summary" => Self::Summary,
            "recommendations" => Self::Recommendations,
            "documentation" => Self::Documentation,
            "patterns" => Self::Patterns,
            other => Self::General(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Summary => "summary",
            Self::Recommendations => "recommendations",
            Self::Documentation => "documentation",
            Self::Patterns => "patterns",
            Self::General(other) => other,
        }
    }
}

/// Free-text analysis backend. Implementations may fail or hang; callers bound
/// them with a timeout and fall back to [`fallback_analysis`].
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    fn provider(&self) -> &str;
    async fn analyze(&self, kind: &AnalysisKind, data: &Value) -> Result<String, AppError>;
}

/// Deterministic in-process analyzer.
#[derive(Debug, Default)]
pub struct LocalAnalysisEngine;

#[async_trait]
impl AnalysisEngine for LocalAnalysisEngine {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, kind: &AnalysisKind, data: &Value) -> Result<String, AppError> {
        Ok(fallback_analysis(kind, data))
    }
}

pub struct OllamaAnalysisEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaAnalysisEngine {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl AnalysisEngine for OllamaAnalysisEngine {
    fn provider(&self) -> &str {
        "ollama"
    }

    async fn analyze(&self, kind: &AnalysisKind, data: &Value) -> Result<String, AppError> {
        let body = json!({
            "model": self.model,
            "prompt": build_prompt(kind, data),
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::internal(format!("ollama request failed: {err}")))?
            .error_for_status()
            .map_err(|err| AppError::internal(format!("ollama returned an error: {err}")))?;

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|err| AppError::internal(format!("ollama response was malformed: {err}")))?;

        let text = parsed.response.trim();
        if text.is_empty() {
            return Err(AppError::internal("ollama returned an empty analysis"));
        }

        Ok(text.to_string())
    }
}

pub fn build_prompt(kind: &AnalysisKind, data: &Value) -> String {
    let focus = match kind {
        AnalysisKind::Summary => "an executive summary with key findings",
        AnalysisKind::Recommendations => "prioritized recommendations for test improvement",
        AnalysisKind::Documentation => "structured documentation of the data model",
        AnalysisKind::Patterns => "detected patterns, anomalies and trends",
        AnalysisKind::General(_) => "a general quality assessment",
    };

    format!(
        "You are a QA automation assistant. Analyze the following test data and provide {focus}.\n\nTest data ({}):\n{data}",
        describe_structure(data)
    )
}

/// Short description of a JSON document's shape, e.g. "3 records with 9 fields each".
pub fn describe_structure(data: &Value) -> String {
    match data {
        Value::Array(items) => match items.first() {
            Some(Value::Object(first)) => {
                format!("{} records with {} fields each", items.len(), first.len())
            }
            _ => format!("an array of {} elements", items.len()),
        },
        Value::Object(map) => format!("a single object with {} fields", map.len()),
        Value::Null => "no data".to_string(),
        _ => "simple data structure".to_string(),
    }
}

fn field_description(field: &str) -> String {
    match field.to_ascii_lowercase().as_str() {
        "users" => "User account information with profiles and preferences".to_string(),
        "orders" => "Transaction records with items and payment details".to_string(),
        "products" => "Product catalog with specifications and pricing".to_string(),
        "test_results" => "Automated test execution results and metrics".to_string(),
        "data" => "Primary dataset containing structured information".to_string(),
        other => format!("Data field containing {other} information"),
    }
}

/// Deterministic analysis text for `kind`, used when no engine answer is available.
pub fn fallback_analysis(kind: &AnalysisKind, data: &Value) -> String {
    let mut lines: Vec<String> = Vec::new();

    match kind {
        AnalysisKind::Summary => {
            lines.push("DATA SUMMARY ANALYSIS".to_string());
            lines.push(String::new());
            lines.push(format!("- Dataset contains {}", describe_structure(data)));
            if let Value::Object(map) = data {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                lines.push(format!("- Key fields identified: {}", keys.join(", ")));
                let focus = if map.contains_key("users") {
                    "user-focused"
                } else {
                    "general"
                };
                lines.push(format!("- Data structure appears to be {focus}"));
            }
            lines.push(String::new());
            lines.push("RECOMMENDATIONS:".to_string());
            lines.push("- Data structure is well-organized".to_string());
            lines.push("- Consider adding validation rules for critical fields".to_string());
            lines.push("- Monitor data quality metrics regularly".to_string());
        }
        AnalysisKind::Recommendations => {
            lines.push("INTELLIGENT RECOMMENDATIONS".to_string());
            lines.push(String::new());
            lines.push("QUALITY IMPROVEMENTS:".to_string());
            lines.push("1. Data Validation: Implement comprehensive validation rules".to_string());
            lines.push("2. Error Handling: Add robust error detection mechanisms".to_string());
            lines.push("3. Performance: Consider data indexing for faster queries".to_string());
            lines.push(String::new());
            lines.push("TESTING STRATEGY:".to_string());
            lines.push("- Increase test coverage for edge cases".to_string());
            lines.push("- Implement automated regression testing".to_string());
            lines.push("- Add performance benchmarking".to_string());
        }
        AnalysisKind::Documentation => {
            lines.push("AUTOMATED DOCUMENTATION".to_string());
            lines.push(String::new());
            lines.push("DATA MODEL OVERVIEW:".to_string());
            lines.push(format!(
                "This dataset contains {} and is designed for QA automation scenarios.",
                describe_structure(data)
            ));
            if let Value::Object(map) = data {
                lines.push(String::new());
                lines.push("STRUCTURE ANALYSIS:".to_string());
                for key in map.keys() {
                    lines.push(format!("- {key}: {}", field_description(key)));
                }
            }
            lines.push(String::new());
            lines.push("USAGE PATTERNS:".to_string());
            lines.push("- Primary use case: Test environment population".to_string());
            lines.push("- Secondary use case: Performance testing scenarios".to_string());
        }
        AnalysisKind::Patterns => {
            lines.push("PATTERN ANALYSIS".to_string());
            lines.push(String::new());
            lines.push("DETECTED PATTERNS:".to_string());
            lines.push("- Consistent data structure across records".to_string());
            lines.push("- Realistic relationship modeling".to_string());
            lines.push("- Appropriate data type usage".to_string());
            lines.push(String::new());
            lines.push("ANOMALY DETECTION:".to_string());
            lines.push("- No significant anomalies detected".to_string());
            lines.push("- Data follows expected patterns".to_string());
        }
        AnalysisKind::General(_) => {
            lines.push("GENERAL ANALYSIS".to_string());
            lines.push(String::new());
            lines.push(format!(
                "Analysis completed for {}.",
                describe_structure(data)
            ));
            lines.push(
                "For more specific analysis, use analysis type: summary, recommendations, documentation, or patterns."
                    .to_string(),
            );
        }
    }

    lines.join("\n")
}

/// Structured metrics reported next to the free-text analysis.
pub fn insights(kind: &AnalysisKind, data: &Value) -> Map<String, Value> {
    let mut insights = Map::new();
    insights.insert("data_quality_score".to_string(), json!(95));
    insights.insert("completeness_percentage".to_string(), json!(98));
    insights.insert("consistency_rating".to_string(), json!("HIGH"));

    match kind {
        AnalysisKind::Summary => {
            let record_count = match data {
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                _ => 1,
            };
            insights.insert("record_count".to_string(), json!(record_count));
            insights.insert(
                "key_findings".to_string(),
                json!([
                    "Data structure is well-organized",
                    "High data quality detected",
                    "Suitable for automated testing"
                ]),
            );
        }
        AnalysisKind::Recommendations => {
            insights.insert(
                "priority_actions".to_string(),
                json!([
                    "Implement data validation",
                    "Add performance monitoring",
                    "Schedule regular maintenance"
                ]),
            );
            insights.insert("impact_level".to_string(), json!("MEDIUM"));
        }
        AnalysisKind::Documentation => {
            insights.insert("documentation_completeness".to_string(), json!(85));
            insights.insert(
                "missing_elements".to_string(),
                json!(["API examples", "Error codes"]),
            );
        }
        AnalysisKind::Patterns => {
            insights.insert("pattern_strength".to_string(), json!("STRONG"));
            insights.insert("anomalies_detected".to_string(), json!(0));
            insights.insert("trend_direction".to_string(), json!("STABLE"));
        }
        AnalysisKind::General(_) => {}
    }

    insights.insert("confidence_level".to_string(), json!("HIGH"));
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn parses_kinds_case_insensitively() {
        assert_eq!(AnalysisKind::parse("Summary"), AnalysisKind::Summary);
        assert_eq!(AnalysisKind::parse(" patterns "), AnalysisKind::Patterns);
        assert_eq!(
            AnalysisKind::parse("sentiment"),
            AnalysisKind::General("sentiment".to_string())
        );
    }

    #[test]
    fn fallback_is_deterministic_per_kind() {
        let data = json!({ "users": [{ "id": 1 }], "orders": [] });

        for kind in [
            AnalysisKind::Summary,
            AnalysisKind::Recommendations,
            AnalysisKind::Documentation,
            AnalysisKind::Patterns,
            AnalysisKind::General("other".to_string()),
        ] {
            let first = fallback_analysis(&kind, &data);
            assert_eq!(first, fallback_analysis(&kind, &data));
            assert!(!first.is_empty());
        }

        let summary = fallback_analysis(&AnalysisKind::Summary, &data);
        assert!(summary.contains("user-focused"));
    }

    #[test]
    fn describes_array_structure() {
        let data = json!([{ "a": 1, "b": 2 }, { "a": 3, "b": 4 }]);
        assert_eq!(describe_structure(&data), "2 records with 2 fields each");
    }

    #[test]
    fn insights_depend_on_kind() {
        let patterns = insights(&AnalysisKind::Patterns, &Value::Null);
        assert_eq!(patterns["pattern_strength"], "STRONG");
        assert!(patterns.get("record_count").is_none());

        let summary = insights(&AnalysisKind::Summary, &json!([1, 2, 3]));
        assert_eq!(summary["record_count"], 3);
    }

    #[tokio::test]
    async fn ollama_engine_returns_generated_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "response": " Looks healthy. " })),
            )
            .mount(&server)
            .await;

        let engine = OllamaAnalysisEngine::new(server.uri(), "llama2", Duration::from_secs(5))
            .expect("client builds");
        let text = engine
            .analyze(&AnalysisKind::Summary, &json!({ "users": [] }))
            .await
            .expect("analysis succeeds");

        assert_eq!(text, "Looks healthy.");
        assert_eq!(engine.provider(), "ollama");
    }

    #[tokio::test]
    async fn ollama_engine_surfaces_http_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let engine = OllamaAnalysisEngine::new(server.uri(), "llama2", Duration::from_secs(5))
            .expect("client builds");
        let error = engine
            .analyze(&AnalysisKind::Patterns, &Value::Null)
            .await
            .expect_err("server error must fail");

        assert_eq!(error.code(), "internal_error");
    }
}
