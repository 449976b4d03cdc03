//! Interactive tools exposed via Model Context Protocol
//!
//! Each tool pairs a JSON-schema descriptor with an async handler. The set is
//! fixed at startup; lookups are exact by name.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::domain::{
    handlers::{
        AnalyzeWithAi, GenerateTestData, GenerateTestReport, RunPerformanceTest, ValidateTestData,
    },
    Catalog, Collaborators,
};
use crate::errors::{AppError, RegistryError};

pub type ToolOutput = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl Tool {
    pub fn new(name: &str, description: &str, properties: Value, required: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        collaborators: &Collaborators,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, AppError>;
}

#[derive(Clone)]
pub struct RegisteredTool {
    pub tool: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    pub fn new(tool: Tool, handler: impl ToolHandler + 'static) -> Self {
        Self {
            tool,
            handler: Arc::new(handler),
        }
    }
}

#[derive(Clone)]
pub struct ToolRegistry {
    catalog: Catalog<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<RegisteredTool>) -> Result<Self, RegistryError> {
        Ok(Self {
            catalog: Catalog::new("tool", tools, |entry| entry.tool.name.as_str())?,
        })
    }

    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(builtin_tools())
    }

    pub fn list(&self) -> Vec<Tool> {
        self.catalog.iter().map(|entry| entry.tool.clone()).collect()
    }

    pub async fn call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        collaborators: &Collaborators,
    ) -> Result<ToolOutput, AppError> {
        let entry = self
            .catalog
            .get(name)
            .ok_or_else(|| AppError::not_found("tool_not_found", format!("Unknown tool: {name}")))?;

        entry.handler.call(collaborators, arguments).await
    }
}

fn builtin_tools() -> Vec<RegisteredTool> {
    vec![
        RegisteredTool::new(
            Tool::new(
                "generate_test_data",
                "Generate realistic test data for QA testing with configurable patterns and relationships",
                json!({
                    "type": { "type": "string", "enum": ["users", "orders", "products", "mixed"] },
                    "count": { "type": "integer", "minimum": 1, "maximum": 1000 },
                    "format": { "type": "string", "enum": ["json", "csv", "xml"] }
                }),
                &["type", "count"],
            ),
            GenerateTestData,
        ),
        RegisteredTool::new(
            Tool::new(
                "analyze_with_ai",
                "Perform AI-powered analysis of test data or results",
                json!({
                    "data": { "type": "object", "description": "Test data or results to analyze" },
                    "analysis_type": {
                        "type": "string",
                        "enum": ["summary", "recommendations", "documentation", "patterns"]
                    },
                    "ai_provider": { "type": "string", "enum": ["mock", "ollama"] }
                }),
                &["data", "analysis_type"],
            ),
            AnalyzeWithAi,
        ),
        RegisteredTool::new(
            Tool::new(
                "validate_test_data",
                "Validate test data against specified rules and constraints",
                json!({
                    "test_data": { "type": "object", "description": "Test data to validate" },
                    "validation_rules": { "type": "array", "items": { "type": "string" } },
                    "strict_mode": { "type": "boolean", "default": false }
                }),
                &["test_data"],
            ),
            ValidateTestData,
        ),
        RegisteredTool::new(
            Tool::new(
                "run_performance_test",
                "Execute performance tests with configurable load patterns and metrics collection",
                json!({
                    "endpoint": { "type": "string", "description": "API endpoint to test" },
                    "concurrent_users": { "type": "integer", "minimum": 1, "maximum": 1000 },
                    "duration": { "type": "string", "description": "Test duration (e.g., '30s', '5m')" }
                }),
                &["endpoint"],
            ),
            RunPerformanceTest,
        ),
        RegisteredTool::new(
            Tool::new(
                "generate_test_report",
                "Generate comprehensive test reports with metrics and insights",
                json!({
                    "test_results": { "type": "object", "description": "Test execution results" },
                    "report_format": { "type": "string", "enum": ["html", "json", "pdf"] },
                    "include_metrics": { "type": "boolean", "default": true }
                }),
                &["test_results"],
            ),
            GenerateTestReport,
        ),
    ]
}
