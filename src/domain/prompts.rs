//! Parameterized prompt templates

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{
    utils::{now_utc, render_value},
    Catalog,
};
use crate::errors::{AppError, RegistryError};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid placeholder regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PromptArgument {
    fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    fn optional(name: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, description)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub prompt: Prompt,
    pub kind: &'static str,
    pub template: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedPrompt {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
    pub generated_at: String,
}

impl PromptTemplate {
    /// Substitutes every `{{argument}}` placeholder from `arguments`.
    pub fn render(&self, arguments: &Map<String, Value>) -> String {
        PLACEHOLDER
            .replace_all(self.template, |captures: &Captures| {
                render_value(arguments.get(&captures[1]))
            })
            .into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct PromptRegistry {
    catalog: Catalog<PromptTemplate>,
}

impl PromptRegistry {
    pub fn new(templates: Vec<PromptTemplate>) -> Result<Self, RegistryError> {
        Ok(Self {
            catalog: Catalog::new("prompt", templates, |entry| entry.prompt.name.as_str())?,
        })
    }

    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(builtin_prompts())
    }

    pub fn list(&self) -> Vec<Prompt> {
        self.catalog
            .iter()
            .map(|entry| entry.prompt.clone())
            .collect()
    }

    pub fn get(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<GeneratedPrompt, AppError> {
        let entry = self.catalog.get(name).ok_or_else(|| {
            AppError::not_found("prompt_not_found", format!("Unknown prompt: {name}"))
        })?;

        Ok(GeneratedPrompt {
            name: entry.prompt.name.clone(),
            kind: entry.kind.to_string(),
            prompt: entry.render(arguments),
            generated_at: now_utc(),
        })
    }
}

fn builtin_prompts() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate {
            prompt: Prompt {
                name: "analyze_test_results".to_string(),
                description: "Analyze test execution results and provide insights".to_string(),
                arguments: vec![
                    PromptArgument::required("test_results", "Test execution results data"),
                    PromptArgument::optional("focus_areas", "Specific areas to focus analysis on"),
                ],
            },
            kind: "test_analysis",
            template: "Analyze the following test results and provide detailed insights:

Test Results: {{test_results}}
Focus Areas: {{focus_areas}}

Please provide:
1. Overall test execution summary
2. Key findings and patterns
3. Areas of concern or improvement
4. Recommendations for next steps
5. Risk assessment

Focus on actionable insights that can help improve test quality and coverage.
",
        },
        PromptTemplate {
            prompt: Prompt {
                name: "document_test_case".to_string(),
                description: "Generate comprehensive documentation for test cases".to_string(),
                arguments: vec![
                    PromptArgument::required("test_case", "Test case details"),
                    PromptArgument::optional("style", "Documentation style preference"),
                ],
            },
            kind: "documentation",
            template: "Generate comprehensive documentation for the following test case:

Test Case: {{test_case}}
Documentation Style: {{style}}

Please include:
1. Test case description and purpose
2. Prerequisites and setup requirements
3. Step-by-step execution instructions
4. Expected results and validation criteria
5. Edge cases and error scenarios
6. Cleanup and teardown procedures

Use clear, concise language suitable for both technical and non-technical stakeholders.
",
        },
        PromptTemplate {
            prompt: Prompt {
                name: "optimize_test_suite".to_string(),
                description: "Provide recommendations for test suite optimization".to_string(),
                arguments: vec![
                    PromptArgument::required("test_suite", "Test suite information"),
                    PromptArgument::optional("constraints", "Optimization constraints"),
                ],
            },
            kind: "optimization",
            template: "Analyze the following test suite and provide optimization recommendations:

Test Suite: {{test_suite}}
Constraints: {{constraints}}

Please analyze:
1. Test execution efficiency and duration
2. Test coverage gaps and redundancies
3. Resource utilization and bottlenecks
4. Maintenance complexity and technical debt
5. Integration and dependency management

Provide specific, actionable recommendations for improvement.
",
        },
        PromptTemplate {
            prompt: Prompt {
                name: "create_bug_report".to_string(),
                description: "Generate detailed bug reports from test failures".to_string(),
                arguments: vec![
                    PromptArgument::required("failure_details", "Test failure information"),
                    PromptArgument::optional("environment", "Test environment details"),
                ],
            },
            kind: "bug_report",
            template: "Create a detailed bug report based on the following test failure:

Failure Details: {{failure_details}}
Environment: {{environment}}

Please include:
1. Bug summary and severity assessment
2. Steps to reproduce the issue
3. Expected vs. actual behavior
4. Environmental factors and configuration
5. Potential root cause analysis
6. Suggested workarounds or fixes
7. Impact assessment and priority recommendation

Format the report for development team review and tracking.
",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::utils::into_object;
    use serde_json::json;

    #[test]
    fn lists_builtin_prompts_in_order() {
        let registry = PromptRegistry::builtin().expect("unique prompts");
        let names: Vec<String> = registry.list().into_iter().map(|p| p.name).collect();

        assert_eq!(
            names,
            vec![
                "analyze_test_results",
                "document_test_case",
                "optimize_test_suite",
                "create_bug_report"
            ]
        );
        assert!(registry.list()[0].arguments[0].required);
        assert!(!registry.list()[0].arguments[1].required);
    }

    #[test]
    fn missing_arguments_render_as_not_specified() {
        let registry = PromptRegistry::builtin().expect("unique prompts");

        let generated = registry
            .get("analyze_test_results", &Map::new())
            .expect("known prompt");

        assert_eq!(generated.kind, "test_analysis");
        assert!(generated.prompt.contains("Test Results: Not specified"));
        assert!(generated.prompt.contains("Focus Areas: Not specified"));
        assert!(!generated.prompt.contains("{{"));
    }

    #[test]
    fn string_and_structured_arguments_are_substituted() {
        let registry = PromptRegistry::builtin().expect("unique prompts");
        let arguments = into_object(json!({
            "failure_details": "login times out",
            "environment": { "browser": "firefox" }
        }));

        let generated = registry
            .get("create_bug_report", &arguments)
            .expect("known prompt");

        assert!(generated.prompt.contains("Failure Details: login times out"));
        assert!(generated
            .prompt
            .contains(r#"Environment: {"browser":"firefox"}"#));
    }

    #[test]
    fn unknown_prompt_is_not_found() {
        let registry = PromptRegistry::builtin().expect("unique prompts");

        let error = registry
            .get("write_poem", &Map::new())
            .expect_err("unknown prompt");

        assert_eq!(error.code(), "prompt_not_found");
    }

    #[test]
    fn duplicate_prompt_names_are_rejected() {
        let mut templates = builtin_prompts();
        templates.push(templates[0].clone());

        let error = PromptRegistry::new(templates).expect_err("duplicate");
        assert_eq!(
            error,
            RegistryError::Duplicate {
                kind: "prompt",
                key: "analyze_test_results".to_string()
            }
        );
    }
}
