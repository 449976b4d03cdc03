//! Model Context Protocol resource providers
//!
//! Exposes QA fixtures, reports and metrics as JSON documents under `qa-hub://`
//! URIs. Lookup is exact string equality.

use rust_mcp_sdk::schema::Resource;
use serde_json::{json, Value};

use crate::domain::{utils::now_utc, Catalog, Collaborators};
use crate::errors::{AppError, RegistryError};

pub const TEST_CASES_URI: &str = "qa-hub://test-cases/all";
pub const USERS_URI: &str = "qa-hub://test-data/users";
pub const ORDERS_URI: &str = "qa-hub://test-data/orders";
pub const LATEST_REPORT_URI: &str = "qa-hub://reports/latest";
pub const PERFORMANCE_METRICS_URI: &str = "qa-hub://metrics/performance";

const SAMPLE_RECORDS: usize = 5;
const JSON_MIME: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceSource {
    TestCases,
    Users,
    Orders,
    LatestReport,
    PerformanceMetrics,
}

#[derive(Debug, Clone)]
pub struct RegisteredResource {
    pub resource: Resource,
    pub source: ResourceSource,
}

impl RegisteredResource {
    pub fn new(uri: &str, name: &str, description: &str, source: ResourceSource) -> Self {
        Self {
            resource: Resource {
                annotations: None,
                description: Some(description.to_string()),
                icons: vec![],
                meta: None,
                mime_type: Some(JSON_MIME.to_string()),
                name: name.to_string(),
                size: None,
                title: None,
                uri: uri.to_string(),
            },
            source,
        }
    }

    pub fn mime_type(&self) -> &str {
        self.resource.mime_type.as_deref().unwrap_or(JSON_MIME)
    }
}

#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    catalog: Catalog<RegisteredResource>,
}

impl ResourceRegistry {
    pub fn new(resources: Vec<RegisteredResource>) -> Result<Self, RegistryError> {
        Ok(Self {
            catalog: Catalog::new("resource", resources, |entry| entry.resource.uri.as_str())?,
        })
    }

    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(vec![
            RegisteredResource::new(
                TEST_CASES_URI,
                "All Test Cases",
                "Complete collection of test cases",
                ResourceSource::TestCases,
            ),
            RegisteredResource::new(
                USERS_URI,
                "User Test Data",
                "Generated user test data",
                ResourceSource::Users,
            ),
            RegisteredResource::new(
                ORDERS_URI,
                "Order Test Data",
                "Generated order test data",
                ResourceSource::Orders,
            ),
            RegisteredResource::new(
                LATEST_REPORT_URI,
                "Latest Test Report",
                "Most recent test execution report",
                ResourceSource::LatestReport,
            ),
            RegisteredResource::new(
                PERFORMANCE_METRICS_URI,
                "Performance Metrics",
                "Performance testing metrics",
                ResourceSource::PerformanceMetrics,
            ),
        ])
    }

    pub fn list(&self) -> Vec<Resource> {
        self.catalog
            .iter()
            .map(|entry| entry.resource.clone())
            .collect()
    }

    pub fn lookup(&self, uri: &str) -> Result<&RegisteredResource, AppError> {
        self.catalog.get(uri).ok_or_else(|| {
            AppError::not_found("resource_not_found", format!("Resource not found: {uri}"))
        })
    }

    pub async fn read(&self, uri: &str, collaborators: &Collaborators) -> Result<Value, AppError> {
        match self.lookup(uri)?.source {
            ResourceSource::TestCases => Ok(test_case_catalog()),
            ResourceSource::Users => collaborators.users(SAMPLE_RECORDS).await,
            ResourceSource::Orders => collaborators.orders(SAMPLE_RECORDS).await,
            ResourceSource::LatestReport => Ok(latest_report()),
            ResourceSource::PerformanceMetrics => Ok(performance_metrics()),
        }
    }
}

fn test_case_catalog() -> Value {
    json!({
        "suite": "qa-automation-hub",
        "total": 5,
        "test_cases": [
            {
                "id": "TC-001",
                "title": "User registration with valid data",
                "area": "users",
                "priority": "high",
                "type": "functional",
                "steps": ["Open registration form", "Submit generated user", "Verify confirmation email"],
                "expected": "Account is created and confirmation is sent"
            },
            {
                "id": "TC-002",
                "title": "Login rejects invalid password",
                "area": "auth",
                "priority": "high",
                "type": "negative",
                "steps": ["Open login form", "Submit wrong password"],
                "expected": "Error message shown, no session created"
            },
            {
                "id": "TC-003",
                "title": "Checkout computes order totals",
                "area": "orders",
                "priority": "medium",
                "type": "functional",
                "steps": ["Add generated items to cart", "Proceed to checkout"],
                "expected": "Total equals sum of item totals"
            },
            {
                "id": "TC-004",
                "title": "Product search returns in-stock items",
                "area": "products",
                "priority": "low",
                "type": "functional",
                "steps": ["Search by category", "Filter in-stock"],
                "expected": "Only in-stock products are listed"
            },
            {
                "id": "TC-005",
                "title": "Order API sustains 50 concurrent users",
                "area": "orders",
                "priority": "medium",
                "type": "performance",
                "steps": ["Run load profile for 5m at 50 users"],
                "expected": "p95 under 600ms and error rate below 0.1%"
            }
        ]
    })
}

fn latest_report() -> Value {
    json!({
        "total_tests": 125,
        "passed": 118,
        "failed": 5,
        "skipped": 2,
        "success_rate": "94.4%",
        "execution_time": "2m 34s",
        "generated_at": now_utc(),
    })
}

fn performance_metrics() -> Value {
    json!({
        "avg_response_time": "245ms",
        "p95_response_time": "580ms",
        "throughput": "850 req/sec",
        "error_rate": "0.02%",
        "concurrent_users": 50,
        "measured_at": now_utc(),
    })
}
