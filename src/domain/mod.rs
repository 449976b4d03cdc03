//! Registries of tools, resources and prompts, and the collaborators they call
//!
//! Every registry is built once from static definitions and never mutated, so it
//! can be shared freely between concurrent requests.

pub mod handlers;
pub mod prompts;
pub mod resources;
pub mod tools;
pub mod utils;

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use serde_json::Value;
use tracing::warn;

use crate::{
    analysis_engine::{fallback_analysis, AnalysisEngine, AnalysisKind, LocalAnalysisEngine},
    data_generator::{DataGenerator, FakeDataGenerator},
    errors::{AppError, RegistryError},
};

pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(30);
const CANNED_RECORD_SEED: u64 = 0x5eed;

/// Ordered entries with a unique-key index.
#[derive(Debug, Clone)]
pub struct Catalog<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Catalog<T> {
    pub fn new(
        kind: &'static str,
        entries: Vec<T>,
        key: impl Fn(&T) -> &str,
    ) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            let entry_key = key(entry).to_string();
            if index.insert(entry_key.clone(), position).is_some() {
                return Err(RegistryError::Duplicate {
                    kind,
                    key: entry_key,
                });
            }
        }

        Ok(Self { entries, index })
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&position| &self.entries[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub text: String,
    pub provider: String,
    pub fallback_used: bool,
}

/// External collaborators handed to tool handlers and resource readers.
#[derive(Clone)]
pub struct Collaborators {
    pub data_generator: Arc<dyn DataGenerator>,
    pub analysis_engine: Arc<dyn AnalysisEngine>,
    pub call_timeout: Duration,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            data_generator: Arc::new(FakeDataGenerator::new()),
            analysis_engine: Arc::new(LocalAnalysisEngine),
            call_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }
}

impl Collaborators {
    async fn bounded<T, F>(&self, label: &'static str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::internal(format!(
                "{label} timed out after {}ms",
                self.call_timeout.as_millis()
            ))),
        }
    }

    pub async fn analyze(&self, kind: &AnalysisKind, data: &Value) -> AnalysisOutcome {
        let provider = self.analysis_engine.provider().to_string();
        match self
            .bounded("analysis engine", self.analysis_engine.analyze(kind, data))
            .await
        {
            Ok(text) => AnalysisOutcome {
                text,
                provider,
                fallback_used: false,
            },
            Err(err) => {
                warn!(provider = %provider, error = %err.detail(), "analysis engine failed, using fallback");
                AnalysisOutcome {
                    text: fallback_analysis(kind, data),
                    provider: "fallback".to_string(),
                    fallback_used: true,
                }
            }
        }
    }

    pub async fn users(&self, count: usize) -> Result<Value, AppError> {
        let users = match self
            .bounded("data generator", self.data_generator.generate_users(count))
            .await
        {
            Ok(users) => users,
            Err(err) => {
                warn!(error = %err.detail(), "user generation failed, using canned records");
                FakeDataGenerator::seeded(CANNED_RECORD_SEED).users(count)
            }
        };
        to_json(&users)
    }

    pub async fn orders(&self, count: usize) -> Result<Value, AppError> {
        let orders = match self
            .bounded("data generator", self.data_generator.generate_orders(count))
            .await
        {
            Ok(orders) => orders,
            Err(err) => {
                warn!(error = %err.detail(), "order generation failed, using canned records");
                FakeDataGenerator::seeded(CANNED_RECORD_SEED).orders(count)
            }
        };
        to_json(&orders)
    }

    pub async fn products(&self, count: usize) -> Result<Value, AppError> {
        let products = match self
            .bounded("data generator", self.data_generator.generate_products(count))
            .await
        {
            Ok(products) => products,
            Err(err) => {
                warn!(error = %err.detail(), "product generation failed, using canned records");
                FakeDataGenerator::seeded(CANNED_RECORD_SEED).products(count)
            }
        };
        to_json(&products)
    }
}

fn to_json<T: serde::Serialize>(records: &T) -> Result<Value, AppError> {
    serde_json::to_value(records)
        .map_err(|err| AppError::internal(format!("record serialization failed: {err}")))
}
