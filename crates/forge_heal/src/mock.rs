//! Mock hotfix generator for testing.
//!
//! Lets controller tests script corrective plans without a real model
//! behind them, and inspect the requests the controller built.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{HealError, HealResult};
use crate::hotfix::{HotfixGenerator, HotfixPlan, HotfixRequest};

/// Scripted hotfix generator.
///
/// Plans are consumed in order; with no plans scripted, or with a failure
/// message set, every call errors. All requests are captured.
#[derive(Clone, Default)]
pub struct MockHotfixGenerator {
    plans: Arc<RwLock<Vec<HotfixPlan>>>,
    plan_index: Arc<AtomicUsize>,
    requests: Arc<RwLock<Vec<HotfixRequest>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MockHotfixGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a plan for the next generate call.
    pub fn add_plan(self, plan: HotfixPlan) -> Self {
        self.plans.write().push(plan);
        self
    }

    /// Make every generate call fail with this message.
    pub fn failing(self, message: impl Into<String>) -> Self {
        *self.failure.write() = Some(message.into());
        self
    }

    /// Requests the controller has made so far, in order.
    pub fn requests(&self) -> Vec<HotfixRequest> {
        self.requests.read().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }
}

#[async_trait]
impl HotfixGenerator for MockHotfixGenerator {
    async fn generate(&self, request: &HotfixRequest) -> HealResult<HotfixPlan> {
        self.requests.write().push(request.clone());

        if let Some(message) = self.failure.read().clone() {
            return Err(HealError::Generator(message));
        }

        let plans = self.plans.read();
        if plans.is_empty() {
            return Err(HealError::Generator("no scripted plan".to_string()));
        }
        let index = self.plan_index.fetch_add(1, Ordering::SeqCst);
        Ok(plans
            .get(index % plans.len())
            .cloned()
            .unwrap_or_else(|| HotfixPlan {
                diagnosis: "empty".to_string(),
                fixes: Vec::new(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HotfixRequest {
        HotfixRequest {
            error_context: "Error: boom".to_string(),
            affected_code: String::new(),
        }
    }

    fn plan(diagnosis: &str) -> HotfixPlan {
        HotfixPlan {
            diagnosis: diagnosis.to_string(),
            fixes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_plans_consumed_in_order() {
        let generator = MockHotfixGenerator::new()
            .add_plan(plan("first"))
            .add_plan(plan("second"));

        assert_eq!(generator.generate(&request()).await.unwrap().diagnosis, "first");
        assert_eq!(generator.generate(&request()).await.unwrap().diagnosis, "second");
        assert_eq!(generator.request_count(), 2);
    }

    #[tokio::test]
    async fn test_unscripted_generator_errors() {
        let generator = MockHotfixGenerator::new();
        assert!(generator.generate(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_generator_captures_requests() {
        let generator = MockHotfixGenerator::new().failing("rate limited");

        let err = generator.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
        assert_eq!(generator.requests()[0].error_context, "Error: boom");
    }
}
