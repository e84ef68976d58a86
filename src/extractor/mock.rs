//! # Mock Strategy Invoker for Testing
//!
//! Provides a `MockInvoker` that implements the `StrategyInvoker` trait for
//! use in tests. Outputs and errors are scripted per strategy id to simulate
//! provider behavior without remote calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::extractor::error::StrategyError;
use crate::extractor::strategy::{StrategyDescriptor, StrategyInvoker, StrategyOutput};
use crate::normalizer::NormalizedContent;

type Scripted = Result<StrategyOutput, StrategyError>;

/// A scriptable strategy-invocation capability for tests.
///
/// Unscripted strategy ids return an empty zero-confidence output.
#[derive(Clone, Default)]
pub struct MockInvoker {
    outputs: Arc<Mutex<HashMap<String, Scripted>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful output for a strategy id
    pub async fn set_output(&self, strategy_id: &str, output: StrategyOutput) {
        self.outputs
            .lock()
            .await
            .insert(strategy_id.to_string(), Ok(output));
    }

    /// Script a failure for a strategy id
    pub async fn set_error(&self, strategy_id: &str, error: StrategyError) {
        self.outputs
            .lock()
            .await
            .insert(strategy_id.to_string(), Err(error));
    }

    /// Script a provider-unavailable failure for a strategy id
    pub async fn set_provider_error(&self, strategy_id: &str, message: &str) {
        self.set_error(strategy_id, StrategyError::Provider(message.to_string()))
            .await;
    }

    /// Make a strategy id sleep before answering, for deadline tests
    pub async fn set_delay(&self, strategy_id: &str, delay: Duration) {
        self.delays
            .lock()
            .await
            .insert(strategy_id.to_string(), delay);
    }
}

#[async_trait]
impl StrategyInvoker for MockInvoker {
    async fn invoke(
        &self,
        descriptor: &StrategyDescriptor,
        _content: &NormalizedContent,
    ) -> Result<StrategyOutput, StrategyError> {
        let delay = self.delays.lock().await.get(&descriptor.id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.outputs.lock().await.get(&descriptor.id).cloned();
        match scripted {
            Some(outcome) => outcome,
            None => Ok(StrategyOutput::default()),
        }
    }
}
