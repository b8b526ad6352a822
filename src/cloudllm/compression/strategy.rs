//! The strategy contract and the frozen registry dispatching to it.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::conversation::Conversation;
use super::error::CompressionError;
use super::retention::RetentionPolicy;
use super::support::CancellationToken;

/// The outcome of a successful strategy execution.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub original: Conversation,
    pub compressed: Conversation,
    pub strategy: String,
    pub tokens_saved: i64,
    pub messages_removed: usize,
    pub summary: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A cheap, pure prediction of what a strategy *would* do, without running
/// it and without any external calls (§4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionEstimate {
    pub tokens_saved: i64,
    pub messages_removed: usize,
    pub messages_kept: usize,
    pub estimated_ratio: f64,
}

/// A compression algorithm transforming a conversation into a shorter one
/// while honoring the retention policy (§4.3).
///
/// `execute` is declared `async` via `async_trait`, since the summarization
/// strategy must `.await` the LLM capability. Implementations must never
/// drop system-role or pinned messages, and must emit outputs sorted by
/// timestamp.
#[async_trait]
pub trait CompressionStrategy: Send + Sync {
    /// Stable identifier used for engine registration and result labeling.
    fn id(&self) -> &str;

    async fn execute(
        &self,
        conversation: &Conversation,
        policy: &RetentionPolicy,
        cancellation: &CancellationToken,
    ) -> Result<CompressionResult, CompressionError>;

    fn estimate(&self, conversation: &Conversation, policy: &RetentionPolicy) -> CompressionEstimate;
}

/// Registry + dispatch for the three built-in strategies plus any
/// host-registered custom ones.
///
/// Built once at construction as a frozen `HashMap` rather than a runtime-
/// mutable global factory (§9's flagged anti-pattern) or table mutated
/// after construction.
pub struct StrategyEngine {
    strategies: HashMap<String, Box<dyn CompressionStrategy>>,
}

impl StrategyEngine {
    pub fn new(strategies: Vec<Box<dyn CompressionStrategy>>) -> Self {
        let strategies = strategies.into_iter().map(|s| (s.id().to_string(), s)).collect();
        Self { strategies }
    }

    pub fn register(&mut self, strategy: Box<dyn CompressionStrategy>) {
        self.strategies.insert(strategy.id().to_string(), strategy);
    }

    pub fn get(&self, strategy_id: &str) -> Result<&dyn CompressionStrategy, CompressionError> {
        self.strategies
            .get(strategy_id)
            .map(|s| s.as_ref())
            .ok_or_else(|| CompressionError::UnknownStrategy(strategy_id.to_string()))
    }

    pub async fn compress(
        &self,
        conversation: &Conversation,
        strategy_id: &str,
        policy: &RetentionPolicy,
        cancellation: &CancellationToken,
    ) -> Result<CompressionResult, CompressionError> {
        let strategy = self.get(strategy_id)?;
        strategy.execute(conversation, policy, cancellation).await
    }

    pub fn estimate(
        &self,
        conversation: &Conversation,
        strategy_id: &str,
        policy: &RetentionPolicy,
    ) -> Result<CompressionEstimate, CompressionError> {
        let strategy = self.get(strategy_id)?;
        Ok(strategy.estimate(conversation, policy))
    }
}
