//! Conversation compression core: keeps a growing chat history bounded in
//! token count while preserving semantic fidelity.
//!
//! Three tightly coupled concerns, leaves-first:
//!
//! ```text
//! Tokenizer + TokenCounter        — approximate & memoize token counts
//!   └─ RetentionPolicy            — priority-ordered "retain this message?" rules
//!        └─ CompressionStrategy   — sliding_window | semantic_summarization | hybrid
//!             └─ StrategyEngine  — registry + dispatch
//!                  └─ Coordinator — thresholds, stats, mutual exclusion
//! ```
//!
//! The core never mutates a caller's [`Conversation`]: every compression
//! produces a new `Conversation` value derived from the original. See the
//! invariants documented on each type for the contract strategies must
//! uphold (no dropped `system` or `pinned` messages, timestamp-sorted
//! output, unique message ids).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cloudllm::compression::*;
//!
//! # async fn run() {
//! let counter: Arc<dyn TokenCounting> = Arc::new(TokenCounter::default());
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let ids: Arc<dyn IdGenerator> = Arc::new(UuidGenerator);
//! let summarizer: Arc<dyn Summarizer> = Arc::new(NoopSummarizer);
//!
//! let engine = Arc::new(StrategyEngine::new(default_strategies(
//!     clock.clone(),
//!     counter.clone(),
//!     ids,
//!     summarizer,
//!     SlidingWindowConfig::default(),
//!     SummarizationConfig::default(),
//!     HybridConfig::default(),
//! )));
//!
//! let coordinator = Coordinator::new(engine, counter, CoordinatorConfig::default());
//!
//! let conversation = Conversation::new("conv-1", chrono::Utc::now());
//! let (should, _reason) = coordinator.should_compress(&mut conversation.clone()).await;
//! assert!(!should);
//! # }
//! ```

mod conversation;
mod coordinator;
mod error;
mod hybrid;
mod message;
mod retention;
mod sliding_window;
mod strategy;
mod summarization;
mod support;
mod tokenizer;

pub use conversation::{CompressionRecord, Conversation};
pub use coordinator::{CompressionStats, Coordinator, CoordinatorConfig};
pub use error::CompressionError;
pub use hybrid::{HybridConfig, HybridStrategy, STRATEGY_ID as HYBRID_STRATEGY_ID};
pub use message::{Message, MessageMetadata, MessagePosition, MessageType, Role, COMPRESSION_SUMMARY_TAG, SUMMARY_MARKER};
pub use retention::{
    default_rules, PolicyAnalysis, RetentionPolicy, RetentionPolicyBuilder, RetentionRule, RuleAction, RuleMatch,
};
pub use sliding_window::{SlidingWindowConfig, SlidingWindowStrategy, STRATEGY_ID as SLIDING_WINDOW_STRATEGY_ID};
pub use strategy::{CompressionEstimate, CompressionResult, CompressionStrategy, StrategyEngine};
pub use summarization::{
    SemanticSummarizationStrategy, SummarizationConfig, STRATEGY_ID as SEMANTIC_SUMMARIZATION_STRATEGY_ID,
};
pub use support::{CancellationToken, Clock, IdGenerator, Summarizer, SystemClock, UuidGenerator};
pub use tokenizer::{ApproxTokenizer, TokenCounter, TokenCounting, Tokenizer};

use std::sync::Arc;

/// Convenience constructor assembling the three built-in strategies wired
/// to the same clock/counter/id-generator/summarizer, ready to hand to
/// [`StrategyEngine::new`]. Hosts that need a custom strategy can still
/// build the `Vec` by hand and append one via
/// [`StrategyEngine::register`].
#[allow(clippy::too_many_arguments)]
pub fn default_strategies(
    clock: Arc<dyn Clock>,
    counter: Arc<dyn TokenCounting>,
    ids: Arc<dyn IdGenerator>,
    summarizer: Arc<dyn Summarizer>,
    sliding_window_config: SlidingWindowConfig,
    summarization_config: SummarizationConfig,
    hybrid_config: HybridConfig,
) -> Vec<Box<dyn CompressionStrategy>> {
    let sliding_window: Arc<dyn CompressionStrategy> = Arc::new(SlidingWindowStrategy::new(
        sliding_window_config,
        clock.clone(),
        counter.clone(),
    ));
    let semantic: Arc<dyn CompressionStrategy> = Arc::new(SemanticSummarizationStrategy::new(
        summarization_config,
        clock,
        counter.clone(),
        ids,
        summarizer,
    ));
    let hybrid: Box<dyn CompressionStrategy> = Box::new(HybridStrategy::new(
        hybrid_config,
        sliding_window.clone(),
        semantic.clone(),
        counter,
    ));

    vec![Box::new(ArcStrategy(sliding_window)), Box::new(ArcStrategy(semantic)), hybrid]
}

/// Adapter letting an `Arc<dyn CompressionStrategy>` (needed so the hybrid
/// strategy can hold shared references to its inner strategies) satisfy
/// `Box<dyn CompressionStrategy>` for engine registration.
struct ArcStrategy(Arc<dyn CompressionStrategy>);

#[async_trait::async_trait]
impl CompressionStrategy for ArcStrategy {
    fn id(&self) -> &str {
        self.0.id()
    }

    async fn execute(
        &self,
        conversation: &Conversation,
        policy: &RetentionPolicy,
        cancellation: &CancellationToken,
    ) -> Result<CompressionResult, CompressionError> {
        self.0.execute(conversation, policy, cancellation).await
    }

    fn estimate(&self, conversation: &Conversation, policy: &RetentionPolicy) -> CompressionEstimate {
        self.0.estimate(conversation, policy)
    }
}

/// A [`Summarizer`] that echoes back a deterministic placeholder,
/// documented and intended only for examples/tests wiring a coordinator
/// without a real LLM provider.
pub struct NoopSummarizer;

#[async_trait::async_trait]
impl Summarizer for NoopSummarizer {
    async fn summarize(
        &self,
        _prompt: &str,
        _cancellation: &CancellationToken,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(String::new())
    }
}
