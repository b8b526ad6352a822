//! Hybrid strategy: sliding window first, then semantic summarization of
//! whatever it dropped, if the result is still over threshold (§4.3.3).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::conversation::Conversation;
use super::error::CompressionError;
use super::retention::RetentionPolicy;
use super::strategy::{CompressionEstimate, CompressionResult, CompressionStrategy};
use super::support::CancellationToken;
use super::tokenizer::TokenCounting;

pub const STRATEGY_ID: &str = "hybrid";

/// Parameters for [`HybridStrategy`] (§4.3.3).
#[derive(Debug, Clone, Copy)]
pub struct HybridConfig {
    pub threshold: u64,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self { threshold: 80_000 }
    }
}

/// Composes a sliding-window pass with a semantic-summarization fallback:
/// if the window result is still over `threshold`, the messages the window
/// dropped are summarized instead of discarded outright.
pub struct HybridStrategy {
    pub config: HybridConfig,
    sliding_window: Arc<dyn CompressionStrategy>,
    semantic: Arc<dyn CompressionStrategy>,
    counter: Arc<dyn TokenCounting>,
}

impl HybridStrategy {
    pub fn new(
        config: HybridConfig,
        sliding_window: Arc<dyn CompressionStrategy>,
        semantic: Arc<dyn CompressionStrategy>,
        counter: Arc<dyn TokenCounting>,
    ) -> Self {
        Self {
            config,
            sliding_window,
            semantic,
            counter,
        }
    }

    fn as_hybrid(&self, mut result: CompressionResult) -> CompressionResult {
        result.strategy = STRATEGY_ID.to_string();
        result
    }
}

#[async_trait]
impl CompressionStrategy for HybridStrategy {
    fn id(&self) -> &str {
        STRATEGY_ID
    }

    async fn execute(
        &self,
        conversation: &Conversation,
        policy: &RetentionPolicy,
        cancellation: &CancellationToken,
    ) -> Result<CompressionResult, CompressionError> {
        log::debug!("hybrid: executing over {} messages", conversation.messages.len());

        let window_result = self.sliding_window.execute(conversation, policy, cancellation).await?;

        let tokens_after_window = self.counter.count_conversation(&window_result.compressed);
        let over_threshold = tokens_after_window > self.config.threshold;
        let window_dropped_messages = conversation.messages.len() > window_result.compressed.messages.len();

        if !over_threshold || !window_dropped_messages {
            return Ok(self.as_hybrid(window_result));
        }

        let kept_ids: HashSet<&str> = window_result.compressed.messages.iter().map(|m| m.id.as_str()).collect();
        let removed_messages: Vec<_> = conversation
            .messages
            .iter()
            .filter(|m| !kept_ids.contains(m.id.as_str()))
            .cloned()
            .collect();

        if removed_messages.is_empty() {
            return Ok(self.as_hybrid(window_result));
        }

        let synthetic = Conversation::with_messages(
            format!("{}-hybrid-removed", conversation.id),
            conversation.updated_at,
            removed_messages,
        );

        match self.semantic.execute(&synthetic, policy, cancellation).await {
            Ok(summary_result) => {
                let mut kept = summary_result.compressed.messages.clone();
                kept.extend(window_result.compressed.messages.iter().cloned());
                kept.sort_by_key(|m| m.timestamp);

                let mut compressed = window_result.compressed.clone();
                compressed.messages = kept;

                Ok(CompressionResult {
                    original: conversation.clone(),
                    compressed,
                    strategy: STRATEGY_ID.to_string(),
                    tokens_saved: window_result.tokens_saved + summary_result.tokens_saved,
                    messages_removed: window_result.messages_removed,
                    summary: summary_result.summary,
                    timestamp: Utc::now(),
                })
            }
            Err(source) => {
                log::warn!(
                    "hybrid: semantic summarization of {} dropped messages failed, degrading to sliding-window result: {}",
                    synthetic.messages.len(),
                    source
                );
                Ok(self.as_hybrid(window_result))
            }
        }
    }

    fn estimate(&self, conversation: &Conversation, policy: &RetentionPolicy) -> CompressionEstimate {
        let window_estimate = self.sliding_window.estimate(conversation, policy);
        let semantic_estimate = self.semantic.estimate(conversation, policy);

        CompressionEstimate {
            tokens_saved: window_estimate.tokens_saved + semantic_estimate.tokens_saved / 2,
            messages_removed: window_estimate.messages_removed,
            messages_kept: window_estimate.messages_kept + 2,
            estimated_ratio: (window_estimate.estimated_ratio + semantic_estimate.estimated_ratio) / 2.0,
        }
    }
}
