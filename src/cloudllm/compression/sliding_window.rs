//! Sliding window strategy: keep the last N messages plus forced retentions
//! (§4.3.1).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::conversation::Conversation;
use super::error::CompressionError;
use super::message::{Message, MessagePosition, Role};
use super::retention::RetentionPolicy;
use super::strategy::{CompressionEstimate, CompressionResult, CompressionStrategy};
use super::support::{CancellationToken, Clock};
use super::tokenizer::TokenCounting;

pub const STRATEGY_ID: &str = "sliding_window";

/// Parameters for [`SlidingWindowStrategy`] (§4.3.1).
#[derive(Debug, Clone, Copy)]
pub struct SlidingWindowConfig {
    pub window_size: i64,
    pub keep_pinned: bool,
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            keep_pinned: true,
        }
    }
}

/// Keeps the last `windowSize` policy-retained messages, always keeping
/// system messages (and, if `keepPinned`, pinned messages) regardless of
/// the window.
pub struct SlidingWindowStrategy {
    pub config: SlidingWindowConfig,
    clock: Arc<dyn Clock>,
    counter: Arc<dyn TokenCounting>,
}

impl SlidingWindowStrategy {
    pub fn new(config: SlidingWindowConfig, clock: Arc<dyn Clock>, counter: Arc<dyn TokenCounting>) -> Self {
        Self { config, clock, counter }
    }

    fn window_size(&self) -> usize {
        self.config.window_size.max(0) as usize
    }

    /// Build the compressed message set for `conversation`, returning it
    /// already sorted by timestamp (ties by original index).
    fn compress_messages(&self, conversation: &Conversation, policy: &RetentionPolicy) -> Vec<Message> {
        let messages = &conversation.messages;
        let total = messages.len();
        let window_size = self.window_size();

        if total <= window_size {
            return messages.clone();
        }

        let now = self.clock.now();

        let mut forced_indices = Vec::new();
        let mut candidate_indices = Vec::new();
        for (index, message) in messages.iter().enumerate() {
            let is_forced = matches!(message.role, Role::System) || (self.config.keep_pinned && message.pinned);
            if is_forced {
                forced_indices.push(index);
            } else {
                candidate_indices.push(index);
            }
        }

        let retained_candidates: Vec<usize> = candidate_indices
            .into_iter()
            .filter(|&index| {
                let position = MessagePosition::new(index, total, messages[index].timestamp, now, window_size);
                policy.should_retain(&messages[index], &position)
            })
            .collect();

        let trimmed_start = retained_candidates.len().saturating_sub(window_size);
        let trimmed_candidates = &retained_candidates[trimmed_start..];

        let mut kept_indices: Vec<usize> = forced_indices;
        kept_indices.extend_from_slice(trimmed_candidates);
        // Restore original-index order before the stable timestamp sort, so
        // equal-timestamp messages break ties by original index rather than
        // by forced-vs-candidate concatenation order.
        kept_indices.sort_unstable();

        let mut kept: Vec<Message> = kept_indices.into_iter().map(|index| messages[index].clone()).collect();
        kept.sort_by_key(|m| m.timestamp);
        kept
    }
}

#[async_trait]
impl CompressionStrategy for SlidingWindowStrategy {
    fn id(&self) -> &str {
        STRATEGY_ID
    }

    async fn execute(
        &self,
        conversation: &Conversation,
        policy: &RetentionPolicy,
        _cancellation: &CancellationToken,
    ) -> Result<CompressionResult, CompressionError> {
        log::debug!(
            "sliding_window: executing over {} messages (window_size={})",
            conversation.messages.len(),
            self.config.window_size
        );

        if !conversation.has_unique_message_ids() {
            return Err(CompressionError::InvalidConversation(format!(
                "duplicate message id: {}",
                conversation.first_duplicate_id().unwrap_or("<unknown>")
            )));
        }

        let kept = self.compress_messages(conversation, policy);

        let tokens_before = self.counter.count_conversation(conversation);
        let mut compressed = conversation.clone();
        compressed.messages = kept;
        let tokens_after = self.counter.count_conversation(&compressed);

        let messages_removed = conversation.messages.len() - compressed.messages.len();
        let tokens_saved = tokens_before as i64 - tokens_after as i64;

        log::info!(
            "sliding_window: removed {} messages, saved {} tokens",
            messages_removed,
            tokens_saved
        );

        Ok(CompressionResult {
            original: conversation.clone(),
            compressed,
            strategy: STRATEGY_ID.to_string(),
            tokens_saved,
            messages_removed,
            summary: None,
            timestamp: Utc::now(),
        })
    }

    fn estimate(&self, conversation: &Conversation, _policy: &RetentionPolicy) -> CompressionEstimate {
        let total = conversation.messages.len();
        let window_size = self.window_size();
        let messages_removed = total.saturating_sub(window_size);

        let total_tokens: u64 = conversation
            .messages
            .iter()
            .map(|m| self.counter.count_message(m))
            .sum();

        let tokens_saved: u64 = conversation
            .messages
            .iter()
            .take(messages_removed)
            .filter(|m| !matches!(m.role, Role::System) && !m.pinned)
            .map(|m| self.counter.count_message(m))
            .sum();

        let estimated_ratio = if total_tokens == 0 {
            0.0
        } else {
            tokens_saved as f64 / total_tokens as f64
        };

        CompressionEstimate {
            tokens_saved: tokens_saved as i64,
            messages_removed,
            messages_kept: total.saturating_sub(messages_removed),
            estimated_ratio,
        }
    }
}
