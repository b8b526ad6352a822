//! Semantic summarization strategy: chunk compressible messages and ask an
//! LLM capability to summarize each chunk (§4.3.2).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::conversation::Conversation;
use super::error::CompressionError;
use super::message::{Message, MessagePosition, MessageType, Role};
use super::retention::RetentionPolicy;
use super::strategy::{CompressionEstimate, CompressionResult, CompressionStrategy};
use super::support::{CancellationToken, Clock, IdGenerator, Summarizer};
use super::tokenizer::TokenCounting;

pub const STRATEGY_ID: &str = "semantic_summarization";

/// Parameters for [`SemanticSummarizationStrategy`] (§4.3.2).
#[derive(Debug, Clone)]
pub struct SummarizationConfig {
    pub summary_length: u64,
    pub chunk_size: u64,
    pub preserve_types: HashSet<MessageType>,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        let mut preserve_types = HashSet::new();
        preserve_types.insert(MessageType::Command);
        preserve_types.insert(MessageType::Error);
        preserve_types.insert(MessageType::ToolCall);
        Self {
            summary_length: 200,
            chunk_size: 5_000,
            preserve_types,
        }
    }
}

/// Chunks compressible messages and replaces each chunk with an
/// LLM-generated summary message.
pub struct SemanticSummarizationStrategy {
    pub config: SummarizationConfig,
    clock: Arc<dyn Clock>,
    counter: Arc<dyn TokenCounting>,
    ids: Arc<dyn IdGenerator>,
    summarizer: Arc<dyn Summarizer>,
}

impl SemanticSummarizationStrategy {
    pub fn new(
        config: SummarizationConfig,
        clock: Arc<dyn Clock>,
        counter: Arc<dyn TokenCounting>,
        ids: Arc<dyn IdGenerator>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            config,
            clock,
            counter,
            ids,
            summarizer,
        }
    }

    /// Split `messages` (by reference, preserving order) into `(non_compressible, compressible)`
    /// per §4.3.2 step 1.
    fn partition<'a>(&self, conversation: &'a Conversation, policy: &RetentionPolicy) -> (Vec<&'a Message>, Vec<&'a Message>) {
        let messages = &conversation.messages;
        let total = messages.len();
        let now = self.clock.now();

        let mut non_compressible = Vec::new();
        let mut compressible = Vec::new();

        for (index, message) in messages.iter().enumerate() {
            let position = MessagePosition::new(index, total, message.timestamp, now, policy.recent_count);
            let keep = matches!(message.role, Role::System)
                || message.pinned
                || policy.should_retain(message, &position)
                || self.config.preserve_types.contains(&message.metadata.message_type);

            if keep {
                non_compressible.push(message);
            } else {
                compressible.push(message);
            }
        }

        (non_compressible, compressible)
    }

    /// Greedily group `compressible` into chunks whose running token sum
    /// stays at or below `chunkSize`, starting a new chunk before it would
    /// be exceeded (§4.3.2 step 3). Pure — used by both `execute` and
    /// `estimate`.
    fn chunk<'a>(&self, compressible: &[&'a Message]) -> Vec<Vec<&'a Message>> {
        let mut chunks: Vec<Vec<&Message>> = Vec::new();
        let mut current: Vec<&Message> = Vec::new();
        let mut running = 0u64;

        for &message in compressible {
            let tokens = self.counter.count_message(message);
            if !current.is_empty() && running + tokens > self.config.chunk_size {
                chunks.push(std::mem::take(&mut current));
                running = 0;
            }
            running += tokens;
            current.push(message);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Build the prompt sent to the LLM capability for a single chunk
    /// (§4.3.2 step 4).
    fn build_prompt(&self, chunk: &[&Message]) -> String {
        let mut prompt = String::from(
            "Summarize the following conversation messages concisely, preserving key information, decisions, context, and any important details.\n\n",
        );
        for (i, message) in chunk.iter().enumerate() {
            let role = match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            prompt.push_str(&format!("{}. [{}] {}\n", i + 1, role, message.content));
        }
        prompt.push_str(&format!("\nRespond in approximately {} tokens.", self.config.summary_length));
        prompt
    }
}

#[async_trait]
impl CompressionStrategy for SemanticSummarizationStrategy {
    fn id(&self) -> &str {
        STRATEGY_ID
    }

    async fn execute(
        &self,
        conversation: &Conversation,
        policy: &RetentionPolicy,
        cancellation: &CancellationToken,
    ) -> Result<CompressionResult, CompressionError> {
        log::debug!(
            "semantic_summarization: executing over {} messages (chunk_size={})",
            conversation.messages.len(),
            self.config.chunk_size
        );

        if !conversation.has_unique_message_ids() {
            return Err(CompressionError::InvalidConversation(format!(
                "duplicate message id: {}",
                conversation.first_duplicate_id().unwrap_or("<unknown>")
            )));
        }

        let (non_compressible, compressible) = self.partition(conversation, policy);

        if compressible.is_empty() {
            return Ok(CompressionResult {
                original: conversation.clone(),
                compressed: conversation.clone(),
                strategy: STRATEGY_ID.to_string(),
                tokens_saved: 0,
                messages_removed: 0,
                summary: None,
                timestamp: Utc::now(),
            });
        }

        let chunks = self.chunk(&compressible);
        let tokens_before = self.counter.count_conversation(conversation);

        let mut summaries = Vec::with_capacity(chunks.len());
        let mut parts = Vec::with_capacity(chunks.len());

        for chunk in &chunks {
            if cancellation.is_cancelled() {
                return Err(CompressionError::Cancelled);
            }

            let prompt = self.build_prompt(chunk);
            let text = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(CompressionError::Cancelled),
                result = self.summarizer.summarize(&prompt, cancellation) => {
                    result.map_err(CompressionError::Summarization)?
                }
            };

            let last_timestamp = chunk.last().expect("chunk is non-empty").timestamp;
            let summary_tokens = self.counter.count(&text);
            let summary_message = Message::summary(self.ids.generate(), &text, last_timestamp, summary_tokens);
            parts.push(text);
            summaries.push(summary_message);
        }

        let mut kept: Vec<Message> = non_compressible.into_iter().cloned().collect();
        kept.extend(summaries);
        kept.sort_by_key(|m| m.timestamp);

        let mut compressed = conversation.clone();
        compressed.messages = kept;
        let tokens_after = self.counter.count_conversation(&compressed);

        let summary = if parts.len() == 1 {
            Some(parts[0].clone())
        } else {
            let mut combined = String::from("Compressed conversation summary:\n");
            for (i, part) in parts.iter().enumerate() {
                combined.push_str(&format!("Part {}: {}\n", i + 1, part));
            }
            Some(combined)
        };

        let messages_removed = compressible.len();
        let tokens_saved = tokens_before as i64 - tokens_after as i64;

        log::info!(
            "semantic_summarization: {} chunks, removed {} messages, saved {} tokens",
            chunks.len(),
            messages_removed,
            tokens_saved
        );

        Ok(CompressionResult {
            original: conversation.clone(),
            compressed,
            strategy: STRATEGY_ID.to_string(),
            tokens_saved,
            messages_removed,
            summary,
            timestamp: Utc::now(),
        })
    }

    fn estimate(&self, conversation: &Conversation, policy: &RetentionPolicy) -> CompressionEstimate {
        let (_non_compressible, compressible) = self.partition(conversation, policy);
        let chunks = self.chunk(&compressible);

        let tokens_to_save: u64 = compressible.iter().map(|m| self.counter.count_message(m)).sum();
        let estimated_summary_tokens = chunks.len() as u64 * self.config.summary_length;
        let tokens_saved = tokens_to_save as i64 - estimated_summary_tokens as i64;

        let total_tokens: u64 = conversation.messages.iter().map(|m| self.counter.count_message(m)).sum();
        let estimated_ratio = if total_tokens == 0 {
            0.0
        } else {
            tokens_saved as f64 / total_tokens as f64
        };

        CompressionEstimate {
            tokens_saved,
            messages_removed: compressible.len(),
            messages_kept: conversation.messages.len() - compressible.len() + chunks.len(),
            estimated_ratio,
        }
    }
}
