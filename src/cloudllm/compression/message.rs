//! Data model shared by the retention policy, strategies, and coordinator.

use std::sync::atomic::AtomicU64;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The author of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Fine-grained classification of a message's purpose, consulted by the
/// default retention rules (`command_messages`, `tool_messages`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessageType {
    #[default]
    Normal,
    Command,
    ToolCall,
    ToolResult,
    Error,
}

/// Auxiliary, mostly-optional data attached to a [`Message`].
///
/// Default-constructed as all-empty/all-false; the retention rules in
/// [`crate::compression::retention`] read these fields but never write them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub message_type: MessageType,
    pub context: Vec<String>,
    pub references: Vec<String>,
    pub tools: Vec<String>,
    pub file_paths: Vec<String>,
    pub code_blocks: usize,
    pub has_error: bool,
}

/// The literal tag placed in a summary message's `metadata.context`.
pub const COMPRESSION_SUMMARY_TAG: &str = "compression_summary";

/// The literal prefix every synthetic summary message's content begins with.
pub const SUMMARY_MARKER: &str = "[SUMMARY] ";

/// A single turn in a [`crate::compression::Conversation`].
///
/// `token_count` is a memoization cell rather than a plain field: the token
/// counter populates it through a shared reference (see
/// [`crate::compression::TokenCounter::count_conversation`]), matching the
/// "interior mutability over `&mut` everywhere" design note for caching.
#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "token_count_cell")]
    pub token_count: AtomicU64,
    pub metadata: MessageMetadata,
    pub pinned: bool,
    pub important: bool,
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            role: self.role,
            content: self.content.clone(),
            timestamp: self.timestamp,
            token_count: AtomicU64::new(self.token_count.load(std::sync::atomic::Ordering::Relaxed)),
            metadata: self.metadata.clone(),
            pinned: self.pinned,
            important: self.important,
        }
    }
}

impl Message {
    /// Construct a message with default metadata and an uncounted token cache.
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp,
            token_count: AtomicU64::new(0),
            metadata: MessageMetadata::default(),
            pinned: false,
            important: false,
        }
    }

    /// Build the synthetic assistant message emitted by the summarization
    /// strategy for a single chunk (§3, §4.3.2 invariant).
    pub fn summary(id: impl Into<String>, text: &str, timestamp: DateTime<Utc>, token_count: u64) -> Self {
        let mut metadata = MessageMetadata::default();
        metadata.context.push(COMPRESSION_SUMMARY_TAG.to_string());
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: format!("{}{}", SUMMARY_MARKER, text),
            timestamp,
            token_count: AtomicU64::new(token_count),
            metadata,
            pinned: false,
            important: false,
        }
    }

    /// `true` when this message carries the synthetic summary markers.
    pub fn is_compression_summary(&self) -> bool {
        self.content.starts_with(SUMMARY_MARKER)
            && self
                .metadata
                .context
                .iter()
                .any(|tag| tag == COMPRESSION_SUMMARY_TAG)
    }
}

/// A message's place within its conversation, as seen by the retention
/// policy and the sliding-window strategy.
#[derive(Debug, Clone, Copy)]
pub struct MessagePosition {
    pub index: usize,
    pub total: usize,
    pub is_first: bool,
    pub is_last: bool,
    pub age: chrono::Duration,
    pub is_recent: bool,
}

impl MessagePosition {
    /// Compute the position of the message at `index` within a sequence of
    /// `total` messages, given the reference clock time `now` and the
    /// `recent_count` window used for the `isRecent` calculation.
    pub fn new(index: usize, total: usize, timestamp: DateTime<Utc>, now: DateTime<Utc>, recent_count: usize) -> Self {
        let is_recent = total > 0 && index + recent_count >= total;
        Self {
            index,
            total,
            is_first: index == 0,
            is_last: total > 0 && index == total - 1,
            age: now.signed_duration_since(timestamp),
            is_recent,
        }
    }
}

mod token_count_cell {
    use std::sync::atomic::{AtomicU64, Ordering};

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &AtomicU64, serializer: S) -> Result<S::Ok, S::Error> {
        value.load(Ordering::Relaxed).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AtomicU64, D::Error> {
        Ok(AtomicU64::new(u64::deserialize(deserializer)?))
    }
}
