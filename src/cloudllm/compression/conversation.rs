//! [`Conversation`] and its compression bookkeeping.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;

/// One entry in a conversation's [`Conversation::compression_history`].
///
/// Derived purely from before/after metrics of a single successful
/// [`crate::compression::Coordinator::compress`] call; never mutated once
/// appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionRecord {
    pub timestamp: DateTime<Utc>,
    pub strategy: String,
    pub messages_before: usize,
    pub messages_after: usize,
    pub tokens_before: u64,
    pub tokens_after: u64,
    pub compression_ratio: f64,
}

impl CompressionRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        strategy: impl Into<String>,
        messages_before: usize,
        messages_after: usize,
        tokens_before: u64,
        tokens_after: u64,
    ) -> Self {
        let compression_ratio = if tokens_before == 0 {
            0.0
        } else {
            (tokens_before.saturating_sub(tokens_after)) as f64 / tokens_before as f64
        };
        Self {
            timestamp,
            strategy: strategy.into(),
            messages_before,
            messages_after,
            tokens_before,
            tokens_after,
            compression_ratio,
        }
    }
}

/// A bounded, ordered chat history plus its compression provenance.
///
/// The core never mutates a `Conversation` in place: every compression
/// produces a fresh value built from the original (see §3's lifecycle
/// invariant). `token_count` is a plain cached field here (unlike
/// [`Message::token_count`]) because the coordinator is the sole writer and
/// always holds the whole `Conversation` by value or `&mut` when updating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub token_count: u64,
    pub compressed: bool,
    pub messages: Vec<Message>,
    pub metadata: HashMap<String, String>,
    pub compression_history: Vec<CompressionRecord>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            token_count: 0,
            compressed: false,
            messages: Vec::new(),
            metadata: HashMap::new(),
            compression_history: Vec::new(),
        }
    }

    pub fn with_messages(id: impl Into<String>, now: DateTime<Utc>, messages: Vec<Message>) -> Self {
        let mut conversation = Self::new(id, now);
        conversation.messages = messages;
        conversation
    }

    /// `true` when every message id in `messages` is unique — checked by
    /// strategies and the coordinator before doing any compression work
    /// (§7's `ErrInvalidConversation`, implemented rather than omitted).
    pub fn has_unique_message_ids(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.messages.len());
        self.messages.iter().all(|m| seen.insert(m.id.as_str()))
    }

    /// Find the duplicated id, if any, for error reporting.
    pub fn first_duplicate_id(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::with_capacity(self.messages.len());
        for message in &self.messages {
            if !seen.insert(message.id.as_str()) {
                return Some(message.id.as_str());
            }
        }
        None
    }
}
