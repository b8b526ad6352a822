//! Token approximation and a bounded, memoizing cache in front of it.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use super::conversation::Conversation;
use super::message::Message;

/// Pluggable capability for estimating how many tokens a piece of text
/// costs a language model. `encode`/`decode` exist for host reuse (§6) but
/// the core itself only ever calls [`Tokenizer::count`].
pub trait Tokenizer: Send + Sync {
    /// Approximate token count for `text`. `count("") == 0` always holds.
    fn count(&self, text: &str) -> u64;

    /// Host convenience hook; unused internally. Default returns one "token"
    /// per UTF-8 byte, which is deliberately not meant to round-trip through
    /// [`Tokenizer::decode`] for any particular model's real vocabulary.
    fn encode(&self, text: &str) -> Vec<u32> {
        text.bytes().map(u32::from).collect()
    }

    /// Host convenience hook; unused internally.
    fn decode(&self, tokens: &[u32]) -> String {
        tokens.iter().filter_map(|&b| u8::try_from(b).ok()).map(|b| b as char).collect()
    }
}

/// Default [`Tokenizer`]: `ceil(len(text) / 4)`, matching the rough
/// characters-per-token heuristic this crate already uses in
/// `llm_session::count_tokens`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenizer;

impl Tokenizer for ApproxTokenizer {
    fn count(&self, text: &str) -> u64 {
        let len = text.len() as u64;
        if len == 0 {
            0
        } else {
            len.div_ceil(4)
        }
    }
}

/// Fixed-capacity cache fronting a [`Tokenizer`], keyed by a content
/// fingerprint (a truncated SHA-256 digest, following this crate's existing
/// use of `sha2` for content fingerprinting in `thought_chain`).
///
/// Bounded size, not strict LRU: once `capacity` entries are present, a
/// single arbitrary entry is evicted per insertion (§4.1). Reads take a
/// shared lock; writes (insert or clear) take an exclusive one. No cache
/// operation ever awaits, so a synchronous `std::sync::RwLock` is used
/// rather than `tokio::sync::RwLock` (see §5.2).
pub struct TokenCounter<T: Tokenizer> {
    tokenizer: T,
    capacity: usize,
    cache: RwLock<HashMap<[u8; 16], u64>>,
}

impl<T: Tokenizer> TokenCounter<T> {
    /// Default cache capacity (§4.1).
    pub const DEFAULT_CAPACITY: usize = 1_000;

    pub fn new(tokenizer: T) -> Self {
        Self::with_capacity(tokenizer, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(tokenizer: T, capacity: usize) -> Self {
        Self {
            tokenizer,
            capacity,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn fingerprint(text: &str) -> [u8; 16] {
        let digest = Sha256::digest(text.as_bytes());
        let mut key = [0u8; 16];
        key.copy_from_slice(&digest[..16]);
        key
    }

    /// Count the tokens in `text`, consulting and populating the cache.
    pub fn count(&self, text: &str) -> u64 {
        if text.is_empty() {
            return 0;
        }
        let key = Self::fingerprint(text);

        if let Some(&cached) = self.cache.read().expect("token cache poisoned").get(&key) {
            return cached;
        }

        let counted = self.tokenizer.count(text);

        let mut cache = self.cache.write().expect("token cache poisoned");
        if cache.len() >= self.capacity && !cache.contains_key(&key) {
            if let Some(evict_key) = cache.keys().next().copied() {
                cache.remove(&evict_key);
            }
        }
        cache.insert(key, counted);
        counted
    }

    /// Count (and cache) the tokens of a single [`Message`], populating its
    /// `token_count` cell when it reads as zero.
    pub fn count_message(&self, message: &Message) -> u64 {
        use std::sync::atomic::Ordering;
        if message.token_count.load(Ordering::Relaxed) == 0 {
            let counted = self.count(&message.content);
            message.token_count.store(counted, Ordering::Relaxed);
        }
        message.token_count.load(Ordering::Relaxed)
    }

    /// Sum the per-message token counts of `conversation`, populating any
    /// zero `token_count` cells along the way.
    pub fn count_conversation(&self, conversation: &Conversation) -> u64 {
        conversation.messages.iter().map(|m| self.count_message(m)).sum()
    }

    /// Number of entries currently cached. Exposed for tests.
    pub fn cache_len(&self) -> usize {
        self.cache.read().expect("token cache poisoned").len()
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.cache.write().expect("token cache poisoned").clear();
    }
}

impl Default for TokenCounter<ApproxTokenizer> {
    fn default() -> Self {
        Self::new(ApproxTokenizer)
    }
}

/// Object-safe facade over [`TokenCounter<T>`] so strategies and the
/// coordinator can hold a counter behind `Arc<dyn TokenCounting>` without
/// being generic over the concrete [`Tokenizer`] implementation.
pub trait TokenCounting: Send + Sync {
    fn count(&self, text: &str) -> u64;
    fn count_message(&self, message: &Message) -> u64;
    fn count_conversation(&self, conversation: &Conversation) -> u64;
}

impl<T: Tokenizer> TokenCounting for TokenCounter<T> {
    fn count(&self, text: &str) -> u64 {
        TokenCounter::count(self, text)
    }

    fn count_message(&self, message: &Message) -> u64 {
        TokenCounter::count_message(self, message)
    }

    fn count_conversation(&self, conversation: &Conversation) -> u64 {
        TokenCounter::count_conversation(self, conversation)
    }
}
