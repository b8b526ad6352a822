//! Coordinator: threshold checks, stats, and mutually-exclusive compression
//! lifecycle (§4.4).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::conversation::{CompressionRecord, Conversation};
use super::error::CompressionError;
use super::retention::RetentionPolicy;
use super::strategy::{CompressionEstimate, CompressionResult, StrategyEngine};
use super::support::{CancellationToken, Clock, SystemClock};
use super::tokenizer::TokenCounting;

/// Coordinator-recognized configuration (§6). Not loaded from a file or
/// environment — that remains host responsibility per the Non-goals.
#[derive(Clone)]
pub struct CoordinatorConfig {
    pub enabled: bool,
    pub default_strategy: String,
    pub token_budget: u64,
    pub warning_threshold: u64,
    pub compression_threshold: u64,
    pub auto_compress_enabled: bool,
    pub auto_compress_interval: Duration,
    pub policy: RetentionPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_strategy: super::sliding_window::STRATEGY_ID.to_string(),
            token_budget: 0,
            warning_threshold: 150_000,
            compression_threshold: 180_000,
            auto_compress_enabled: false,
            auto_compress_interval: Duration::minutes(10),
            policy: RetentionPolicy::default_policy(),
        }
    }
}

/// Cumulative statistics across every successful [`Coordinator::compress`]
/// call on this coordinator instance.
#[derive(Debug, Clone, Default)]
pub struct CompressionStats {
    pub total_compressions: u64,
    pub total_tokens_saved: i64,
    pub total_messages_removed: u64,
    pub last_compression: Option<DateTime<Utc>>,
    pub average_ratio: f64,
}

struct CoordinatorState {
    config: CoordinatorConfig,
    stats: CompressionStats,
}

/// Orchestrates `ShouldCompress` / `Compress` / stats / config behind a
/// single `tokio::sync::RwLock`, so at most one [`Coordinator::compress`]
/// runs at a time on a given instance while reads (`should_compress`,
/// `estimate_compression`, `get_stats`, `get_config`) proceed concurrently
/// (§5.1). A `tokio::sync::RwLock` is used rather than `std::sync::RwLock`
/// because `compress` holds the guard across the strategy engine's `.await`
/// on the LLM capability.
pub struct Coordinator {
    engine: Arc<StrategyEngine>,
    counter: Arc<dyn TokenCounting>,
    clock: Arc<dyn Clock>,
    state: RwLock<CoordinatorState>,
}

impl Coordinator {
    pub fn new(engine: Arc<StrategyEngine>, counter: Arc<dyn TokenCounting>, config: CoordinatorConfig) -> Self {
        Self::with_clock(engine, counter, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        engine: Arc<StrategyEngine>,
        counter: Arc<dyn TokenCounting>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            engine,
            counter,
            clock,
            state: RwLock::new(CoordinatorState {
                config,
                stats: CompressionStats::default(),
            }),
        }
    }

    /// Count (and cache) `conversation`'s tokens, compare against the
    /// configured thresholds, and report whether compression is advised or
    /// required (§4.4). Populates `conversation.token_count` as a
    /// documented caching side effect.
    pub async fn should_compress(&self, conversation: &mut Conversation) -> (bool, String) {
        let state = self.state.read().await;

        if !state.config.enabled {
            log::warn!(
                "coordinator: declining to compress conversation {} because compression is disabled",
                conversation.id
            );
            return (false, String::new());
        }

        let tokens = self.counter.count_conversation(conversation);
        conversation.token_count = tokens;

        if tokens >= state.config.compression_threshold {
            (
                true,
                format!(
                    "conversation token count {} exceeds compression threshold {}",
                    tokens, state.config.compression_threshold
                ),
            )
        } else if tokens >= state.config.warning_threshold {
            (
                false,
                format!(
                    "conversation token count {} is approaching compression threshold {}",
                    tokens, state.config.compression_threshold
                ),
            )
        } else {
            (false, String::new())
        }
    }

    /// Forward to the default strategy's pure, cheap `Estimate` (§4.4).
    pub async fn estimate_compression(&self, conversation: &Conversation) -> Result<CompressionEstimate, CompressionError> {
        let state = self.state.read().await;
        self.engine
            .estimate(conversation, &state.config.default_strategy, &state.config.policy)
    }

    /// Run the default strategy over `conversation`, holding the write lock
    /// for the whole operation so at most one compression is in flight per
    /// coordinator instance (§4.4, §5.1).
    pub async fn compress(
        &self,
        conversation: &Conversation,
        cancellation: &CancellationToken,
    ) -> Result<CompressionResult, CompressionError> {
        let mut state = self.state.write().await;

        self.counter.count_conversation(conversation);

        let strategy_id = state.config.default_strategy.clone();
        let policy = state.config.policy.clone();

        log::debug!("coordinator: compressing conversation {} via {}", conversation.id, strategy_id);

        let result = self
            .engine
            .compress(conversation, &strategy_id, &policy, cancellation)
            .await
            .map_err(|e| e.wrap("compression failed"))?;

        if cancellation.is_cancelled() {
            return Err(CompressionError::Cancelled.wrap("compression failed"));
        }

        let tokens_before = self.counter.count_conversation(&result.original);
        let tokens_after = self.counter.count_conversation(&result.compressed);

        let mut compressed = result.compressed.clone();
        let now = self.clock.now();
        let mut history = conversation.compression_history.clone();
        history.push(CompressionRecord::new(
            now,
            result.strategy.clone(),
            result.original.messages.len(),
            compressed.messages.len(),
            tokens_before,
            tokens_after,
        ));
        compressed.compression_history = history;
        compressed.compressed = true;
        compressed.updated_at = now;

        state.stats.total_compressions += 1;
        state.stats.total_tokens_saved += result.tokens_saved;
        state.stats.total_messages_removed += result.messages_removed as u64;
        state.stats.last_compression = Some(now);

        let denominator = state.stats.total_tokens_saved + tokens_after as i64;
        state.stats.average_ratio = if denominator == 0 {
            0.0
        } else {
            state.stats.total_tokens_saved as f64 / denominator as f64
        };

        log::info!(
            "coordinator: compression succeeded via {}, saved {} tokens across {} messages",
            result.strategy,
            result.tokens_saved,
            result.messages_removed
        );

        Ok(CompressionResult {
            compressed,
            ..result
        })
    }

    pub async fn get_stats(&self) -> CompressionStats {
        self.state.read().await.stats.clone()
    }

    pub async fn get_config(&self) -> CoordinatorConfig {
        self.state.read().await.config.clone()
    }

    /// Atomically replace the coordinator's configuration. Does not abort
    /// any in-flight compression — none can be in flight, since `compress`
    /// holds the write lock for its entire duration.
    pub async fn update_config(&self, config: CoordinatorConfig) {
        self.state.write().await.config = config;
    }
}
