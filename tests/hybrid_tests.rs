mod common;

use std::sync::Arc;

use chrono::Utc;

use cloudllm::compression::{
    CancellationToken, CompressionStrategy, Conversation, HybridConfig, HybridStrategy, Message,
    RetentionPolicy, RetentionRule, Role, RuleAction, RuleMatch, SemanticSummarizationStrategy,
    SlidingWindowConfig, SlidingWindowStrategy, SummarizationConfig, SystemClock, TokenCounter,
};

use common::{fixed_clock, FakeSummarizer, SequentialIdGenerator};

fn message_at(id: &str, content: &str, seconds_offset: i64) -> Message {
    let t0 = Utc::now();
    Message::new(id, Role::User, content, t0 + chrono::Duration::seconds(seconds_offset))
}

/// A policy carrying only the `Recent` rule, with `recent_count=0`.
///
/// The window phase ignores `policy.recent_count` (it passes its own
/// `window_size` into `MessagePosition` instead), so this still lets the
/// window keep its last N candidates. The semantic phase, run over the
/// handful of messages the window drops, *does* consult `recent_count`
/// directly — zeroing it keeps those leftovers from being treated as
/// "recent" and therefore non-compressible.
fn recent_only_policy() -> RetentionPolicy {
    RetentionPolicy::builder()
        .without_defaults()
        .add_rule(RetentionRule::new(
            1,
            RuleMatch::Recent,
            RuleAction::Retain,
            "recent",
        ))
        .recent_count(0)
        .build()
}

fn build_hybrid(
    threshold: u64,
    summarizer: Arc<dyn cloudllm::compression::Summarizer>,
    window_size: i64,
) -> HybridStrategy {
    let counter = Arc::new(TokenCounter::default());
    let clock = fixed_clock(Utc::now());

    let window: Arc<dyn CompressionStrategy> = Arc::new(SlidingWindowStrategy::new(
        SlidingWindowConfig {
            window_size,
            keep_pinned: true,
        },
        Arc::new(SystemClock),
        counter.clone(),
    ));
    let semantic: Arc<dyn CompressionStrategy> = Arc::new(SemanticSummarizationStrategy::new(
        SummarizationConfig {
            summary_length: 10,
            chunk_size: 5_000,
            preserve_types: Default::default(),
        },
        clock,
        counter.clone(),
        Arc::new(SequentialIdGenerator::default()),
        summarizer,
    ));

    HybridStrategy::new(HybridConfig { threshold }, window, semantic, counter)
}

#[tokio::test]
async fn s6_degrades_to_sliding_window_on_summarization_failure() {
    let summarizer: Arc<dyn cloudllm::compression::Summarizer> = Arc::new(FakeSummarizer::failing_on_call(0));
    // threshold=0 forces the semantic branch to always be attempted once the
    // window drops at least one message.
    let hybrid = build_hybrid(0, summarizer, 1);
    let policy = recent_only_policy();
    let cancellation = CancellationToken::new();

    let messages = vec![
        message_at("a", "aaaa", 0),
        message_at("b", "bbbb", 1),
        message_at("c", "cccc", 2),
    ];
    let conversation = Conversation::with_messages("conv", Utc::now(), messages);

    let result = hybrid.execute(&conversation, &policy, &cancellation).await.unwrap();

    assert_eq!(result.strategy, "hybrid");
    assert!(result.summary.is_none());
    // Degraded result equals the plain sliding-window output: only the last
    // window_size=1 candidate plus nothing else survives.
    assert_eq!(result.compressed.messages.len(), 1);
    assert_eq!(result.compressed.messages[0].id, "c");
}

#[tokio::test]
async fn below_threshold_returns_window_result_unchanged() {
    let summarizer: Arc<dyn cloudllm::compression::Summarizer> = Arc::new(FakeSummarizer::always_returning("SUM"));
    let hybrid = build_hybrid(1_000_000, summarizer, 20);
    let policy = RetentionPolicy::default_policy();
    let cancellation = CancellationToken::new();

    let messages = vec![message_at("a", "short", 0), message_at("b", "short", 1)];
    let conversation = Conversation::with_messages("conv", Utc::now(), messages);

    let result = hybrid.execute(&conversation, &policy, &cancellation).await.unwrap();
    assert_eq!(result.strategy, "hybrid");
    assert_eq!(result.compressed.messages.len(), 2);
    assert_eq!(result.messages_removed, 0);
}

#[tokio::test]
async fn successful_semantic_fallback_combines_both_results() {
    let summarizer: Arc<dyn cloudllm::compression::Summarizer> = Arc::new(FakeSummarizer::always_returning("SUM"));
    let hybrid = build_hybrid(0, summarizer, 1);
    let policy = recent_only_policy();
    let cancellation = CancellationToken::new();

    let messages = vec![
        message_at("a", "aaaa", 0),
        message_at("b", "bbbb", 1),
        message_at("c", "cccc", 2),
    ];
    let conversation = Conversation::with_messages("conv", Utc::now(), messages);

    let result = hybrid.execute(&conversation, &policy, &cancellation).await.unwrap();

    assert_eq!(result.strategy, "hybrid");
    assert!(result.summary.is_some());
    // "c" survives the window untouched, "a" and "b" get folded into a
    // summary message instead of being discarded outright.
    let ids: Vec<&str> = result.compressed.messages.iter().map(|m| m.id.as_str()).collect();
    assert!(ids.contains(&"c"));
    assert!(result.compressed.messages.iter().any(|m| m.is_compression_summary()));
}
