use cloudllm::compression::{ApproxTokenizer, Message, Role, TokenCounter, Tokenizer};

#[test]
fn empty_string_counts_as_zero_tokens() {
    assert_eq!(ApproxTokenizer.count(""), 0);
}

#[test]
fn count_rounds_up_to_nearest_token() {
    // ceil(len / 4): 1..=4 bytes -> 1 token, 5..=8 -> 2, etc.
    assert_eq!(ApproxTokenizer.count("a"), 1);
    assert_eq!(ApproxTokenizer.count("abcd"), 1);
    assert_eq!(ApproxTokenizer.count("abcde"), 2);
    assert_eq!(ApproxTokenizer.count(&"x".repeat(40)), 10);
}

#[test]
fn counter_caches_repeated_text() {
    let counter = TokenCounter::new(ApproxTokenizer);
    assert_eq!(counter.cache_len(), 0);

    let first = counter.count("hello world");
    assert_eq!(counter.cache_len(), 1);

    let second = counter.count("hello world");
    assert_eq!(first, second);
    assert_eq!(counter.cache_len(), 1);
}

#[test]
fn counter_evicts_once_capacity_is_reached() {
    let counter = TokenCounter::with_capacity(ApproxTokenizer, 2);

    counter.count("one");
    counter.count("two");
    assert_eq!(counter.cache_len(), 2);

    counter.count("three");
    assert_eq!(counter.cache_len(), 2);
}

#[test]
fn clear_drops_every_cached_entry() {
    let counter = TokenCounter::new(ApproxTokenizer);
    counter.count("something");
    assert_eq!(counter.cache_len(), 1);

    counter.clear();
    assert_eq!(counter.cache_len(), 0);
}

#[test]
fn count_message_populates_the_token_count_cell_once() {
    let counter = TokenCounter::new(ApproxTokenizer);
    let message = Message::new("1", Role::User, "x".repeat(40), chrono::Utc::now());

    use std::sync::atomic::Ordering;
    assert_eq!(message.token_count.load(Ordering::Relaxed), 0);

    let counted = counter.count_message(&message);
    assert_eq!(counted, 10);
    assert_eq!(message.token_count.load(Ordering::Relaxed), 10);

    // A second call reads the now-populated cell rather than recomputing.
    assert_eq!(counter.count_message(&message), 10);
}

#[test]
fn count_message_never_recomputes_once_the_cell_is_nonzero() {
    let counter = TokenCounter::new(ApproxTokenizer);
    let message = Message::new("1", Role::User, "x".repeat(40), chrono::Utc::now());

    use std::sync::atomic::Ordering;
    message.token_count.store(999, Ordering::Relaxed);

    // Pre-populated to a value the tokenizer would never produce for this
    // content, proving the cell is trusted rather than recomputed.
    assert_eq!(counter.count_message(&message), 999);
}
