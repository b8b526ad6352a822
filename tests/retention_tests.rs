mod common;

use chrono::Utc;

use cloudllm::compression::{
    MessagePosition, MessageType, RetentionPolicy, RetentionRule, RuleAction, RuleMatch,
};
use cloudllm::compression::{Message, Role};

fn message(role: Role, content: &str) -> Message {
    Message::new(content.to_string(), role, content, Utc::now())
}

#[test]
fn default_policy_retains_system_messages_outside_recent_window() {
    let policy = RetentionPolicy::default_policy();
    let now = Utc::now();
    let system_message = message(Role::System, "sys");
    let position = MessagePosition::new(0, 100, system_message.timestamp, now, policy.recent_count);

    assert!(policy.should_retain(&system_message, &position));
}

#[test]
fn default_policy_drops_plain_old_user_messages() {
    let policy = RetentionPolicy::default_policy();
    let now = Utc::now();
    let plain = message(Role::User, "just chatting");
    // Far outside the recent window and carrying no special metadata.
    let position = MessagePosition::new(0, 100, plain.timestamp, now, policy.recent_count);

    assert!(!policy.should_retain(&plain, &position));
}

#[test]
fn pinned_flag_overrides_default_drop() {
    let policy = RetentionPolicy::default_policy();
    let now = Utc::now();
    let mut pinned = message(Role::User, "remember this");
    pinned.pinned = true;
    let position = MessagePosition::new(0, 100, pinned.timestamp, now, policy.recent_count);

    assert!(policy.should_retain(&pinned, &position));
}

#[test]
fn higher_priority_rule_wins_when_multiple_match() {
    // A pinned (prio 9) system (prio 10) message: system wins, but both are
    // `retain`, so the observable outcome is the same either way — what this
    // actually asserts is that evaluation stops at the first match in
    // descending priority order rather than scanning every rule.
    let policy = RetentionPolicy::default_policy();
    let now = Utc::now();
    let mut both = message(Role::System, "sys");
    both.pinned = true;
    let position = MessagePosition::new(0, 100, both.timestamp, now, policy.recent_count);

    assert!(policy.should_retain(&both, &position));
}

#[test]
fn aggressive_preset_keeps_only_top_three_rules() {
    let policy = RetentionPolicy::aggressive();
    assert_eq!(policy.rules().len(), 3);
    assert_eq!(policy.recent_count, 5);
    assert_eq!(policy.min_age, chrono::Duration::minutes(10));
}

#[test]
fn conservative_preset_widens_recent_window() {
    let policy = RetentionPolicy::conservative();
    assert_eq!(policy.rules().len(), 9);
    assert_eq!(policy.recent_count, 30);
    assert_eq!(policy.min_age, chrono::Duration::hours(1));
}

#[test]
fn balanced_equals_default() {
    let balanced = RetentionPolicy::balanced();
    let default_policy = RetentionPolicy::default_policy();
    assert_eq!(balanced.recent_count, default_policy.recent_count);
    assert_eq!(balanced.rules().len(), default_policy.rules().len());
}

#[test]
fn builder_appends_custom_rule_to_defaults() {
    let policy = RetentionPolicy::builder()
        .add_rule(RetentionRule::new(
            1,
            RuleMatch::Custom(std::sync::Arc::new(|m: &Message, _pos: &MessagePosition| {
                m.content.contains("keep-me")
            })),
            RuleAction::Retain,
            "custom_keep_me",
        ))
        .build();

    assert_eq!(policy.rules().len(), 10);

    let now = Utc::now();
    let custom_match = message(Role::User, "please keep-me around");
    let position = MessagePosition::new(0, 1, custom_match.timestamp, now, policy.recent_count);
    assert!(policy.should_retain(&custom_match, &position));
}

#[test]
fn builder_without_defaults_starts_empty() {
    let policy = RetentionPolicy::builder().without_defaults().build();
    assert!(policy.rules().is_empty());

    let now = Utc::now();
    let msg = message(Role::System, "sys");
    let position = MessagePosition::new(0, 1, msg.timestamp, now, policy.recent_count);
    // No rules at all means no default retention, even for system messages —
    // the policy's default rule set is what supplies that guarantee.
    assert!(!policy.should_retain(&msg, &position));
}

#[test]
fn command_type_is_retained_via_metadata() {
    let policy = RetentionPolicy::default_policy();
    let now = Utc::now();
    let mut command = message(Role::User, "/run tests");
    command.metadata.message_type = MessageType::Command;
    let position = MessagePosition::new(0, 100, command.timestamp, now, policy.recent_count);

    assert!(policy.should_retain(&command, &position));
}

#[test]
fn analyze_reports_retention_rate_and_per_rule_counts() {
    let policy = RetentionPolicy::default_policy();
    let now = Utc::now();

    let mut messages = Vec::new();
    messages.push(message(Role::System, "sys"));
    let mut pinned = message(Role::User, "pinned one");
    pinned.pinned = true;
    messages.push(pinned);
    messages.push(message(Role::User, "forgettable"));

    let analysis = policy.analyze(&messages, now);

    assert_eq!(analysis.total, 3);
    assert_eq!(analysis.rule_matches["system_messages"], 1);
    assert_eq!(analysis.rule_matches["pinned_messages"], 1);
    // "forgettable" is recent (within default recentCount=10 of 3 total), so
    // it's retained too, but under the recent_messages rule not a dedicated
    // "dropped" bucket — verify the rate reflects that instead of assuming 2/3.
    assert_eq!(analysis.retained, 3);
    assert_eq!(analysis.retention_rate, 1.0);
}

#[test]
fn analyze_empty_conversation_has_zero_rate() {
    let policy = RetentionPolicy::default_policy();
    let analysis = policy.analyze(&[], Utc::now());
    assert_eq!(analysis.total, 0);
    assert_eq!(analysis.retention_rate, 0.0);
}
