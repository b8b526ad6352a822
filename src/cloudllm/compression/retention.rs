//! Retention policy: a priority-ordered rule set deciding which messages
//! must survive compression.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;

use super::message::{Message, MessagePosition, MessageType};

/// What a [`RetentionRule`] does once it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Retain,
    Compress,
    Remove,
}

/// A rule's predicate.
///
/// The nine default rules are named variants with a single pattern-match
/// site (§9's design note preferring this over raw closures for
/// exhaustiveness and testability); [`RuleMatch::Custom`] keeps first-class
/// predicates available for the policy builder's dynamic rules.
#[derive(Clone)]
pub enum RuleMatch {
    SystemRole,
    Pinned,
    Important,
    CommandType,
    Recent,
    HasError,
    ToolType,
    HasFilePaths,
    HasCodeBlocks,
    Custom(Arc<dyn Fn(&Message, &MessagePosition) -> bool + Send + Sync>),
}

impl RuleMatch {
    fn matches(&self, message: &Message, position: &MessagePosition) -> bool {
        match self {
            RuleMatch::SystemRole => matches!(message.role, super::message::Role::System),
            RuleMatch::Pinned => message.pinned,
            RuleMatch::Important => message.important,
            RuleMatch::CommandType => message.metadata.message_type == MessageType::Command,
            RuleMatch::Recent => position.is_recent,
            RuleMatch::HasError => message.metadata.has_error,
            RuleMatch::ToolType => matches!(
                message.metadata.message_type,
                MessageType::ToolCall | MessageType::ToolResult
            ),
            RuleMatch::HasFilePaths => !message.metadata.file_paths.is_empty(),
            RuleMatch::HasCodeBlocks => message.metadata.code_blocks > 0,
            RuleMatch::Custom(predicate) => predicate(message, position),
        }
    }
}

impl std::fmt::Debug for RuleMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuleMatch::SystemRole => "SystemRole",
            RuleMatch::Pinned => "Pinned",
            RuleMatch::Important => "Important",
            RuleMatch::CommandType => "CommandType",
            RuleMatch::Recent => "Recent",
            RuleMatch::HasError => "HasError",
            RuleMatch::ToolType => "ToolType",
            RuleMatch::HasFilePaths => "HasFilePaths",
            RuleMatch::HasCodeBlocks => "HasCodeBlocks",
            RuleMatch::Custom(_) => "Custom(..)",
        };
        write!(f, "{}", name)
    }
}

/// A single entry in a [`RetentionPolicy`]'s rule set.
#[derive(Clone)]
pub struct RetentionRule {
    pub priority: i32,
    pub matcher: RuleMatch,
    pub action: RuleAction,
    /// Stable identifier used by tooling and [`AnalyzePolicy`] — never
    /// changes shape for a given rule once published.
    pub reason: String,
}

impl RetentionRule {
    pub fn new(priority: i32, matcher: RuleMatch, action: RuleAction, reason: impl Into<String>) -> Self {
        Self {
            priority,
            matcher,
            action,
            reason: reason.into(),
        }
    }
}

/// The nine default rules, in the priority order from §4.2.
pub fn default_rules() -> Vec<RetentionRule> {
    vec![
        RetentionRule::new(10, RuleMatch::SystemRole, RuleAction::Retain, "system_messages"),
        RetentionRule::new(9, RuleMatch::Pinned, RuleAction::Retain, "pinned_messages"),
        RetentionRule::new(8, RuleMatch::Important, RuleAction::Retain, "important_messages"),
        RetentionRule::new(7, RuleMatch::CommandType, RuleAction::Retain, "command_messages"),
        RetentionRule::new(6, RuleMatch::Recent, RuleAction::Retain, "recent_messages"),
        RetentionRule::new(5, RuleMatch::HasError, RuleAction::Retain, "error_messages"),
        RetentionRule::new(4, RuleMatch::ToolType, RuleAction::Retain, "tool_messages"),
        RetentionRule::new(3, RuleMatch::HasFilePaths, RuleAction::Retain, "messages_with_files"),
        RetentionRule::new(2, RuleMatch::HasCodeBlocks, RuleAction::Retain, "messages_with_code"),
    ]
}

/// An ordered rule set plus the `recentCount`/`minAge` parameters consulted
/// by [`RuleMatch::Recent`] and by hosts computing "old enough to drop"
/// thresholds.
///
/// Rules are sorted once, at construction (descending priority, stable),
/// not on every evaluation — §9 flags the source's per-evaluation sort as
/// unnecessary since rule lists are append-only.
#[derive(Clone, Debug)]
pub struct RetentionPolicy {
    rules: Vec<RetentionRule>,
    pub recent_count: usize,
    pub min_age: Duration,
}

impl std::fmt::Debug for RetentionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionRule")
            .field("priority", &self.priority)
            .field("action", &self.action)
            .field("reason", &self.reason)
            .finish()
    }
}

impl RetentionPolicy {
    /// The balanced/default policy: all nine default rules, `recentCount=10`,
    /// `minAge=30m`.
    pub fn default_policy() -> Self {
        Self::new(default_rules(), 10, Duration::minutes(30))
    }

    /// Alias for [`RetentionPolicy::default_policy`] (§4.2: "Balanced equals
    /// the default").
    pub fn balanced() -> Self {
        Self::default_policy()
    }

    /// All nine default rules, `recentCount=30`, `minAge=1h`.
    pub fn conservative() -> Self {
        Self::new(default_rules(), 30, Duration::hours(1))
    }

    /// Only the top-3 default rules (system, pinned, recent), `recentCount=5`,
    /// `minAge=10m`.
    pub fn aggressive() -> Self {
        let rules = default_rules().into_iter().take(3).collect();
        Self::new(rules, 5, Duration::minutes(10))
    }

    pub fn new(mut rules: Vec<RetentionRule>, recent_count: usize, min_age: Duration) -> Self {
        rules.sort_by_key(|r| std::cmp::Reverse(r.priority));
        Self {
            rules,
            recent_count,
            min_age,
        }
    }

    pub fn builder() -> RetentionPolicyBuilder {
        RetentionPolicyBuilder::new()
    }

    pub fn rules(&self) -> &[RetentionRule] {
        &self.rules
    }

    /// Evaluate the rule set in descending priority order; the first
    /// matching rule's action determines the outcome (`Retain` => `true`,
    /// anything else => `false`). No match => `false`.
    pub fn should_retain(&self, message: &Message, position: &MessagePosition) -> bool {
        for rule in &self.rules {
            if rule.matcher.matches(message, position) {
                return rule.action == RuleAction::Retain;
            }
        }
        false
    }

    /// Compute per-rule match counts and the overall retention rate for
    /// `messages`, without performing any compression — used to drive UI
    /// hints before a real compression (§4.2).
    pub fn analyze(&self, messages: &[Message], now: chrono::DateTime<chrono::Utc>) -> PolicyAnalysis {
        let total = messages.len();
        let mut rule_matches: HashMap<String, usize> = self
            .rules
            .iter()
            .map(|rule| (rule.reason.clone(), 0))
            .collect();
        let mut retained = 0usize;

        for (index, message) in messages.iter().enumerate() {
            let position = MessagePosition::new(index, total, message.timestamp, now, self.recent_count);
            for rule in &self.rules {
                if rule.matcher.matches(message, &position) {
                    *rule_matches.get_mut(&rule.reason).unwrap() += 1;
                    if rule.action == RuleAction::Retain {
                        retained += 1;
                    }
                    break;
                }
            }
        }

        let retention_rate = if total == 0 { 0.0 } else { retained as f64 / total as f64 };

        PolicyAnalysis {
            rule_matches,
            total,
            retained,
            retention_rate,
        }
    }
}

/// Output of [`RetentionPolicy::analyze`].
#[derive(Debug, Clone)]
pub struct PolicyAnalysis {
    pub rule_matches: HashMap<String, usize>,
    pub total: usize,
    pub retained: usize,
    pub retention_rate: f64,
}

/// Builder composing a custom policy by appending rules to (by default) the
/// nine defaults. Sort stability for rules of equal priority is
/// unspecified beyond "stable sort, append order preserved" (§4.2).
pub struct RetentionPolicyBuilder {
    rules: Vec<RetentionRule>,
    recent_count: usize,
    min_age: Duration,
}

impl RetentionPolicyBuilder {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
            recent_count: 10,
            min_age: Duration::minutes(30),
        }
    }

    /// Start from an empty rule set instead of the nine defaults.
    pub fn without_defaults(mut self) -> Self {
        self.rules.clear();
        self
    }

    pub fn add_rule(mut self, rule: RetentionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn recent_count(mut self, recent_count: usize) -> Self {
        self.recent_count = recent_count;
        self
    }

    pub fn min_age(mut self, min_age: Duration) -> Self {
        self.min_age = min_age;
        self
    }

    pub fn build(self) -> RetentionPolicy {
        RetentionPolicy::new(self.rules, self.recent_count, self.min_age)
    }
}

impl Default for RetentionPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
