//! Error hierarchy for the conversation compression core.
//!
//! A single hand-rolled `Display`/`Error` enum, consistent with this crate's
//! preference for explicit error kinds over pulling in `thiserror`.

use std::error::Error;
use std::fmt;

/// Errors surfaced by the retention policy, strategy engine, and coordinator.
///
/// # Examples
///
/// ```
/// use cloudllm::compression::CompressionError;
///
/// let err = CompressionError::UnknownStrategy("made_up".to_string());
/// assert_eq!(err.to_string(), "unknown compression strategy: made_up");
/// ```
#[derive(Debug)]
pub enum CompressionError {
    /// A strategy id was requested that the engine has no registration for.
    UnknownStrategy(String),

    /// The LLM summarization capability failed on at least one chunk.
    ///
    /// Wraps the underlying provider error so the chain can be inspected by
    /// callers that need to distinguish transient failures.
    Summarization(Box<dyn Error + Send + Sync>),

    /// The operation was aborted via a caller-supplied cancellation token.
    Cancelled,

    /// The input conversation was structurally invalid (e.g. duplicate
    /// message ids) and was rejected before any compression work began.
    InvalidConversation(String),

    /// The coordinator's configuration was invalid (e.g. a negative
    /// threshold after [`crate::compression::CoordinatorConfig`] validation).
    InvalidConfig(String),

    /// An operation-identifying wrapper around a lower-level error, applied
    /// once by the coordinator per the propagation policy (ties the context
    /// of *which* public call failed to the underlying cause).
    Operation(String, Box<CompressionError>),
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionError::UnknownStrategy(id) => {
                write!(f, "unknown compression strategy: {}", id)
            }
            CompressionError::Summarization(source) => {
                write!(f, "summarization failed: {}", source)
            }
            CompressionError::Cancelled => write!(f, "compression cancelled"),
            CompressionError::InvalidConversation(reason) => {
                write!(f, "invalid conversation: {}", reason)
            }
            CompressionError::InvalidConfig(reason) => {
                write!(f, "invalid coordinator config: {}", reason)
            }
            CompressionError::Operation(phrase, source) => {
                write!(f, "{}: {}", phrase, source)
            }
        }
    }
}

impl Error for CompressionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CompressionError::Summarization(source) => Some(source.as_ref()),
            CompressionError::Operation(_, source) => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl CompressionError {
    /// Wrap `self` with an operation-identifying phrase, matching the
    /// coordinator's "compression failed: ..." propagation policy.
    pub fn wrap(self, phrase: impl Into<String>) -> Self {
        CompressionError::Operation(phrase.into(), Box::new(self))
    }

    /// Build a [`CompressionError::Summarization`] from any boxed error.
    pub fn summarization(source: impl Error + Send + Sync + 'static) -> Self {
        CompressionError::Summarization(Box::new(source))
    }
}
