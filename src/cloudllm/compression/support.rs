//! External collaborators the core consumes but does not implement:
//! the LLM summarization capability, the wall clock, the id generator, and
//! a minimal cancellation token (§6).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// `Summarize(ctx, prompt) -> text` — the only capability the core needs
/// from an LLM provider (§6). Hosts adapt any of this crate's
/// `ClientWrapper` implementations behind a thin wrapper rather than the
/// compression core depending on `client_wrapper` directly.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        prompt: &str,
        cancellation: &CancellationToken,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Wall-clock capability, injectable so tests can supply a fixed instant
/// instead of `Utc::now()`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Default [`Clock`] backed by `chrono::Utc::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Opaque unique id generation for synthetic summary messages.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default [`IdGenerator`] backed by `uuid::Uuid::new_v4`, reusing the
/// `uuid` dependency this crate already carries for other generated ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// A minimal cooperative cancellation signal.
///
/// This crate does not already depend on `tokio-util`'s `CancellationToken`,
/// so rather than adding a dependency for one type, this is a small
/// in-house primitive over `Arc<AtomicBool>` plus a `tokio::sync::Notify` —
/// the same judgment call this crate already makes for its HTTP connection
/// pool (a bespoke primitive in favor of a new external dependency).
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<tokio::sync::Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once [`CancellationToken::cancel`] has been called. Intended
    /// to be raced against an in-flight LLM call via `tokio::select!`.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}
