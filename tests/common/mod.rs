#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use cloudllm::compression::{CancellationToken, Clock, IdGenerator, Summarizer};

/// A [`Clock`] pinned to a fixed instant, so strategy tests get
/// deterministic `MessagePosition::age`/`isRecent` computations.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// An [`IdGenerator`] producing `summary-0`, `summary-1`, ... in call order.
#[derive(Default)]
pub struct SequentialIdGenerator {
    next: AtomicUsize,
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("summary-{}", n)
    }
}

/// A [`Summarizer`] test double that either always returns a fixed string,
/// or fails on a configured call index, recording every prompt it saw.
pub struct FakeSummarizer {
    response: String,
    fail_on_call: Option<usize>,
    calls: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub fn always_returning(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            fail_on_call: None,
            calls: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on_call(call_index: usize) -> Self {
        Self {
            response: String::new(),
            fail_on_call: Some(call_index),
            calls: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[derive(Debug)]
pub struct FakeSummarizerError;

impl std::fmt::Display for FakeSummarizerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ErrBoom")
    }
}

impl std::error::Error for FakeSummarizerError {}

#[async_trait::async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(
        &self,
        prompt: &str,
        _cancellation: &CancellationToken,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            let index = *calls;
            *calls += 1;
            index
        };
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.fail_on_call == Some(call_index) {
            return Err(Box::new(FakeSummarizerError));
        }
        Ok(self.response.clone())
    }
}

pub fn fixed_clock(now: DateTime<Utc>) -> Arc<dyn Clock> {
    Arc::new(FixedClock(now))
}
