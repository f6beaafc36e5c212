//! Mock backend for testing gateway behavior.
//!
//! Allows defining canned responses for specific prompts, toggling
//! availability, and injecting failures, enabling end-to-end testing of
//! routing, fallback, and caching without real API calls.

use aegis_core::{BackendReply, Error, IgnoreLock as _, Invocation, ModelBackend, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Response storage type
type ResponseMap = Arc<Mutex<Vec<(String, String)>>>;

/// Failure a mock backend can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Fail every call with [`Error::Unavailable`].
    Unavailable,
    /// Fail every call with [`Error::Timeout`].
    Timeout,
    /// Reply with malformed content.
    InvalidResponse,
}

/// Mock backend that returns pre-defined responses based on prompt patterns.
///
/// Clones share state, so a test can keep a handle for assertions after
/// handing a clone to the gateway.
#[derive(Clone)]
pub struct MockBackend {
    /// Name of this mock backend
    name: String,
    /// Predefined responses keyed by prompt pattern, in registration order
    responses: ResponseMap,
    /// Default response if no pattern matches
    default_response: Arc<Mutex<Option<String>>>,
    /// Call history for verification
    call_history: Arc<Mutex<Vec<Invocation>>>,
    /// Whether the backend reports itself available
    available: Arc<AtomicBool>,
    /// Injected failure, if any
    failure: Arc<Mutex<Option<MockFailure>>>,
    /// Cost reported per call
    cost: f64,
    /// Latency reported per call
    latency_ms: u64,
    /// Real delay before answering
    delay: Option<Duration>,
}

impl MockBackend {
    /// Create a new mock backend with a given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: Arc::new(Mutex::new(None)),
            call_history: Arc::new(Mutex::new(Vec::new())),
            available: Arc::new(AtomicBool::new(true)),
            failure: Arc::new(Mutex::new(None)),
            cost: 0.0,
            latency_ms: 0,
            delay: None,
        }
    }

    /// Add a pattern-based response to the mock backend.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .lock_ignore_poison()
            .push((pattern.into(), response.into()));
        self
    }

    /// Set a default response for prompts that don't match any pattern.
    #[must_use]
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        *self.default_response.lock_ignore_poison() = Some(response.into());
        self
    }

    /// Set the cost reported for each call.
    #[must_use]
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Set the latency reported for each call.
    #[must_use]
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Sleep for `delay` before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every subsequent call fail.
    #[must_use]
    pub fn with_failure(self, failure: MockFailure) -> Self {
        self.set_failure(Some(failure));
        self
    }

    /// Change the injected failure at runtime.
    pub fn set_failure(&self, failure: Option<MockFailure>) {
        *self.failure.lock_ignore_poison() = failure;
    }

    /// Change what [`ModelBackend::is_available`] reports.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Clear the call history (used for testing).
    pub fn clear_history(&self) {
        self.call_history.lock_ignore_poison().clear();
    }

    /// Get the call history (every invocation received).
    #[must_use]
    pub fn call_history(&self) -> Vec<Invocation> {
        self.call_history.lock_ignore_poison().clone()
    }

    /// Get the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_history.lock_ignore_poison().len()
    }

    /// Find a matching response for the given prompt text.
    fn find_response(&self, prompt: &str) -> Option<String> {
        let responses = self.responses.lock_ignore_poison();

        // Try exact match first
        if let Some((_, response)) = responses.iter().find(|(pattern, _)| pattern == prompt) {
            return Some(response.clone());
        }

        responses
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn invoke(&self, invocation: &Invocation) -> Result<BackendReply> {
        self.call_history
            .lock_ignore_poison()
            .push(invocation.clone());

        if let Some(delay) = self.delay {
            sleep(delay).await;
        }

        let failure = *self.failure.lock_ignore_poison();
        match failure {
            Some(MockFailure::Unavailable) => {
                return Err(Error::Unavailable(format!("{} is offline", self.name)));
            }
            Some(MockFailure::Timeout) => {
                return Err(Error::Timeout {
                    elapsed_ms: self.latency_ms,
                });
            }
            Some(MockFailure::InvalidResponse) => {
                return Err(Error::InvalidResponse(format!(
                    "{} returned garbage",
                    self.name
                )));
            }
            None => {}
        }

        let text = self.find_response(&invocation.prompt).unwrap_or_else(|| {
            self.default_response
                .lock_ignore_poison()
                .clone()
                .unwrap_or_else(|| format!("Mock response for prompt: {}", invocation.prompt))
        });

        Ok(BackendReply {
            text,
            cost: self.cost,
            latency_ms: self.latency_ms,
        })
    }
}
