/*!
 * Mock chat provider for testing.
 *
 * This module provides a provider that simulates different behaviors:
 * - `MockChatProvider::working()` - Always answers every marker
 * - `MockChatProvider::partial_markers()` - Drops the last marker of each batch
 * - `MockChatProvider::fallback_failing()` - Drops the last marker and fails single-line requests
 * - `MockChatProvider::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::ChatProvider;

/// A request as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// System prompt sent with the request
    pub system_prompt: String,
    /// User message
    pub user_text: String,
}

impl MockRequest {
    /// Whether this was a marker-tagged batch request
    pub fn is_batch(&self) -> bool {
        self.user_text.trim_start().starts_with("<L")
    }
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Succeeds but the last marker of each batch response is missing
    PartialMarkers,
    /// Like `PartialMarkers`, and every single-line request fails
    FallbackFailing,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockChatProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<MockRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&MockRequest) -> String>,
}

impl MockChatProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn partial_markers() -> Self {
        Self::new(MockBehavior::PartialMarkers)
    }

    pub fn fallback_failing() -> Self {
        Self::new(MockBehavior::FallbackFailing)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator, used by the `Working` behavior
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every request received so far
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// Translation the mock produces for one source line
    pub fn translated(text: &str) -> String {
        format!("[TRANSLATED] {}", text)
    }

    /// Answer a marked batch, optionally dropping the last marker
    pub fn generate_batch_response(user_text: &str, drop_last: bool) -> String {
        let lines: Vec<(&str, &str)> = user_text.lines().filter_map(split_marker).collect();
        let keep = if drop_last { lines.len().saturating_sub(1) } else { lines.len() };

        lines
            .iter()
            .take(keep)
            .map(|(marker, text)| format!("{} {}", marker, Self::translated(text)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn simulated_failure(message: &str) -> ProviderError {
        ProviderError::ApiError {
            message: message.to_string(),
            status_code: 500,
        }
    }
}

/// Split `<Ln> text` into marker and text
fn split_marker(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if !line.starts_with("<L") {
        return None;
    }
    let end = line.find('>')?;
    Some((&line[..=end], line[end + 1..].trim()))
}

impl Clone for MockChatProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let request = MockRequest {
            system_prompt: system_prompt.to_string(),
            user_text: user_text.to_string(),
        };
        self.requests.lock().push(request.clone());

        let answer = |drop_last: bool| {
            if request.is_batch() {
                Self::generate_batch_response(&request.user_text, drop_last)
            } else {
                Self::translated(request.user_text.trim())
            }
        };

        match self.behavior {
            MockBehavior::Working => Ok(match self.custom_response {
                Some(generator) => generator(&request),
                None => answer(false),
            }),

            MockBehavior::PartialMarkers => Ok(answer(true)),

            MockBehavior::FallbackFailing => {
                if request.is_batch() {
                    Ok(answer(true))
                } else {
                    Err(Self::simulated_failure("Simulated fallback failure"))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(answer(false))
                }
            }

            MockBehavior::Failing => Err(Self::simulated_failure("Simulated provider failure")),

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(answer(false))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(Self::simulated_failure("Simulated provider failure")),
            _ => Ok(()),
        }
    }
}
