/*!
 * Provider implementations for chat-based translation services.
 *
 * This module contains:
 * - `openai`: client for any OpenAI-compatible `/chat/completions` endpoint
 * - `mock`: scripted provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for chat completion providers
///
/// The translation service only needs one exchange shape: a system prompt
/// plus one user message, answered with plain text.
#[async_trait]
pub trait ChatProvider: Send + Sync + Debug {
    /// Complete a single-turn chat request
    ///
    /// # Arguments
    /// * `system_prompt` - Instructions for the model
    /// * `user_text` - The text to process
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The assistant's reply or an error
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

pub mod mock;
pub mod openai;
