/*!
 * Core translation service implementation.
 *
 * `TranslationService` turns one batch of source lines into the same number
 * of translated lines. It sends a single marker-tagged request, then re-sends
 * every line whose marker came back missing as its own request.
 */

use log::{debug, warn};
use std::sync::Arc;

use crate::app_config::TaskSettings;
use crate::errors::ProviderError;
use crate::providers::ChatProvider;

use super::markers::{build_marked_batch, parse_marked_response};

/// Placeholder substituted in both prompts
pub const TARGET_LANGUAGE_PLACEHOLDER: &str = "{target_language}";

/// Prompt pair used by the service
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSet {
    /// Prompt for marker-tagged batch requests
    pub batch: String,
    /// Prompt for single-line fallback requests; empty reuses `batch`
    pub fallback: String,
}

impl PromptSet {
    pub fn from_settings(settings: &TaskSettings) -> Self {
        Self {
            batch: settings.system_prompt.clone(),
            fallback: settings.fallback_prompt.clone(),
        }
    }

    pub fn batch_prompt(&self, target_language: &str) -> String {
        self.batch.replace(TARGET_LANGUAGE_PLACEHOLDER, target_language)
    }

    pub fn fallback_prompt(&self, target_language: &str) -> String {
        let template = if self.fallback.trim().is_empty() {
            &self.batch
        } else {
            &self.fallback
        };
        template.replace(TARGET_LANGUAGE_PLACEHOLDER, target_language)
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::from_settings(&TaskSettings::default())
    }
}

/// Translation service bound to one chat provider
#[derive(Debug, Clone)]
pub struct TranslationService {
    provider: Arc<dyn ChatProvider>,
    prompts: PromptSet,
}

impl TranslationService {
    pub fn new(provider: Arc<dyn ChatProvider>, prompts: PromptSet) -> Self {
        Self { provider, prompts }
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Translate `lines`, always returning exactly `lines.len()` strings in order.
    ///
    /// An error from the batch request itself is returned as is. Lines that
    /// are still missing after their fallback request keep the source text.
    pub async fn translate_batch(&self, lines: &[String], target_language: &str) -> Result<Vec<String>, ProviderError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let request = build_marked_batch(lines);
        let response = self
            .provider
            .complete(&self.prompts.batch_prompt(target_language), &request)
            .await?;

        let slots = parse_marked_response(&response, lines.len());
        let missing: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.is_none().then_some(i))
            .collect();

        // Missing lines start out as the source text
        let mut translated: Vec<String> = slots
            .into_iter()
            .zip(lines)
            .map(|(slot, source)| slot.unwrap_or_else(|| source.clone()))
            .collect();

        if !missing.is_empty() {
            debug!("{} of {} lines missing from batch response, falling back", missing.len(), lines.len());
        }

        for index in missing {
            match self.translate_line(&lines[index], target_language).await {
                Ok(text) => translated[index] = text,
                Err(e) => warn!(
                    "Fallback translation for line {} failed, keeping source text: {}",
                    index + 1,
                    e
                ),
            }
        }

        Ok(translated)
    }

    /// Translate a single line with the fallback prompt
    pub async fn translate_line(&self, line: &str, target_language: &str) -> Result<String, ProviderError> {
        let response = self
            .provider
            .complete(&self.prompts.fallback_prompt(target_language), line)
            .await?;

        let text = response.trim();
        if text.is_empty() {
            return Err(ProviderError::ParseError("Empty fallback translation".to_string()));
        }

        // A model may echo the marker even for a bare line
        let parsed = parse_marked_response(text, 1);
        Ok(parsed
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_else(|| text.to_string()))
    }
}
