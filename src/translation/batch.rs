/*!
 * Batch translation processing.
 *
 * Segments are split into fixed-size batches and translated one batch at a
 * time, so cancellation can be observed between batches and the segment order
 * never changes.
 */

use log::{error, info};

use crate::cancellation::{CancellationCheck, CancellationToken};
use crate::errors::TaskError;
use crate::segment_store::Segment;

use super::core::TranslationService;

/// Translation stage of the pipeline
pub struct TranslationStage {
    /// The translation service to use
    service: TranslationService,

    /// Number of segments per request, at least 1
    batch_size: usize,
}

impl TranslationStage {
    pub fn new(service: TranslationService, batch_size: usize) -> Self {
        Self {
            service,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Translate every segment, filling `translated_text`.
    ///
    /// The cancellation token is checked before each batch. `progress_callback`
    /// receives `(processed_segments, total_segments)` after each batch.
    pub async fn run(
        &self,
        segments: Vec<Segment>,
        target_language: &str,
        cancel: &CancellationToken,
        progress_callback: impl Fn(usize, usize),
    ) -> Result<Vec<Segment>, TaskError> {
        let total = segments.len();
        let total_batches = total.div_ceil(self.batch_size);
        let mut translated_segments = Vec::with_capacity(total);
        let mut processed = 0;

        for (batch_index, batch) in segments.chunks(self.batch_size).enumerate() {
            cancel.check()?;

            info!("Translating batch {} of {}", batch_index + 1, total_batches);
            let lines: Vec<String> = batch.iter().map(|s| s.text.clone()).collect();

            let translations = self
                .service
                .translate_batch(&lines, target_language)
                .await
                .map_err(|e| {
                    error!("Batch {} failed: {}", batch_index + 1, e);
                    TaskError::TranslationFailure(e.to_string())
                })?;

            if translations.len() != batch.len() {
                return Err(TaskError::Internal(format!(
                    "Batch {} returned {} lines for {} segments",
                    batch_index + 1,
                    translations.len(),
                    batch.len()
                )));
            }

            translated_segments.extend(batch.iter().cloned().zip(translations).map(|(mut segment, text)| {
                segment.translated_text = Some(text);
                segment
            }));

            processed += batch.len();
            progress_callback(processed, total);
        }

        Ok(translated_segments)
    }
}

/// End-to-end progress inside the translation band (70..=95)
pub fn translation_progress(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 70;
    }
    let share = processed.min(total) * 25 / total;
    70 + share as u8
}
