/*!
 * Translation of transcribed segments.
 *
 * - `markers`: positional `<Ln>` markers, request building and response parsing
 * - `core`: per-batch translation with single-line fallback
 * - `batch`: the pipeline stage that walks all segments batch by batch
 */

// Re-export main types for easier usage
pub use self::batch::TranslationStage;
pub use self::core::{PromptSet, TranslationService};

// Submodules
pub mod batch;
pub mod core;
pub mod markers;
