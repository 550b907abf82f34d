//! Order-preserving partitioning of cue texts into translation batches,
//! and reassembly of translated batch text back into per-cue lines.

use crate::config::SubtitleConfig;
use crate::error::{RedubError, Result};
use tracing::debug;

/// Partition texts into newline-joined batches bounded by cue count and
/// character budget.
///
/// Greedy: a text joins the current batch unless the batch is already at
/// `batch_size` entries or adding it would blow the character budget. A
/// single text larger than the budget becomes its own batch, never
/// truncated or split. Blank texts are skipped and consume no capacity.
pub fn partition(texts: &[String], config: &SubtitleConfig) -> Vec<String> {
    let mut batches: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_chars = 0usize;

    for text in texts {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let text_chars = text.chars().count();

        if current.len() >= config.batch_size
            || current_chars + text_chars > config.max_chars_per_batch
        {
            if !current.is_empty() {
                batches.push(current.join("\n"));
            }
            current = vec![text];
            current_chars = text_chars;
        } else {
            current.push(text);
            current_chars += text_chars;
        }
    }

    if !current.is_empty() {
        batches.push(current.join("\n"));
    }

    debug!(
        "Partitioned {} texts into {} batches",
        texts.len(),
        batches.len()
    );
    batches
}

/// Split one translated batch back into per-cue lines.
pub fn split_lines(translated: &str) -> Vec<String> {
    translated
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reassemble translated batches into a flat per-cue text list.
///
/// Each translated batch must contain exactly as many non-empty lines as
/// the batch it answers; a mismatch is fatal (no fuzzy realignment) and
/// carries the 1-based batch index.
pub fn reassemble(original_batches: &[String], translated_batches: &[String]) -> Result<Vec<String>> {
    if original_batches.len() != translated_batches.len() {
        return Err(RedubError::TranslationAlignment {
            batch: translated_batches.len().min(original_batches.len()) + 1,
            expected: original_batches.len(),
            actual: translated_batches.len(),
        });
    }

    let mut texts = Vec::new();
    for (i, (original, translated)) in original_batches
        .iter()
        .zip(translated_batches)
        .enumerate()
    {
        let expected = split_lines(original).len();
        let lines = split_lines(translated);
        if lines.len() != expected {
            return Err(RedubError::TranslationAlignment {
                batch: i + 1,
                expected,
                actual: lines.len(),
            });
        }
        texts.extend(lines);
    }

    Ok(texts)
}
