//! Cue merging for translation quality, and restoration of translated text
//! onto the original timing grid.

use super::{Cue, TimingTable};
use crate::config::SubtitleConfig;
use std::time::Duration;
use tracing::{debug, warn};

/// Sentence-terminal punctuation that blocks a merge (CJK and Latin).
const TERMINAL_PUNCTUATION: [char; 8] = ['。', '！', '？', '；', '.', '!', '?', ';'];

fn ends_with_terminal_punctuation(text: &str) -> bool {
    text.chars()
        .last()
        .map(|c| TERMINAL_PUNCTUATION.contains(&c))
        .unwrap_or(false)
}

/// Merge temporally adjacent cues into larger translation units.
///
/// Greedy single pass: a cue joins the running buffer when the gap to the
/// buffer end is within the threshold, the combined text fits `max_chars`,
/// and the buffer does not already end a sentence. Negative gaps (overlap
/// in malformed derived sequences) count as zero. Merged cues are
/// re-indexed 1..N and span from the first source cue's start to the last
/// source cue's end.
pub fn merge(cues: &[Cue], config: &SubtitleConfig) -> Vec<Cue> {
    let Some(first) = cues.first() else {
        return Vec::new();
    };

    let threshold = Duration::from_millis(config.merge_threshold_ms);
    let mut merged: Vec<Cue> = Vec::new();

    let mut buffer_text = first.text.clone();
    let mut buffer_start = first.start;
    let mut buffer_end = first.end;

    for next in &cues[1..] {
        let gap = next.start.saturating_sub(buffer_end);
        let combined_len = buffer_text.chars().count() + 1 + next.text.chars().count();

        if gap <= threshold
            && combined_len <= config.max_chars
            && !ends_with_terminal_punctuation(&buffer_text)
        {
            buffer_text.push(' ');
            buffer_text.push_str(&next.text);
            buffer_end = next.end;
        } else {
            merged.push(Cue {
                index: merged.len() + 1,
                start: buffer_start,
                end: buffer_end,
                text: std::mem::take(&mut buffer_text),
            });
            buffer_text = next.text.clone();
            buffer_start = next.start;
            buffer_end = next.end;
        }
    }

    merged.push(Cue {
        index: merged.len() + 1,
        start: buffer_start,
        end: buffer_end,
        text: buffer_text,
    });

    debug!("Merged {} cues into {}", cues.len(), merged.len());
    merged
}

/// Re-attach translated text to the original timing grid, pairing by
/// position: translated cue `i` gets the timing captured for original
/// index `i + 1`.
///
/// A count mismatch is a recoverable degradation: the shorter of the two
/// sides wins and the unmatched tail is dropped with a warning.
pub fn restore(translated: &[Cue], original_timings: &TimingTable) -> Vec<Cue> {
    if translated.len() != original_timings.len() {
        warn!(
            "Cue count mismatch during restore: {} original, {} translated; truncating",
            original_timings.len(),
            translated.len()
        );
    }

    translated
        .iter()
        .enumerate()
        .filter_map(|(i, cue)| {
            original_timings.get(i + 1).map(|(start, end)| Cue {
                index: i + 1,
                start,
                end,
                text: cue.text.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(index: usize, start_ms: u64, end_ms: u64, text: &str) -> Cue {
        Cue {
            index,
            start: Duration::from_millis(start_ms),
            end: Duration::from_millis(end_ms),
            text: text.to_string(),
        }
    }

    fn config() -> SubtitleConfig {
        SubtitleConfig {
            merge_threshold_ms: 200,
            max_chars: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_empty_input() {
        assert!(merge(&[], &config()).is_empty());
    }

    #[test]
    fn test_merge_close_cues() {
        let cues = vec![cue(1, 0, 3000, "Hello there"), cue(2, 3050, 6000, "friend")];
        let merged = merge(&cues, &config());

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Hello there friend");
        assert_eq!(merged[0].start, Duration::ZERO);
        assert_eq!(merged[0].end, Duration::from_millis(6000));
    }

    #[test]
    fn test_terminal_punctuation_blocks_merge() {
        // Gap is 50ms, well within threshold, but the first cue ends a
        // sentence so the merge must not happen.
        let cues = vec![cue(1, 0, 3000, "Hi."), cue(2, 3050, 6000, "Bye")];
        let merged = merge(&cues, &config());

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "Hi.");
        assert_eq!(merged[1].text, "Bye");
    }

    #[test]
    fn test_cjk_punctuation_blocks_merge() {
        let cues = vec![cue(1, 0, 3000, "你好。"), cue(2, 3050, 6000, "再见")];
        assert_eq!(merge(&cues, &config()).len(), 2);
    }

    #[test]
    fn test_wide_gaps_keep_cues_separate() {
        let cues = vec![
            cue(1, 0, 1000, "one"),
            cue(2, 2000, 3000, "two"),
            cue(3, 4000, 5000, "three"),
        ];
        let merged = merge(&cues, &config());

        assert_eq!(merged.len(), 3);
        for (i, (m, c)) in merged.iter().zip(&cues).enumerate() {
            assert_eq!(m.index, i + 1);
            assert_eq!(m.text, c.text);
            assert_eq!(m.start, c.start);
            assert_eq!(m.end, c.end);
        }
    }

    #[test]
    fn test_max_chars_blocks_merge() {
        let long = "a".repeat(30);
        let cues = vec![cue(1, 0, 1000, &long), cue(2, 1050, 2000, &long)];
        let merged = merge(&cues, &config());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_overlapping_cues_treated_as_zero_gap() {
        let cues = vec![cue(1, 0, 2000, "one"), cue(2, 1500, 3000, "two")];
        let merged = merge(&cues, &config());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "one two");
    }

    #[test]
    fn test_merge_chain_reindexes() {
        let cues = vec![
            cue(1, 0, 1000, "a"),
            cue(2, 1100, 2000, "b"),
            cue(3, 5000, 6000, "c"),
        ];
        let merged = merge(&cues, &config());

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].index, 1);
        assert_eq!(merged[0].text, "a b");
        assert_eq!(merged[1].index, 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let cues = vec![
            cue(1, 0, 1000, "Hello there"),
            cue(2, 1100, 2000, "my friend."),
            cue(3, 5000, 6000, "Goodbye."),
        ];
        let once = merge(&cues, &config());
        let twice = merge(&once, &config());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_restore_position_law() {
        let originals = vec![cue(1, 0, 1000, "one"), cue(2, 2000, 3000, "two")];
        let table = TimingTable::capture(&originals);
        let translated = vec![cue(1, 500, 900, "一"), cue(2, 2100, 2900, "二")];

        let restored = restore(&translated, &table);

        assert_eq!(restored.len(), 2);
        for i in 0..2 {
            assert_eq!(restored[i].start, originals[i].start);
            assert_eq!(restored[i].end, originals[i].end);
            assert_eq!(restored[i].text, translated[i].text);
            assert_eq!(restored[i].index, i + 1);
        }
    }

    #[test]
    fn test_restore_truncates_extra_translations() {
        let originals = vec![cue(1, 0, 1000, "one")];
        let table = TimingTable::capture(&originals);
        let translated = vec![cue(1, 0, 1000, "一"), cue(2, 2000, 3000, "二")];

        let restored = restore(&translated, &table);

        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].text, "一");
    }

    #[test]
    fn test_restore_truncates_missing_translations() {
        let originals = vec![cue(1, 0, 1000, "one"), cue(2, 2000, 3000, "two")];
        let table = TimingTable::capture(&originals);
        let translated = vec![cue(1, 0, 1000, "一")];

        let restored = restore(&translated, &table);

        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].start, Duration::ZERO);
    }
}
