//! Speech-rate calculation and inter-cue smoothing.
//!
//! Rates are signed percentages handed to the synthesis provider. They are
//! derived values, recomputed from cue text and duration; smoothing works
//! on an array of rates and never touches the cues themselves.

use crate::config::TtsConfig;
use crate::subtitle::Cue;
use std::time::Duration;
use tracing::debug;

/// Characters per second a listener comfortably follows, short sentences.
const TARGET_SPEED_SHORT: f64 = 3.5;
/// Characters per second for longer sentences.
const TARGET_SPEED_LONG: f64 = 4.0;
/// Character count below which the short-sentence target applies.
const SHORT_TEXT_CHARS: usize = 20;

/// Compute the rate adjustment for one cue. Pure: same input, same output.
///
/// Blank text or a non-positive duration yields the neutral rate. The
/// result is clamped to the configured speed bounds.
pub fn compute_rate(text: &str, duration: Duration, config: &TtsConfig) -> i32 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }

    let duration_secs = duration.as_secs_f64();
    if duration_secs <= 0.0 {
        return 0;
    }

    let char_count = text.chars().count();
    let current_speed = char_count as f64 / duration_secs;
    let target_speed = if char_count < SHORT_TEXT_CHARS {
        TARGET_SPEED_SHORT
    } else {
        TARGET_SPEED_LONG
    };

    let rate = ((current_speed / target_speed - 1.0) * 100.0 * config.adjust_factor).round() as i32;
    rate.clamp(config.min_speed, config.max_speed)
}

/// Format a rate the way the provider expects: `+N%` / `-N%`.
pub fn format_rate(rate: i32) -> String {
    format!("{rate:+}%")
}

/// Compute a rate per cue, then bound the delta between temporally
/// adjacent cues.
///
/// The smoothing pass walks left to right and only ever inspects the pair
/// `(i-1, i)`. When a pair differs by more than `max_speed_diff` the
/// faster side is reduced toward the slower one by exactly that bound;
/// if reducing the earlier cue would drop it below `min_speed`, the later
/// (slower) cue is raised instead. Both members of an adjusted pair are
/// re-clamped. This is local smoothing, not global re-optimization.
pub fn smooth(cues: &[Cue], config: &TtsConfig) -> Vec<i32> {
    let mut rates: Vec<i32> = cues
        .iter()
        .map(|cue| compute_rate(&cue.text, cue.duration(), config))
        .collect();

    let max_diff = config.max_speed_diff;
    for i in 1..rates.len() {
        let diff = rates[i - 1] - rates[i];
        if diff.abs() <= max_diff {
            continue;
        }

        if diff > 0 {
            // Earlier cue is faster: lower it toward the later one.
            let lowered = rates[i] + max_diff;
            if lowered < config.min_speed {
                rates[i] = rates[i - 1] - max_diff;
            } else {
                rates[i - 1] = lowered;
            }
        } else {
            // Later cue is faster: lower it toward the earlier one.
            rates[i] = rates[i - 1] + max_diff;
        }

        rates[i - 1] = rates[i - 1].clamp(config.min_speed, config.max_speed);
        rates[i] = rates[i].clamp(config.min_speed, config.max_speed);
        debug!(
            "Smoothed rate pair at cue {}: {}% / {}%",
            i,
            rates[i - 1],
            rates[i]
        );
    }

    rates
}
