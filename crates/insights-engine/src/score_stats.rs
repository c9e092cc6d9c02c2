use sentiment_core::stats::{mean, percentile_at_or_below, round_to};

use crate::models::{InsightsConfig, ScoreStats};

/// Reader-facing band for a percentile rank.
pub fn percentile_label(percentile: u32) -> Option<&'static str> {
    match percentile {
        p if p >= 95 => Some("Near 12-month high"),
        p if p >= 85 => Some("Upper range"),
        p if p <= 5 => Some("Near 12-month low"),
        p if p <= 15 => Some("Lower range"),
        _ => None,
    }
}

/// Distribution of every stored score, priced or not. `None` for an empty
/// history.
pub fn compute_score_stats(scores: &[f64], current: f64, config: &InsightsConfig) -> Option<ScoreStats> {
    let avg = mean(scores)?;
    let percentile = percentile_at_or_below(current, scores)?;
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(ScoreStats {
        min: round_to(min, 1),
        max: round_to(max, 1),
        avg: round_to(avg, 1),
        current,
        current_percentile: percentile,
        percentile_label: percentile_label(percentile).map(str::to_string),
        distance_to_fear: round_to(min - config.fear_threshold, 1),
        distance_to_greed: round_to(max - config.greed_threshold, 1),
    })
}
