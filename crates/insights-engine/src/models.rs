use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sentiment_core::Market;

/// Forward-return horizons reported for every extreme zone, in aligned samples.
pub const HORIZONS: [usize; 3] = [30, 60, 90];

/// Thresholds and windows for one insights run.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightsConfig {
    /// Extreme Fear episodes are days strictly below this score.
    pub fear_threshold: f64,
    /// Extreme Greed episodes are days strictly above this score.
    pub greed_threshold: f64,
    /// Trailing aligned points used for the recent correlation.
    pub recent_window: usize,
    /// How recent an episode must be to count as a fresh exit, in days.
    pub exit_lookback_days: i64,
    /// Fewer aligned points than this and every statistic is `None`.
    pub min_sample: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            fear_threshold: 25.0,
            greed_threshold: 75.0,
            recent_window: 90,
            exit_lookback_days: 30,
            min_sample: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Below,
    Above,
}

impl Direction {
    pub fn crosses(&self, score: f64, threshold: f64) -> bool {
        match self {
            Direction::Below => score < threshold,
            Direction::Above => score > threshold,
        }
    }
}

/// Onset day of a run of threshold-crossing days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub index: usize,
    pub date: NaiveDate,
    pub score: f64,
    pub price: f64,
}

/// Forward returns of a set of episodes at one horizon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HorizonReturns {
    /// Percentage returns, one decimal.
    pub returns: Vec<f64>,
    pub avg: Option<f64>,
    pub win_rate: Option<u32>,
    pub count: usize,
    pub median: Option<f64>,
    pub best: Option<f64>,
    pub worst: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Strengthening,
    Weakening,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Strengthening => "strengthening",
            Trend::Weakening => "weakening",
            Trend::Stable => "stable",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendReading {
    pub trend: Trend,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSummary {
    pub r_90d: Option<f64>,
    pub r_full: Option<f64>,
    pub label_90d: String,
    pub label_full: String,
    pub trend: Option<Trend>,
    pub trend_detail: Option<String>,
}

/// Distribution of the raw score history and where today sits in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub current: f64,
    pub current_percentile: u32,
    pub percentile_label: Option<String>,
    pub distance_to_fear: f64,
    pub distance_to_greed: f64,
}

/// Most recent episode of a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastEpisode {
    pub date: NaiveDate,
    pub score: f64,
    pub price: f64,
    pub days_ago: i64,
}

/// Backtest of one extreme zone as written to the insights file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub threshold: f64,
    pub episodes: usize,
    pub total_days: usize,
    pub avg_return_30d: Option<f64>,
    pub avg_return_60d: Option<f64>,
    pub avg_return_90d: Option<f64>,
    pub win_rate_30d: Option<u32>,
    pub median_return_30d: Option<f64>,
    pub best_return_30d: Option<f64>,
    pub worst_return_30d: Option<f64>,
    pub episodes_with_30d_data: usize,
    pub episodes_with_60d_data: usize,
    pub episodes_with_90d_data: usize,
    pub last: Option<LastEpisode>,
}

/// Per-market insights artifact, regenerated wholesale on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    #[serde(with = "sentiment_core::documents::utc_timestamp")]
    pub updated: DateTime<Utc>,
    pub asset: Market,
    pub price_symbol: String,
    pub price_label: String,
    pub correlation: CorrelationSummary,
    pub score_stats: Option<ScoreStats>,
    pub extreme_fear: Option<ZoneSummary>,
    pub extreme_greed: Option<ZoneSummary>,
    pub signals: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_is_strict() {
        assert!(Direction::Below.crosses(24.9, 25.0));
        assert!(!Direction::Below.crosses(25.0, 25.0));
        assert!(Direction::Above.crosses(75.1, 75.0));
        assert!(!Direction::Above.crosses(75.0, 75.0));
    }

    #[test]
    fn test_trend_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Trend::Weakening).unwrap(), "weakening");
        assert_eq!(Trend::Stable.to_string(), "stable");
    }
}
