//! Reader-facing sentences describing the most notable current condition.
//!
//! Rules run in a fixed editorial order: an active extreme zone, then a recent
//! exit from one, then markets that never (or only one-sidedly) reach
//! extremes, then an unusual percentile, then the plain 12-month range.

use sentiment_core::stats::{display_decimal, round_int};
use sentiment_core::SentimentLabel;

use crate::models::{InsightsConfig, ScoreStats, ZoneSummary};

/// Everything the cascade looks at.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub current_score: f64,
    pub current_label: SentimentLabel,
    /// `None` when the aligned series was too short to backtest.
    pub fear: Option<&'a ZoneSummary>,
    pub greed: Option<&'a ZoneSummary>,
    pub stats: Option<&'a ScoreStats>,
}

pub fn generate_signals(ctx: &SignalContext<'_>, config: &InsightsConfig) -> Vec<String> {
    let mut signals = Vec::new();
    let score_int = round_int(ctx.current_score);
    let label = ctx.current_label;

    if ctx.current_score < config.fear_threshold {
        let history = ctx
            .fear
            .filter(|z| z.episodes > 0)
            .and_then(|z| Some((z.avg_return_30d?, z.win_rate_30d?)));
        match history {
            Some((avg, win_rate)) => signals.push(format!(
                "The index is in Extreme Fear ({}). Historically, buying at these levels returned {}{}% over 30 days ({}% success rate).",
                score_int,
                if avg >= 0.0 { "+" } else { "" },
                display_decimal(avg),
                win_rate
            )),
            None => signals.push(format!(
                "The index is in Extreme Fear ({}). Not enough historical data yet to calculate returns after similar readings.",
                score_int
            )),
        }
    } else if ctx.current_score > config.greed_threshold {
        let avg = ctx
            .greed
            .filter(|z| z.episodes > 0)
            .and_then(|z| z.avg_return_30d);
        match avg {
            Some(avg) => signals.push(format!(
                "The index is in Extreme Greed ({}). Historically, the price {} an average of {}% in the 30 days following similar readings.",
                score_int,
                if avg < 0.0 { "declined" } else { "gained" },
                display_decimal(avg.abs())
            )),
            None => signals.push(format!(
                "The index is in Extreme Greed ({}). Not enough historical data yet to measure what typically follows.",
                score_int
            )),
        }
    } else if let Some(exit) = recent_exit(ctx.fear, config) {
        signals.push(exit_sentence("Extreme Fear", exit));
    } else if let Some(exit) = recent_exit(ctx.greed, config) {
        if exit.1.is_some() {
            signals.push(exit_sentence("Extreme Greed", exit));
        }
    }

    if let (Some(fear), Some(greed)) = (ctx.fear, ctx.greed) {
        if fear.episodes == 0 && greed.episodes == 0 {
            if let Some(stats) = ctx.stats {
                signals.push(format!(
                    "This index has never reached Extreme Fear or Extreme Greed. The score ranges between {} and {}, suggesting sentiment has limited impact on this market.",
                    display_decimal(stats.min),
                    display_decimal(stats.max)
                ));
            }
        } else if fear.episodes == 0 && signals.is_empty() {
            if let Some((stats, plabel)) = ctx
                .stats
                .and_then(|s| s.percentile_label.as_deref().map(|l| (s, l)))
            {
                signals.push(format!(
                    "The index is at {} ({}) — {} (P{}). The score never dropped below {} (Extreme Fear starts at {}).",
                    score_int,
                    label,
                    plabel.to_lowercase(),
                    stats.current_percentile,
                    display_decimal(stats.min),
                    config.fear_threshold
                ));
            }
        } else if greed.episodes == 0 && signals.is_empty() {
            if let Some(stats) = ctx.stats {
                signals.push(format!(
                    "The index is at {} ({}). The score never rose above {} (Extreme Greed starts at {}).",
                    score_int,
                    label,
                    display_decimal(stats.max),
                    config.greed_threshold
                ));
            }
        }
    }

    if signals.is_empty() {
        if let Some(stats) = ctx.stats {
            let pct = stats.current_percentile;
            if pct >= 90 {
                signals.push(format!(
                    "The index is at {} ({}) — higher than {}% of readings over the past 12 months.",
                    score_int, label, pct
                ));
            } else if pct <= 10 {
                signals.push(format!(
                    "The index is at {} ({}) — lower than {}% of readings over the past 12 months.",
                    score_int,
                    label,
                    100 - pct
                ));
            }
        }
    }

    if signals.is_empty() {
        if let Some(stats) = ctx.stats {
            signals.push(format!(
                "The index is at {} ({}). Over the past 12 months, it ranged from {} to {}.",
                score_int,
                label,
                display_decimal(stats.min),
                display_decimal(stats.max)
            ));
        }
    }

    signals
}

/// Days since the zone's last episode and its 60-day average, when that
/// episode falls inside the exit lookback.
fn recent_exit(zone: Option<&ZoneSummary>, config: &InsightsConfig) -> Option<(i64, Option<f64>)> {
    let zone = zone?;
    let last = zone.last.as_ref()?;
    (last.days_ago <= config.exit_lookback_days).then_some((last.days_ago, zone.avg_return_60d))
}

fn exit_sentence(zone: &str, (days_ago, avg_60d): (i64, Option<f64>)) -> String {
    match avg_60d {
        Some(avg) => format!(
            "The index exited {} {} days ago. After previous exits, the price {} {}% over 60 days on average.",
            zone,
            days_ago,
            if avg < 0.0 { "declined" } else { "gained" },
            display_decimal(avg.abs())
        ),
        None => format!("The index exited {} {} days ago.", zone, days_ago),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LastEpisode;
    use chrono::NaiveDate;

    fn zone(threshold: f64, episodes: usize) -> ZoneSummary {
        ZoneSummary {
            threshold,
            episodes,
            total_days: episodes * 3,
            avg_return_30d: None,
            avg_return_60d: None,
            avg_return_90d: None,
            win_rate_30d: None,
            median_return_30d: None,
            best_return_30d: None,
            worst_return_30d: None,
            episodes_with_30d_data: 0,
            episodes_with_60d_data: 0,
            episodes_with_90d_data: 0,
            last: None,
        }
    }

    fn stats(min: f64, max: f64, pct: u32) -> ScoreStats {
        ScoreStats {
            min,
            max,
            avg: (min + max) / 2.0,
            current: 50.0,
            current_percentile: pct,
            percentile_label: crate::score_stats::percentile_label(pct).map(str::to_string),
            distance_to_fear: min - 25.0,
            distance_to_greed: max - 75.0,
        }
    }

    fn last(days_ago: i64) -> Option<LastEpisode> {
        Some(LastEpisode {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            score: 20.0,
            price: 100.0,
            days_ago,
        })
    }

    fn run(score: f64, fear: &ZoneSummary, greed: &ZoneSummary, stats: &ScoreStats) -> Vec<String> {
        generate_signals(
            &SignalContext {
                current_score: score,
                current_label: SentimentLabel::from_score(score),
                fear: Some(fear),
                greed: Some(greed),
                stats: Some(stats),
            },
            &InsightsConfig::default(),
        )
    }

    #[test]
    fn test_active_fear_with_history() {
        let mut fear = zone(25.0, 4);
        fear.avg_return_30d = Some(12.0);
        fear.win_rate_30d = Some(75);

        let signals = run(18.4, &fear, &zone(75.0, 2), &stats(10.0, 90.0, 5));

        assert_eq!(
            signals,
            vec!["The index is in Extreme Fear (18). Historically, buying at these levels returned +12.0% over 30 days (75% success rate)."]
        );
    }

    #[test]
    fn test_active_fear_without_history() {
        let signals = run(22.0, &zone(25.0, 1), &zone(75.0, 1), &stats(10.0, 90.0, 5));
        assert_eq!(
            signals[0],
            "The index is in Extreme Fear (22). Not enough historical data yet to calculate returns after similar readings."
        );
        assert_eq!(signals.len(), 1);
    }

    #[test]
    fn test_active_greed_decline() {
        let mut greed = zone(75.0, 3);
        greed.avg_return_30d = Some(-4.2);

        let signals = run(81.6, &zone(25.0, 2), &greed, &stats(10.0, 90.0, 98));

        assert_eq!(
            signals,
            vec!["The index is in Extreme Greed (82). Historically, the price declined an average of 4.2% in the 30 days following similar readings."]
        );
    }

    #[test]
    fn test_recent_fear_exit() {
        let mut fear = zone(25.0, 2);
        fear.last = last(12);
        fear.avg_return_60d = Some(-3.0);

        let signals = run(40.0, &fear, &zone(75.0, 1), &stats(10.0, 90.0, 40));

        assert_eq!(
            signals,
            vec!["The index exited Extreme Fear 12 days ago. After previous exits, the price declined 3.0% over 60 days on average."]
        );
    }

    #[test]
    fn test_recent_greed_exit_needs_average() {
        let mut greed = zone(75.0, 2);
        greed.last = last(5);

        let signals = run(60.0, &zone(25.0, 1), &greed, &stats(10.0, 90.0, 50));

        assert_eq!(
            signals,
            vec!["The index is at 60 (Greed). Over the past 12 months, it ranged from 10.0 to 90.0."]
        );
    }

    #[test]
    fn test_never_reached_extremes() {
        let signals = run(48.0, &zone(25.0, 0), &zone(75.0, 0), &stats(38.5, 61.0, 40));

        assert_eq!(
            signals,
            vec!["This index has never reached Extreme Fear or Extreme Greed. The score ranges between 38.5 and 61.0, suggesting sentiment has limited impact on this market."]
        );
    }

    #[test]
    fn test_greed_only_market_with_percentile_label() {
        let signals = run(70.0, &zone(25.0, 0), &zone(75.0, 3), &stats(31.0, 88.0, 90));

        assert_eq!(
            signals,
            vec!["The index is at 70 (Greed) — upper range (P90). The score never dropped below 31.0 (Extreme Fear starts at 25)."]
        );
    }

    #[test]
    fn test_fear_only_market() {
        let signals = run(50.0, &zone(25.0, 2), &zone(75.0, 0), &stats(8.0, 70.0, 50));

        assert_eq!(
            signals,
            vec!["The index is at 50 (Neutral). The score never rose above 70.0 (Extreme Greed starts at 75)."]
        );
    }

    #[test]
    fn test_percentile_extremes() {
        let high = run(70.0, &zone(25.0, 1), &zone(75.0, 1), &stats(10.0, 90.0, 92));
        assert_eq!(
            high,
            vec!["The index is at 70 (Greed) — higher than 92% of readings over the past 12 months."]
        );

        let low = run(30.0, &zone(25.0, 1), &zone(75.0, 1), &stats(10.0, 90.0, 8));
        assert_eq!(
            low,
            vec!["The index is at 30 (Fear) — lower than 92% of readings over the past 12 months."]
        );
    }

    #[test]
    fn test_no_backtest_falls_back_to_range() {
        let stats = stats(20.0, 80.0, 50);
        let signals = generate_signals(
            &SignalContext {
                current_score: 52.5,
                current_label: SentimentLabel::Neutral,
                fear: None,
                greed: None,
                stats: Some(&stats),
            },
            &InsightsConfig::default(),
        );

        assert_eq!(
            signals,
            vec!["The index is at 52 (Neutral). Over the past 12 months, it ranged from 20.0 to 80.0."]
        );
    }
}
