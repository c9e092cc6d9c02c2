use chrono::{DateTime, NaiveDate, Utc};
use sentiment_core::stats::round_to;
use sentiment_core::{
    AlignedPoint, DataError, IndexDocument, LongHistoryDocument, Market, PriceMap, ScoreHistory,
    SentimentLabel,
};

use crate::aligner::{align, align_embedded};
use crate::correlation::correlate;
use crate::episodes::{compute_returns, days_in_zone, find_episodes};
use crate::models::{Direction, InsightsConfig, InsightsReport, LastEpisode, ZoneSummary, HORIZONS};
use crate::score_stats::compute_score_stats;
use crate::signals::{generate_signals, SignalContext};

/// The raw inputs of one report.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub market: Market,
    /// Every stored score; drives the distribution stats.
    pub history: &'a ScoreHistory,
    /// Priced days; drives correlation and the backtests.
    pub aligned: &'a [AlignedPoint],
    pub current_score: f64,
    pub current_label: SentimentLabel,
}

/// Assemble the insights report. Pure: `updated` is both the stamp written
/// to the report and the date `days_ago` is measured against.
pub fn build_report(input: &ReportInput<'_>, updated: DateTime<Utc>, config: &InsightsConfig) -> InsightsReport {
    let market_config = input.market.config();
    let as_of = updated.date_naive();
    let sufficient = input.aligned.len() >= config.min_sample;
    if !sufficient {
        tracing::warn!(
            "{}: only {} aligned points, statistics need {}",
            input.market,
            input.aligned.len(),
            config.min_sample
        );
    }

    let correlation = correlate(input.aligned, config.recent_window);
    let score_stats = compute_score_stats(&input.history.scores(), input.current_score, config);

    let (extreme_fear, extreme_greed) = if sufficient {
        (
            Some(zone_summary(input.aligned, config.fear_threshold, Direction::Below, as_of)),
            Some(zone_summary(input.aligned, config.greed_threshold, Direction::Above, as_of)),
        )
    } else {
        (None, None)
    };

    let signals = generate_signals(
        &SignalContext {
            current_score: input.current_score,
            current_label: input.current_label,
            fear: extreme_fear.as_ref(),
            greed: extreme_greed.as_ref(),
            stats: score_stats.as_ref(),
        },
        config,
    );

    tracing::info!(
        "{}: r_90d={:?} r_full={:?}, fear episodes={}, greed episodes={}, {} signals",
        input.market,
        correlation.r_90d,
        correlation.r_full,
        extreme_fear.as_ref().map_or(0, |z| z.episodes),
        extreme_greed.as_ref().map_or(0, |z| z.episodes),
        signals.len()
    );

    InsightsReport {
        updated,
        asset: input.market,
        price_symbol: market_config.price_symbol.to_string(),
        price_label: market_config.price_label.to_string(),
        correlation,
        score_stats,
        extreme_fear,
        extreme_greed,
        signals,
    }
}

/// Backtest of one extreme zone over the aligned series.
pub fn zone_summary(
    aligned: &[AlignedPoint],
    threshold: f64,
    direction: Direction,
    as_of: NaiveDate,
) -> ZoneSummary {
    let episodes = find_episodes(aligned, threshold, direction);
    let returns = compute_returns(&episodes, aligned, &HORIZONS);
    let [h30, h60, h90] = HORIZONS.map(|h| returns.get(&h).cloned().unwrap_or_default());

    let last = episodes.last().map(|ep| LastEpisode {
        date: ep.date,
        score: round_to(ep.score, 1),
        price: ep.price,
        days_ago: (as_of - ep.date).num_days(),
    });

    ZoneSummary {
        threshold,
        episodes: episodes.len(),
        total_days: days_in_zone(aligned, threshold, direction),
        avg_return_30d: h30.avg,
        avg_return_60d: h60.avg,
        avg_return_90d: h90.avg,
        win_rate_30d: h30.win_rate,
        median_return_30d: h30.median,
        best_return_30d: h30.best,
        worst_return_30d: h30.worst,
        episodes_with_30d_data: h30.count,
        episodes_with_60d_data: h60.count,
        episodes_with_90d_data: h90.count,
        last,
    }
}

/// Report from the daily sidecar plus an external price map.
pub fn report_from_sidecar(
    market: Market,
    document: &IndexDocument,
    prices: &PriceMap,
    updated: DateTime<Utc>,
    config: &InsightsConfig,
) -> InsightsReport {
    let aligned = align(&document.history, prices);
    tracing::debug!(
        "{}: {} history days, {} prices, {} aligned",
        market,
        document.history.len(),
        prices.len(),
        aligned.len()
    );

    build_report(
        &ReportInput {
            market,
            history: &document.history,
            aligned: &aligned,
            current_score: document.score,
            current_label: document.label,
        },
        updated,
        config,
    )
}

/// Report from the five-year rebuild, whose entries carry their own prices.
/// The current reading is the last history entry.
pub fn report_from_long_history(
    document: &LongHistoryDocument,
    updated: DateTime<Utc>,
    config: &InsightsConfig,
) -> Result<InsightsReport, DataError> {
    let current = document.history.latest().ok_or_else(|| {
        DataError::InsufficientData(format!("{}: five-year history is empty", document.asset))
    })?;
    let aligned = align_embedded(&document.history);

    Ok(build_report(
        &ReportInput {
            market: document.asset,
            history: &document.history,
            aligned: &aligned,
            current_score: current.score,
            current_label: current.label,
        },
        updated,
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use sentiment_core::ScoreRecord;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_zone_summary_last_episode() {
        let start = d("2025-01-01");
        let aligned: Vec<AlignedPoint> = [40.0, 20.04, 22.0, 40.0, 18.0, 40.0]
            .iter()
            .enumerate()
            .map(|(i, &score)| AlignedPoint {
                date: start + Duration::days(i as i64),
                score,
                price: 100.0 + i as f64,
            })
            .collect();

        let zone = zone_summary(&aligned, 25.0, Direction::Below, d("2025-01-15"));

        assert_eq!(zone.episodes, 2);
        assert_eq!(zone.total_days, 3);
        assert_eq!(zone.episodes_with_30d_data, 0);
        assert_eq!(zone.avg_return_30d, None);
        let last = zone.last.unwrap();
        assert_eq!(last.date, d("2025-01-05"));
        assert_eq!(last.score, 18.0);
        assert_eq!(last.price, 104.0);
        assert_eq!(last.days_ago, 10);
    }

    #[test]
    fn test_short_series_reports_insufficient() {
        let history = ScoreHistory::from_records(vec![
            ScoreRecord::new(d("2025-01-01"), 20.0, Some(100.0)),
            ScoreRecord::new(d("2025-01-02"), 90.0, Some(110.0)),
        ]);
        let doc = LongHistoryDocument::build(
            Market::Crypto,
            history,
            Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap(),
        );

        let report = report_from_long_history(
            &doc,
            Utc.with_ymd_and_hms(2025, 1, 3, 6, 0, 0).unwrap(),
            &InsightsConfig::default(),
        )
        .unwrap();

        assert_eq!(report.correlation.r_full, None);
        assert_eq!(report.correlation.label_90d, "Insufficient data");
        assert_eq!(report.extreme_fear, None);
        assert_eq!(report.extreme_greed, None);
        assert_eq!(report.score_stats.as_ref().unwrap().current, 90.0);
        assert_eq!(report.price_label, "BTC");
        assert_eq!(
            report.signals,
            vec!["The index is in Extreme Greed (90). Not enough historical data yet to measure what typically follows."]
        );
    }

    #[test]
    fn test_empty_long_history_is_error() {
        let doc = LongHistoryDocument::build(
            Market::Gold,
            ScoreHistory::new(),
            Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap(),
        );

        let err = report_from_long_history(&doc, Utc::now(), &InsightsConfig::default()).unwrap_err();
        assert!(matches!(err, DataError::InsufficientData(_)));
    }
}
