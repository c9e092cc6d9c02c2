use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::components::CompositeScore;
use crate::stats::{mean, round_to};
use crate::types::{Market, ScoreHistory, SentimentLabel, LONG_WINDOW, NEUTRAL_SCORE};

/// The per-market sidecar written by an index calculator and read by every
/// downstream consumer.
///
/// History is written newest-first because consumers treat `history[0]` as the
/// latest day; in memory it is the usual ascending [`ScoreHistory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub score: f64,
    pub label: SentimentLabel,
    #[serde(with = "utc_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub components: serde_json::Value,
    #[serde(default, with = "newest_first")]
    pub history: ScoreHistory,
    /// Fields written by other producers, preserved on round-trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IndexDocument {
    pub fn new(composite: &CompositeScore, history: ScoreHistory, timestamp: DateTime<Utc>) -> Self {
        Self {
            score: composite.score,
            label: composite.label,
            timestamp,
            components: composite.components_json(),
            history,
            extra: serde_json::Map::new(),
        }
    }

    /// Document whose headline is the latest history record (neutral when the
    /// history is empty). Used when a rebuild runs before any calculator did.
    pub fn from_history(history: ScoreHistory, timestamp: DateTime<Utc>) -> Self {
        let (score, label) = history
            .latest()
            .map(|r| (r.score, r.label))
            .unwrap_or((NEUTRAL_SCORE, SentimentLabel::Neutral));
        Self {
            score,
            label,
            timestamp,
            components: serde_json::Value::Null,
            history,
            extra: serde_json::Map::new(),
        }
    }

    /// Replace the headline reading, keeping history and extra fields.
    pub fn apply(&mut self, composite: &CompositeScore, timestamp: DateTime<Utc>) {
        self.score = composite.score;
        self.label = composite.label;
        self.timestamp = timestamp;
        self.components = composite.components_json();
    }
}

mod newest_first {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::ScoreHistory;

    pub fn serialize<S: Serializer>(history: &ScoreHistory, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(history.records().iter().rev())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ScoreHistory, D::Error> {
        ScoreHistory::deserialize(deserializer)
    }
}

/// Timestamps are written as `YYYY-MM-DDTHH:MM:SSZ`. Older producers wrote
/// naive local ISO strings; those are read as UTC.
pub mod utc_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format("%Y-%m-%dT%H:%M:%SZ"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

impl SummaryStats {
    pub fn of(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            min: Some(round_to(min, 1)),
            max: Some(round_to(max, 1)),
            avg: mean(scores).map(|m| round_to(m, 1)),
        }
    }
}

/// Five-year rebuild artifact: ascending history with prices embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongHistoryDocument {
    pub asset: Market,
    pub generated: DateTime<Utc>,
    pub total_days: usize,
    pub date_range: DateRange,
    pub score_stats: SummaryStats,
    pub history: ScoreHistory,
}

impl LongHistoryDocument {
    /// Build the document, dropping records older than five years before
    /// `generated`.
    pub fn build(asset: Market, mut history: ScoreHistory, generated: DateTime<Utc>) -> Self {
        let cutoff = generated.date_naive() - Duration::days(LONG_WINDOW as i64);
        let dropped = history.retain_since(cutoff);
        if dropped > 0 {
            tracing::debug!("{}: dropped {} records older than {}", asset, dropped, cutoff);
        }

        Self {
            asset,
            generated,
            total_days: history.len(),
            date_range: DateRange {
                start: history.first().map(|r| r.date),
                end: history.latest().map(|r| r.date),
            },
            score_stats: SummaryStats::of(&history.scores()),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{combine, IndexWeights};
    use crate::types::ScoreRecord;
    use chrono::TimeZone;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_index_document_writes_newest_first() {
        let history = ScoreHistory::from_records(vec![
            ScoreRecord::new(d("2025-01-01"), 20.0, Some(100.0)),
            ScoreRecord::new(d("2025-01-02"), 90.0, None),
        ]);
        let composite = combine(&IndexWeights::GOLD, Vec::new());
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 6, 0, 0).unwrap();
        let doc = IndexDocument::new(&composite, history, ts);

        let value = serde_json::to_value(&doc).unwrap();
        let entries = value["history"].as_array().unwrap();
        assert_eq!(entries[0]["date"], "2025-01-02");
        assert_eq!(entries[0]["label"], "Extreme Greed");
        assert!(entries[0].get("price").is_none());
        assert_eq!(entries[1]["price"], 100.0);
        assert_eq!(value["label"], "Neutral");

        let back: IndexDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back.history.first().unwrap().date, d("2025-01-01"));
        assert_eq!(back, doc);
    }

    #[test]
    fn test_index_document_preserves_unknown_fields() {
        let json = r#"{
            "score": 41.2,
            "label": "Fear",
            "timestamp": "2025-03-01T10:00:00Z",
            "components": {"vix": {"score": 40.0, "weight": 0.1, "detail": "x"}},
            "version": 2,
            "history": [{"date": "2025-03-01", "score": 41.2}]
        }"#;
        let doc: IndexDocument = serde_json::from_str(json).unwrap();

        assert_eq!(doc.extra["version"], 2);
        assert_eq!(doc.history.len(), 1);
        let out = serde_json::to_value(&doc).unwrap();
        assert_eq!(out["version"], 2);
        assert_eq!(out["timestamp"], "2025-03-01T10:00:00Z");
    }

    #[test]
    fn test_naive_timestamp_is_read_as_utc() {
        let json = r#"{"score": 50, "label": "Neutral", "timestamp": "2025-03-01T10:00:00.482913"}"#;
        let doc: IndexDocument = serde_json::from_str(json).unwrap();

        assert_eq!(doc.timestamp.date_naive(), d("2025-03-01"));
        assert!(doc.history.is_empty());
    }

    #[test]
    fn test_long_history_trims_to_five_years() {
        let generated = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let history = ScoreHistory::from_records(vec![
            ScoreRecord::new(d("2019-01-01"), 10.0, Some(50.0)),
            ScoreRecord::new(d("2024-01-01"), 30.0, Some(60.0)),
            ScoreRecord::new(d("2025-05-31"), 80.0, Some(70.0)),
        ]);

        let doc = LongHistoryDocument::build(Market::Gold, history, generated);

        assert_eq!(doc.total_days, 2);
        assert_eq!(doc.date_range.start, Some(d("2024-01-01")));
        assert_eq!(doc.date_range.end, Some(d("2025-05-31")));
        assert_eq!(doc.score_stats.min, Some(30.0));
        assert_eq!(doc.score_stats.max, Some(80.0));
        assert_eq!(doc.score_stats.avg, Some(55.0));

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["asset"], "gold");
        assert_eq!(value["history"][0]["date"], "2024-01-01");
    }
}
