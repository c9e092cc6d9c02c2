use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::components::IndexWeights;
use crate::DataError;

/// Score substituted whenever upstream data is missing or erroring.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Retention for the rolling daily sidecar history.
pub const ROLLING_WINDOW: usize = 365;

/// Retention for the five-year rebuild.
pub const LONG_WINDOW: usize = 5 * 365;

/// Clamp a raw score into the 0-100 index range. NaN collapses to neutral.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return NEUTRAL_SCORE;
    }
    score.clamp(0.0, 100.0)
}

/// Price-by-date mapping supplied by a price-history provider.
pub type PriceMap = BTreeMap<NaiveDate, f64>;

/// Categorical bucket of a 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
    #[serde(rename = "Fear")]
    Fear,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Greed")]
    Greed,
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s <= 25.0 => SentimentLabel::ExtremeFear,
            s if s <= 45.0 => SentimentLabel::Fear,
            s if s <= 55.0 => SentimentLabel::Neutral,
            s if s <= 75.0 => SentimentLabel::Greed,
            _ => SentimentLabel::ExtremeGreed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::ExtremeFear => "Extreme Fear",
            SentimentLabel::Fear => "Fear",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Greed => "Greed",
            SentimentLabel::ExtremeGreed => "Extreme Greed",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four markets an index is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Gold,
    Bonds,
    Stocks,
    Crypto,
}

/// Static per-market settings: file names, price instrument and weights.
#[derive(Debug, Clone, Copy)]
pub struct MarketConfig {
    pub market: Market,
    pub price_symbol: &'static str,
    pub price_label: &'static str,
    pub price_key: &'static str,
    pub weights: IndexWeights,
}

impl Market {
    pub const ALL: [Market; 4] = [Market::Crypto, Market::Gold, Market::Stocks, Market::Bonds];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Gold => "gold",
            Market::Bonds => "bonds",
            Market::Stocks => "stocks",
            Market::Crypto => "crypto",
        }
    }

    pub fn config(&self) -> MarketConfig {
        match self {
            Market::Gold => MarketConfig {
                market: *self,
                price_symbol: "GLD",
                price_label: "GLD",
                price_key: "gld",
                weights: IndexWeights::GOLD,
            },
            Market::Bonds => MarketConfig {
                market: *self,
                price_symbol: "TLT",
                price_label: "TLT",
                price_key: "tlt",
                weights: IndexWeights::BONDS,
            },
            Market::Stocks => MarketConfig {
                market: *self,
                price_symbol: "SPY",
                price_label: "SPY",
                price_key: "spy",
                weights: IndexWeights::STOCKS,
            },
            Market::Crypto => MarketConfig {
                market: *self,
                price_symbol: "BTC-USD",
                price_label: "BTC",
                price_key: "btc",
                weights: IndexWeights::CRYPTO,
            },
        }
    }

    /// Daily sidecar written by the market's calculator.
    pub fn index_file(&self) -> String {
        format!("{}-fear-greed.json", self.as_str())
    }

    pub fn long_history_file(&self) -> String {
        format!("history-5y-{}.json", self.as_str())
    }

    pub fn price_file(&self) -> String {
        format!("prices-{}.json", self.config().price_key)
    }

    pub fn insights_file(&self, long_history: bool) -> String {
        if long_history {
            format!("insights-5y-{}.json", self.as_str())
        } else {
            format!("insights-{}.json", self.as_str())
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gold" => Ok(Market::Gold),
            "bonds" => Ok(Market::Bonds),
            "stocks" => Ok(Market::Stocks),
            "crypto" => Ok(Market::Crypto),
            other => Err(DataError::InvalidData(format!("unknown market '{}'", other))),
        }
    }
}

/// One day of an index: the atomic unit of history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct ScoreRecord {
    pub date: NaiveDate,
    pub score: f64,
    pub label: SentimentLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl ScoreRecord {
    /// Build a record, clamping the score and deriving its label.
    pub fn new(date: NaiveDate, score: f64, price: Option<f64>) -> Self {
        let score = clamp_score(score);
        Self {
            date,
            score,
            label: SentimentLabel::from_score(score),
            price: price.filter(|p| p.is_finite() && *p > 0.0),
        }
    }

    pub fn neutral(date: NaiveDate) -> Self {
        Self::new(date, NEUTRAL_SCORE, None)
    }
}

/// On-disk shape of a history entry. Some producers omit `label`, so any
/// stored label is ignored and recomputed from `score`.
#[derive(Debug, Deserialize)]
struct StoredRecord {
    date: NaiveDate,
    score: f64,
    #[serde(default)]
    price: Option<f64>,
}

impl From<StoredRecord> for ScoreRecord {
    fn from(stored: StoredRecord) -> Self {
        ScoreRecord::new(stored.date, stored.score, stored.price)
    }
}

/// Date-ordered, date-unique sequence of records for one market.
///
/// Held ascending in memory. Every constructor sorts and deduplicates, so the
/// invariants hold for anything deserialized as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ScoreRecord>", into = "Vec<ScoreRecord>")]
pub struct ScoreHistory {
    records: Vec<ScoreRecord>,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by date and collapse duplicate dates, keeping the record that
    /// appears last in `records` (the latest calculated one).
    pub fn from_records(mut records: Vec<ScoreRecord>) -> Self {
        records.sort_by_key(|r| r.date);

        let mut deduped: Vec<ScoreRecord> = Vec::with_capacity(records.len());
        for record in records {
            match deduped.last_mut() {
                Some(last) if last.date == record.date => *last = record,
                _ => deduped.push(record),
            }
        }

        Self { records: deduped }
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoreRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&ScoreRecord> {
        self.records.first()
    }

    pub fn latest(&self) -> Option<&ScoreRecord> {
        self.records.last()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ScoreRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// The latest record dated `date` or earlier.
    pub fn on_or_before(&self, date: NaiveDate) -> Option<&ScoreRecord> {
        let idx = self.records.partition_point(|r| r.date <= date);
        idx.checked_sub(1).map(|i| &self.records[i])
    }

    pub fn scores(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.score).collect()
    }

    /// Drop everything but the most recent `window` records. Returns how many
    /// records were removed.
    pub fn keep_most_recent(&mut self, window: usize) -> usize {
        let excess = self.records.len().saturating_sub(window);
        if excess > 0 {
            self.records.drain(..excess);
        }
        excess
    }

    /// Drop records dated before `cutoff`. Returns how many were removed.
    pub fn retain_since(&mut self, cutoff: NaiveDate) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.date >= cutoff);
        before - self.records.len()
    }

    pub fn into_records(self) -> Vec<ScoreRecord> {
        self.records
    }
}

impl From<Vec<ScoreRecord>> for ScoreHistory {
    fn from(records: Vec<ScoreRecord>) -> Self {
        ScoreHistory::from_records(records)
    }
}

impl From<ScoreHistory> for Vec<ScoreRecord> {
    fn from(history: ScoreHistory) -> Self {
        history.records
    }
}

impl<'a> IntoIterator for &'a ScoreHistory {
    type Item = &'a ScoreRecord;
    type IntoIter = std::slice::Iter<'a, ScoreRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A day where both a sentiment score and a market price exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedPoint {
    pub date: NaiveDate,
    pub score: f64,
    pub price: f64,
}

/// What a score source produces for a single date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDay {
    pub score: f64,
    pub price: Option<f64>,
}
