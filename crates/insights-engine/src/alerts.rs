//! Zone-change detection across the four indices and the composite
//! risk-on/risk-off sentiment.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sentiment_core::stats::{round_int, round_to};
use sentiment_core::{IndexDocument, Market, ScoreHistory, SentimentLabel};

/// Key of the composite sentiment in the alert state files.
pub const SENTIMENT_KEY: &str = "sentiment";

/// Minimum score move that must accompany a zone change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertConfig {
    pub asset_delta: f64,
    pub sentiment_delta: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            asset_delta: 7.0,
            sentiment_delta: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub score: f64,
    pub label: SentimentLabel,
}

/// Labels and scores of the previous run, keyed by market name or
/// [`SENTIMENT_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub labels: BTreeMap<String, SentimentLabel>,
    pub scores: BTreeMap<String, f64>,
}

impl AlertState {
    pub fn from_snapshots(snapshots: &BTreeMap<String, IndexSnapshot>) -> Self {
        Self {
            labels: snapshots.iter().map(|(k, s)| (k.clone(), s.label)).collect(),
            scores: snapshots.iter().map(|(k, s)| (k.clone(), s.score)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneChange {
    pub key: String,
    pub score: f64,
    pub old_label: SentimentLabel,
    pub new_label: SentimentLabel,
    pub delta: Option<f64>,
    pub context: Option<String>,
}

/// Label of a score as alerts see it: the score is rounded first.
pub fn alert_label(score: f64) -> SentimentLabel {
    SentimentLabel::from_score(round_int(score) as f64)
}

/// Risk-on (stocks, crypto) minus risk-off (bonds, gold), mapped onto 0-100.
/// `None` unless all four markets are present.
pub fn composite_sentiment(scores: &BTreeMap<Market, f64>) -> Option<f64> {
    let score = |m: Market| scores.get(&m).copied();
    let risk_on = (score(Market::Stocks)? + score(Market::Crypto)?) / 2.0;
    let risk_off = (score(Market::Bonds)? + score(Market::Gold)?) / 2.0;
    Some(round_to((risk_on - risk_off + 100.0) / 200.0 * 100.0, 1))
}

/// Current snapshot of every loaded sidecar, plus the composite when all four
/// markets are available.
pub fn current_snapshots(documents: &BTreeMap<Market, IndexDocument>) -> BTreeMap<String, IndexSnapshot> {
    let mut snapshots: BTreeMap<String, IndexSnapshot> = documents
        .iter()
        .map(|(market, doc)| {
            (
                market.as_str().to_string(),
                IndexSnapshot {
                    score: doc.score,
                    label: doc.label,
                },
            )
        })
        .collect();

    let scores: BTreeMap<Market, f64> = documents.iter().map(|(m, doc)| (*m, doc.score)).collect();
    if let Some(score) = composite_sentiment(&scores) {
        snapshots.insert(
            SENTIMENT_KEY.to_string(),
            IndexSnapshot {
                score,
                label: alert_label(score),
            },
        );
    }

    snapshots
}

/// Indices whose zone changed since `previous` by at least the configured
/// score delta. The first run (no previous label) never alerts.
pub fn find_zone_changes(
    current: &BTreeMap<String, IndexSnapshot>,
    previous: &AlertState,
    histories: &BTreeMap<Market, ScoreHistory>,
    today: NaiveDate,
    config: &AlertConfig,
) -> Vec<ZoneChange> {
    let mut changes = Vec::new();

    for (key, snapshot) in current {
        let Some(&old_label) = previous.labels.get(key) else {
            continue;
        };
        if old_label == snapshot.label {
            continue;
        }

        let threshold = if key == SENTIMENT_KEY {
            config.sentiment_delta
        } else {
            config.asset_delta
        };
        let delta = previous.scores.get(key).map(|prev| (snapshot.score - prev).abs());
        if let Some(delta) = delta.filter(|d| *d < threshold) {
            tracing::info!(
                "Skip {}: zone changed ({} -> {}) but delta {:.1} < {}",
                key,
                old_label,
                snapshot.label,
                delta,
                threshold
            );
            continue;
        }

        let context = key
            .parse::<Market>()
            .ok()
            .and_then(|market| histories.get(&market))
            .and_then(|history| zone_context(history, snapshot.label, today));

        changes.push(ZoneChange {
            key: key.clone(),
            score: snapshot.score,
            old_label,
            new_label: snapshot.label,
            delta,
            context,
        });
    }

    changes
}

/// When the market was last in `new_label`'s zone, ignoring the newest record.
pub fn zone_context(history: &ScoreHistory, new_label: SentimentLabel, today: NaiveDate) -> Option<String> {
    if history.len() < 2 {
        return None;
    }

    let last_seen = history
        .iter()
        .rev()
        .skip(1)
        .find(|r| alert_label(r.score) == new_label)
        .map(|r| r.date);

    let Some(date) = last_seen else {
        return Some(format!("First time in {} in over a year.", new_label));
    };

    let days_ago = (today - date).num_days();
    match days_ago {
        d if d <= 1 => None,
        d if d < 7 => Some(format!("Was in {} {} days ago.", new_label, d)),
        d if d < 60 => {
            let weeks = d / 7;
            Some(format!(
                "Last time in {}: {} week{} ago.",
                new_label,
                weeks,
                if weeks > 1 { "s" } else { "" }
            ))
        }
        _ => Some(format!("Last time in {}: {}.", new_label, date.format("%B %d, %Y"))),
    }
}
