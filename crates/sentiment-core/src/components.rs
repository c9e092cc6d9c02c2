//! Weighted combination of component sub-scores into one index value.
//!
//! Component formulas live with the data fetchers; this module only sees their
//! outcome as `Result<ComponentReading, DataError>`. Any error becomes the
//! neutral fallback so a single failed fetch never aborts an index run.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::stats::round_to;
use crate::types::{clamp_score, SentimentLabel, NEUTRAL_SCORE};
use crate::DataError;

/// Detail text recorded for a component that fell back to neutral.
pub const UNAVAILABLE_DETAIL: &str = "Data unavailable";

/// Immutable weight table for one market's components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexWeights {
    pub components: &'static [(&'static str, f64)],
}

impl IndexWeights {
    pub const GOLD: IndexWeights = IndexWeights {
        components: &[
            ("gld_price", 0.30),
            ("momentum", 0.25),
            ("dollar_index", 0.20),
            ("real_rates", 0.15),
            ("vix", 0.10),
        ],
    };

    pub const BONDS: IndexWeights = IndexWeights {
        components: &[
            ("yield_curve", 0.30),
            ("duration_risk", 0.25),
            ("real_yields", 0.20),
            ("credit_quality", 0.15),
            ("term_premium", 0.10),
        ],
    };

    pub const STOCKS: IndexWeights = IndexWeights {
        components: &[
            ("momentum", 0.25),
            ("vix", 0.20),
            ("market_breadth", 0.15),
            ("junk_bonds", 0.15),
            ("safe_haven", 0.15),
            ("price_strength", 0.10),
        ],
    };

    pub const CRYPTO: IndexWeights = IndexWeights {
        components: &[
            ("momentum", 0.10),
            ("context", 0.35),
            ("volatility", 0.15),
            ("dominance", 0.25),
            ("price_momentum", 0.15),
        ],
    };

    pub fn total(&self) -> f64 {
        self.components.iter().map(|(_, w)| w).sum()
    }

    pub fn weight_of(&self, key: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, w)| *w)
    }
}

/// A successfully computed component sub-score.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentReading {
    pub score: f64,
    pub detail: String,
}

impl ComponentReading {
    pub fn new(score: f64, detail: impl Into<String>) -> Self {
        Self {
            score,
            detail: detail.into(),
        }
    }
}

/// One entry of the sidecar `components` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub score: f64,
    pub weight: f64,
    pub detail: String,
}

/// Result of combining all components of an index.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    pub score: f64,
    pub label: SentimentLabel,
    pub components: BTreeMap<String, ComponentSnapshot>,
    /// Components that fell back to neutral.
    pub unavailable: Vec<String>,
}

impl CompositeScore {
    pub fn components_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.components).unwrap_or(serde_json::Value::Null)
    }
}

/// Combine component readings with the market's weights.
///
/// Components missing from `readings` count as unavailable. Readings for keys
/// the weight table does not know are ignored.
pub fn combine<I>(weights: &IndexWeights, readings: I) -> CompositeScore
where
    I: IntoIterator<Item = (String, Result<ComponentReading, DataError>)>,
{
    let mut by_key: HashMap<String, Result<ComponentReading, DataError>> =
        readings.into_iter().collect();

    let mut components = BTreeMap::new();
    let mut unavailable = Vec::new();
    let mut weighted_sum = 0.0;

    for (key, weight) in weights.components {
        let reading = by_key
            .remove(*key)
            .unwrap_or_else(|| Err(DataError::Unavailable(format!("no reading for {}", key))));

        let (score, detail) = match reading {
            Ok(reading) => (clamp_score(reading.score), reading.detail),
            Err(e) => {
                tracing::warn!("Component {} fell back to neutral: {}", key, e);
                unavailable.push(key.to_string());
                (NEUTRAL_SCORE, UNAVAILABLE_DETAIL.to_string())
            }
        };

        weighted_sum += score * weight;
        components.insert(
            key.to_string(),
            ComponentSnapshot {
                score: round_to(score, 1),
                weight: *weight,
                detail,
            },
        );
    }

    for key in by_key.keys() {
        tracing::debug!("Ignoring reading for unknown component {}", key);
    }

    let total = weights.total();
    let score = if total > 0.0 {
        round_to(clamp_score(weighted_sum / total), 1)
    } else {
        NEUTRAL_SCORE
    };

    CompositeScore {
        score,
        label: SentimentLabel::from_score(score),
        components,
        unavailable,
    }
}
