use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sentiment_core::{PriceMap, StoreError};

use crate::repository::read_json;

/// One close price as written by the price exporter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Price files come either as `[{date, price}, ...]` or as `{date: price}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceFile {
    Points(Vec<PricePoint>),
    Map(BTreeMap<NaiveDate, f64>),
}

/// Load a price file into a date-keyed map.
///
/// A missing file yields an empty map, which downstream alignment turns into
/// "insufficient data". Non-positive and non-finite prices are dropped.
pub fn load_price_map(path: &Path) -> Result<PriceMap, StoreError> {
    let Some(file) = read_json::<PriceFile>(path)? else {
        tracing::warn!("No price file at {}", path.display());
        return Ok(PriceMap::new());
    };

    let raw: Vec<(NaiveDate, f64)> = match file {
        PriceFile::Points(points) => points.into_iter().map(|p| (p.date, p.price)).collect(),
        PriceFile::Map(map) => map.into_iter().collect(),
    };

    let total = raw.len();
    let prices: PriceMap = raw
        .into_iter()
        .filter(|(_, price)| price.is_finite() && *price > 0.0)
        .collect();

    if prices.len() < total {
        tracing::debug!(
            "{}: dropped {} invalid prices",
            path.display(),
            total - prices.len()
        );
    }

    Ok(prices)
}
