use sentiment_core::{AlignedPoint, PriceMap, ScoreHistory};

/// Inner-join a score history with a price map by date.
///
/// Days without a usable price (weekends, holidays) are dropped. Output keeps
/// the history's ascending order.
pub fn align(history: &ScoreHistory, prices: &PriceMap) -> Vec<AlignedPoint> {
    history
        .iter()
        .filter_map(|record| {
            let price = prices.get(&record.date).copied().filter(|&p| usable_price(p));
            price.map(|price| AlignedPoint {
                date: record.date,
                score: record.score,
                price,
            })
        })
        .collect()
}

/// Aligned series from a history that carries its own prices.
pub fn align_embedded(history: &ScoreHistory) -> Vec<AlignedPoint> {
    history
        .iter()
        .filter_map(|record| {
            record.price.filter(|&p| usable_price(p)).map(|price| AlignedPoint {
                date: record.date,
                score: record.score,
                price,
            })
        })
        .collect()
}

fn usable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}
