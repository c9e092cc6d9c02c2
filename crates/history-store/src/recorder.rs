//! The persistence step every index calculator ends with.

use chrono::{DateTime, NaiveDate, Utc};
use sentiment_core::{
    CompositeScore, HistoryRepository, IndexDocument, Market, ScoreRecord, ScoreSource, StoreError,
};

use crate::store::HistoryStore;

/// Load `market`'s sidecar, upsert the day's reading and write it back whole.
///
/// A missing sidecar starts an empty history. A malformed one is logged and
/// replaced rather than blocking the day's update.
pub fn record_reading<R>(
    repo: &R,
    market: Market,
    store: &HistoryStore,
    composite: &CompositeScore,
    date: NaiveDate,
    price: Option<f64>,
    timestamp: DateTime<Utc>,
) -> Result<IndexDocument, StoreError>
where
    R: HistoryRepository + ?Sized,
{
    let existing = load_or_replace(repo, market)?;

    let today = ScoreRecord::new(date, composite.score, price);
    let document = match existing {
        Some(mut document) => {
            document.history = store.upsert(&document.history, today);
            document.apply(composite, timestamp);
            document
        }
        None => {
            let history = store.upsert(&Default::default(), today);
            IndexDocument::new(composite, history, timestamp)
        }
    };

    repo.save(market, &document)?;
    tracing::info!(
        "{}: recorded {} ({}) for {}, {} unavailable components",
        market,
        composite.score,
        composite.label,
        date,
        composite.unavailable.len()
    );
    Ok(document)
}

/// Recompute `market`'s history for `dates` and persist it, keeping the
/// sidecar's headline reading when one exists.
///
/// The headline is the live reading, so it also becomes the record for the
/// day of `timestamp` when the rebuilt window covers that day.
pub fn rebuild_history<R, S>(
    repo: &R,
    market: Market,
    store: &HistoryStore,
    dates: &[NaiveDate],
    source: &S,
    timestamp: DateTime<Utc>,
) -> Result<IndexDocument, StoreError>
where
    R: HistoryRepository + ?Sized,
    S: ScoreSource + ?Sized,
{
    tracing::info!("{}: rebuilding {} days of history", market, dates.len());
    let mut history = store.force_rebuild(dates, source);
    let today = timestamp.date_naive();

    let document = match load_or_replace(repo, market)? {
        Some(mut document) => {
            if let Some(price) = history.get(today).map(|r| r.price) {
                history = store.upsert(&history, ScoreRecord::new(today, document.score, price));
            }
            document.history = history;
            document
        }
        None => IndexDocument::from_history(history, timestamp),
    };

    repo.save(market, &document)?;
    Ok(document)
}

fn load_or_replace<R>(repo: &R, market: Market) -> Result<Option<IndexDocument>, StoreError>
where
    R: HistoryRepository + ?Sized,
{
    match repo.load(market) {
        Ok(document) => Ok(document),
        Err(StoreError::Malformed { path, source }) => {
            tracing::warn!("{}: replacing malformed sidecar {}: {}", market, path, source);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
