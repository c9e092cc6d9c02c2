use chrono::NaiveDate;

use crate::{DataError, IndexDocument, Market, ScoreHistory, ScoredDay, StoreError};

/// Storage for the per-market sidecar documents.
///
/// The computation code only talks to this trait, so locking, atomic writes or
/// a different backing store stay an implementation detail. Callers guarantee
/// at most one writer per market at a time.
pub trait HistoryRepository: Send + Sync {
    /// Load a market's sidecar. `Ok(None)` when none has been written yet.
    fn load(&self, market: Market) -> Result<Option<IndexDocument>, StoreError>;

    /// Replace a market's sidecar as a whole.
    fn save(&self, market: Market, document: &IndexDocument) -> Result<(), StoreError>;

    /// Load only the history, empty when no sidecar exists.
    fn load_history(&self, market: Market) -> Result<ScoreHistory, StoreError> {
        Ok(self
            .load(market)?
            .map(|doc| doc.history)
            .unwrap_or_default())
    }
}

/// Produces a score for an arbitrary past date, used by full rebuilds.
pub trait ScoreSource {
    fn score_on(&self, date: NaiveDate) -> Result<ScoredDay, DataError>;
}

impl<F> ScoreSource for F
where
    F: Fn(NaiveDate) -> Result<ScoredDay, DataError>,
{
    fn score_on(&self, date: NaiveDate) -> Result<ScoredDay, DataError> {
        self(date)
    }
}
