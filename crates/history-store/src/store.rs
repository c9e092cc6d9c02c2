use chrono::{Duration, NaiveDate};
use sentiment_core::{
    ScoreHistory, ScoreRecord, ScoreSource, LONG_WINDOW, NEUTRAL_SCORE, ROLLING_WINDOW,
};

/// Maintains the bounded, date-unique history of one market's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStore {
    window_size: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::rolling()
    }
}

impl HistoryStore {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    /// The 365-record window kept in daily sidecars.
    pub fn rolling() -> Self {
        Self::new(ROLLING_WINDOW)
    }

    /// The five-year window used by the long rebuild.
    pub fn long() -> Self {
        Self::new(LONG_WINDOW)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Insert `today`, replacing any record with the same date, then keep the
    /// most recent `window_size` records.
    pub fn upsert(&self, history: &ScoreHistory, today: ScoreRecord) -> ScoreHistory {
        self.upsert_all(history, std::iter::once(today))
    }

    /// Upsert several records at once. Later records win over earlier ones
    /// for the same date.
    pub fn upsert_all<I>(&self, history: &ScoreHistory, incoming: I) -> ScoreHistory
    where
        I: IntoIterator<Item = ScoreRecord>,
    {
        let incoming: Vec<ScoreRecord> = incoming.into_iter().collect();

        let mut records: Vec<ScoreRecord> = history
            .iter()
            .filter(|existing| incoming.iter().all(|new| new.date != existing.date))
            .cloned()
            .collect();
        records.extend(incoming);

        self.bounded(ScoreHistory::from_records(records))
    }

    /// Recompute a record for every date in `dates` and replace the history
    /// wholesale.
    ///
    /// A date whose source errors or yields a non-finite score gets the
    /// neutral score and no price; the remaining dates are unaffected.
    pub fn force_rebuild<S>(&self, dates: &[NaiveDate], source: &S) -> ScoreHistory
    where
        S: ScoreSource + ?Sized,
    {
        let total = dates.len();
        let mut records = Vec::with_capacity(total);
        let mut fallbacks = 0usize;

        for (i, &date) in dates.iter().enumerate() {
            let record = match source.score_on(date) {
                Ok(day) if day.score.is_finite() => ScoreRecord::new(date, day.score, day.price),
                Ok(_) => {
                    tracing::warn!("{}: non-finite score, using neutral {}", date, NEUTRAL_SCORE);
                    fallbacks += 1;
                    ScoreRecord::neutral(date)
                }
                Err(e) => {
                    tracing::warn!("{}: {}, using neutral {}", date, e, NEUTRAL_SCORE);
                    fallbacks += 1;
                    ScoreRecord::neutral(date)
                }
            };
            records.push(record);

            if (i + 1) % 50 == 0 {
                tracing::info!("Calculated {}/{} days...", i + 1, total);
            }
        }

        tracing::info!(
            "Rebuilt {} days of history ({} neutral fallbacks)",
            total,
            fallbacks
        );

        self.bounded(ScoreHistory::from_records(records))
    }

    fn bounded(&self, mut history: ScoreHistory) -> ScoreHistory {
        let trimmed = history.keep_most_recent(self.window_size);
        if trimmed > 0 {
            tracing::debug!(
                "Trimmed {} records, history now {} days",
                trimmed,
                history.len()
            );
        }
        history
    }
}

/// The `days` calendar dates ending at `end` (inclusive), ascending.
pub fn trailing_dates(end: NaiveDate, days: usize) -> Vec<NaiveDate> {
    (0..days as i64)
        .rev()
        .map(|offset| end - Duration::days(offset))
        .collect()
}
