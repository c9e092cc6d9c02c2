use chrono::NaiveDate;
use sentiment_core::{DataError, ScoreHistory, ScoreSource, ScoredDay};

/// Answers rebuild requests from an already computed history, typically the
/// five-year document.
///
/// The five-year document only holds trading days, so a weekend or holiday is
/// answered with the latest earlier reading. The price is only reported for an
/// exact date.
#[derive(Debug, Clone, Copy)]
pub struct LongHistorySource<'a> {
    history: &'a ScoreHistory,
}

impl<'a> LongHistorySource<'a> {
    pub fn new(history: &'a ScoreHistory) -> Self {
        Self { history }
    }
}

impl ScoreSource for LongHistorySource<'_> {
    fn score_on(&self, date: NaiveDate) -> Result<ScoredDay, DataError> {
        self.history
            .on_or_before(date)
            .map(|record| ScoredDay {
                score: record.score,
                price: record.price.filter(|_| record.date == date),
            })
            .ok_or_else(|| DataError::Unavailable(format!("no stored score on or before {}", date)))
    }
}
