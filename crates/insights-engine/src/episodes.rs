use std::collections::BTreeMap;

use sentiment_core::stats::{mean, round_to};
use sentiment_core::AlignedPoint;
use statrs::statistics::{Data, Median};

use crate::models::{Direction, Episode, HorizonReturns};

/// Onset days of every run of threshold-crossing days.
///
/// Only the first day of a run is an episode. A single non-crossing day ends
/// the run, so the next crossing day starts a new episode.
pub fn find_episodes(aligned: &[AlignedPoint], threshold: f64, direction: Direction) -> Vec<Episode> {
    let mut episodes = Vec::new();
    let mut in_episode = false;

    for (index, point) in aligned.iter().enumerate() {
        let crossed = direction.crosses(point.score, threshold);
        if crossed && !in_episode {
            episodes.push(Episode {
                index,
                date: point.date,
                score: point.score,
                price: point.price,
            });
        }
        in_episode = crossed;
    }

    episodes
}

/// Number of aligned days past the threshold, episode onsets or not.
pub fn days_in_zone(aligned: &[AlignedPoint], threshold: f64, direction: Direction) -> usize {
    aligned
        .iter()
        .filter(|p| direction.crosses(p.score, threshold))
        .count()
}

/// Percentage price change `horizon` aligned samples after each episode.
///
/// Episodes too close to the end of the series for a horizon are left out of
/// that horizon.
pub fn compute_returns(
    episodes: &[Episode],
    aligned: &[AlignedPoint],
    horizons: &[usize],
) -> BTreeMap<usize, HorizonReturns> {
    horizons
        .iter()
        .map(|&horizon| {
            let returns: Vec<f64> = episodes
                .iter()
                .filter_map(|ep| {
                    let future = aligned.get(ep.index + horizon)?;
                    Some(round_to((future.price - ep.price) / ep.price * 100.0, 1))
                })
                .collect();
            (horizon, summarize(returns))
        })
        .collect()
}

fn summarize(returns: Vec<f64>) -> HorizonReturns {
    if returns.is_empty() {
        return HorizonReturns::default();
    }

    let wins = returns.iter().filter(|&&r| r > 0.0).count();
    let win_rate = (wins as f64 / returns.len() as f64 * 100.0).round_ties_even() as u32;
    let median = Data::new(returns.clone()).median();
    let best = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst = returns.iter().copied().fold(f64::INFINITY, f64::min);

    HorizonReturns {
        avg: mean(&returns).map(|m| round_to(m, 1)),
        win_rate: Some(win_rate),
        count: returns.len(),
        median: Some(round_to(median, 1)),
        best: Some(best),
        worst: Some(worst),
        returns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn series(scores: &[f64], prices: &[f64]) -> Vec<AlignedPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        scores
            .iter()
            .zip(prices)
            .enumerate()
            .map(|(i, (&score, &price))| AlignedPoint {
                date: start + Duration::days(i as i64),
                score,
                price,
            })
            .collect()
    }

    #[test]
    fn test_single_run_is_one_episode() {
        for run in 1..6 {
            let mut scores = vec![50.0; 3];
            scores.extend(std::iter::repeat(10.0).take(run));
            scores.extend([50.0, 50.0]);
            let aligned = series(&scores, &vec![100.0; scores.len()]);

            let episodes = find_episodes(&aligned, 25.0, Direction::Below);

            assert_eq!(episodes.len(), 1);
            assert_eq!(episodes[0].index, 3);
            assert_eq!(days_in_zone(&aligned, 25.0, Direction::Below), run);
        }
    }

    #[test]
    fn test_one_day_break_starts_new_episode() {
        let aligned = series(&[20.0, 20.0, 30.0, 20.0, 20.0], &[1.0; 5]);

        let episodes = find_episodes(&aligned, 25.0, Direction::Below);

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].index, 0);
        assert_eq!(episodes[1].index, 3);
    }

    #[test]
    fn test_threshold_day_does_not_cross() {
        let aligned = series(&[25.0, 75.0, 80.0], &[1.0; 3]);

        assert!(find_episodes(&aligned, 25.0, Direction::Below).is_empty());
        let greed = find_episodes(&aligned, 75.0, Direction::Above);
        assert_eq!(greed.len(), 1);
        assert_eq!(greed[0].index, 2);
    }

    #[test]
    fn test_compute_returns_by_index_horizon() {
        // Episodes at 0 and 3; horizon 2 reaches index 2 and 5.
        let aligned = series(
            &[10.0, 50.0, 50.0, 10.0, 50.0, 50.0],
            &[100.0, 90.0, 110.0, 200.0, 150.0, 180.0],
        );
        let episodes = find_episodes(&aligned, 25.0, Direction::Below);

        let returns = compute_returns(&episodes, &aligned, &[2, 5]);

        let h2 = &returns[&2];
        assert_eq!(h2.returns, vec![10.0, -10.0]);
        assert_eq!(h2.count, 2);
        assert_eq!(h2.avg, Some(0.0));
        assert_eq!(h2.win_rate, Some(50));
        assert_eq!(h2.best, Some(10.0));
        assert_eq!(h2.worst, Some(-10.0));
        assert_relative_eq!(h2.median.unwrap(), 0.0, epsilon = 1e-9);

        let h5 = &returns[&5];
        assert_eq!(h5.count, 1);
        assert_eq!(h5.returns, vec![80.0]);
        assert_eq!(h5.win_rate, Some(100));
    }

    #[test]
    fn test_no_future_data_is_none() {
        let aligned = series(&[10.0, 50.0], &[100.0, 101.0]);
        let episodes = find_episodes(&aligned, 25.0, Direction::Below);

        let returns = compute_returns(&episodes, &aligned, &[30]);

        assert_eq!(returns[&30].count, 0);
        assert_eq!(returns[&30].avg, None);
        assert_eq!(returns[&30].win_rate, None);
        assert_eq!(returns[&30].median, None);
    }
}
