use sentiment_core::stats::{display_decimal, round_to};
use sentiment_core::AlignedPoint;

use crate::models::{CorrelationSummary, Trend, TrendReading};

/// Fewest paired points a correlation is computed on.
pub const MIN_CORRELATION_POINTS: usize = 5;

/// Minimum change in |r| between windows that counts as a trend.
pub const TREND_BAND: f64 = 0.15;

/// Pearson correlation of two equally long series, rounded to 3 decimals.
///
/// `None` with fewer than 5 pairs, mismatched lengths or a constant series.
pub fn pearson(scores: &[f64], prices: &[f64]) -> Option<f64> {
    let n = scores.len();
    if n < MIN_CORRELATION_POINTS || prices.len() != n {
        return None;
    }
    if is_constant(scores) || is_constant(prices) {
        return None;
    }

    let mean_a = scores.iter().sum::<f64>() / n as f64;
    let mean_b = prices.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (a, b) in scores.iter().zip(prices) {
        let da = a - mean_a;
        let db = b - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some(round_to((cov / denom).clamp(-1.0, 1.0), 3))
}

fn is_constant(data: &[f64]) -> bool {
    data.windows(2).all(|w| w[0] == w[1])
}

/// Strength and direction of a correlation as shown to readers.
pub fn classify(r: Option<f64>) -> String {
    let Some(r) = r else {
        return "Insufficient data".to_string();
    };

    let strength = match r.abs() {
        a if a >= 0.7 => "Strong",
        a if a >= 0.4 => "Moderate",
        a if a >= 0.2 => "Weak",
        _ => "Negligible",
    };

    if r > 0.0 {
        format!("{} positive", strength)
    } else if r < 0.0 {
        format!("{} negative", strength)
    } else {
        strength.to_string()
    }
}

/// Compare the recent correlation against the full-history one.
pub fn trend(r_recent: Option<f64>, r_full: Option<f64>) -> Option<TrendReading> {
    let (recent, full) = (r_recent?, r_full?);
    let diff = recent.abs() - full.abs();
    let pair = format!("{} vs {} overall", display_decimal(recent), display_decimal(full));

    let reading = if diff > TREND_BAND {
        TrendReading {
            trend: Trend::Strengthening,
            detail: format!("Recently stronger ({})", pair),
        }
    } else if diff < -TREND_BAND {
        TrendReading {
            trend: Trend::Weakening,
            detail: format!("Recently weaker ({})", pair),
        }
    } else {
        TrendReading {
            trend: Trend::Stable,
            detail: format!("Consistent ({})", pair),
        }
    };
    Some(reading)
}

/// Correlations over the last `recent_window` aligned points and over the
/// whole series.
pub fn correlate(aligned: &[AlignedPoint], recent_window: usize) -> CorrelationSummary {
    let (scores, prices): (Vec<f64>, Vec<f64>) = aligned.iter().map(|p| (p.score, p.price)).unzip();
    let r_full = pearson(&scores, &prices);

    let start = scores.len().saturating_sub(recent_window);
    let r_90d = pearson(&scores[start..], &prices[start..]);

    let trend = trend(r_90d, r_full);

    CorrelationSummary {
        r_90d,
        r_full,
        label_90d: classify(r_90d),
        label_full: classify(r_full),
        trend: trend.as_ref().map(|t| t.trend),
        trend_detail: trend.map(|t| t.detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SCORES: [f64; 7] = [12.0, 30.0, 44.0, 51.0, 63.0, 78.0, 90.0];

    #[test]
    fn test_pearson_perfect_positive() {
        let prices: Vec<f64> = SCORES.iter().map(|s| 2.5 * s + 100.0).collect();
        assert_relative_eq!(pearson(&SCORES, &prices).unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let prices: Vec<f64> = SCORES.iter().map(|s| -0.4 * s + 90.0).collect();
        assert_relative_eq!(pearson(&SCORES, &prices).unwrap(), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pearson_insufficient_inputs() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(pearson(&[50.0; 7], &prices), None);
        assert_eq!(pearson(&SCORES, &[3.3; 7]), None);
        assert_eq!(pearson(&SCORES[..4], &prices[..4]), None);
        assert_eq!(pearson(&SCORES, &prices[..6]), None);
    }

    #[test]
    fn test_pearson_is_rounded() {
        let prices = [5.0, 3.0, 9.0, 4.0, 8.0, 7.0, 12.0];
        let r = pearson(&SCORES, &prices).unwrap();
        assert_eq!(r, round_to(r, 3));
        assert!(r > 0.0 && r < 1.0);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(None), "Insufficient data");
        assert_eq!(classify(Some(0.82)), "Strong positive");
        assert_eq!(classify(Some(-0.7)), "Strong negative");
        assert_eq!(classify(Some(0.41)), "Moderate positive");
        assert_eq!(classify(Some(-0.25)), "Weak negative");
        assert_eq!(classify(Some(0.05)), "Negligible positive");
        assert_eq!(classify(Some(0.0)), "Negligible");
    }

    #[test]
    fn test_trend() {
        let up = trend(Some(0.8), Some(0.5)).unwrap();
        assert_eq!(up.trend, Trend::Strengthening);
        assert_eq!(up.detail, "Recently stronger (0.8 vs 0.5 overall)");

        let down = trend(Some(-0.1), Some(-0.6)).unwrap();
        assert_eq!(down.trend, Trend::Weakening);
        assert_eq!(down.detail, "Recently weaker (-0.1 vs -0.6 overall)");

        let flat = trend(Some(0.45), Some(-0.4)).unwrap();
        assert_eq!(flat.trend, Trend::Stable);
        assert_eq!(flat.detail, "Consistent (0.45 vs -0.4 overall)");

        assert_eq!(trend(None, Some(0.3)), None);
        assert_eq!(trend(Some(0.3), None), None);
    }
}
