//! Small numeric helpers shared by the index calculators and the insights engine.

/// Compute the mean of a data slice. Returns `None` for empty input.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Round to a fixed number of decimal places.
///
/// Goes through the correctly rounded decimal rendering of `value`, so exact
/// halves go to the even digit (`0.25` -> `0.2`) and values stored just
/// below a half round down (`2.675` -> `2.67`).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}

/// Round to the nearest integer, ties to even.
pub fn round_int(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Share of `data` that is less than or equal to `value`, as a 0-100 integer.
/// Returns `None` for empty input.
pub fn percentile_at_or_below(value: f64, data: &[f64]) -> Option<u32> {
    if data.is_empty() {
        return None;
    }
    let count = data.iter().filter(|&&x| x <= value).count();
    Some((count as f64 / data.len() as f64 * 100.0).round_ties_even() as u32)
}

/// Render a value that was already rounded for display, always keeping at
/// least one decimal (`12.0`, `-3.5`, `0.512`).
pub fn display_decimal(value: f64) -> String {
    let text = format!("{}", value);
    if value.is_finite() && !text.contains('.') && !text.contains('e') {
        format!("{}.0", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(-0.12345, 3), -0.123);
        assert_eq!(round_to(7.0, 1), 7.0);
    }

    #[test]
    fn test_round_to_ties_to_even() {
        assert_eq!(round_to(0.25, 1), 0.2);
        assert_eq!(round_to(0.75, 1), 0.8);
        assert_eq!(round_to(12.25, 1), 12.2);
        assert_eq!(round_to(-2.5, 0), -2.0);
        // 2.675 is stored as 2.67499999...
        assert_eq!(round_to(2.675, 2), 2.67);
        assert!(round_to(f64::NAN, 1).is_nan());
    }

    #[test]
    fn test_round_int_ties_to_even() {
        assert_eq!(round_int(2.5), 2);
        assert_eq!(round_int(3.5), 4);
        assert_eq!(round_int(61.4), 61);
    }

    #[test]
    fn test_percentile_at_or_below() {
        let scores = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile_at_or_below(30.0, &scores), Some(60));
        assert_eq!(percentile_at_or_below(5.0, &scores), Some(0));
        assert_eq!(percentile_at_or_below(50.0, &scores), Some(100));
        assert_eq!(percentile_at_or_below(30.0, &[]), None);
    }

    #[test]
    fn test_display_decimal() {
        assert_eq!(display_decimal(12.0), "12.0");
        assert_eq!(display_decimal(-3.5), "-3.5");
        assert_eq!(display_decimal(0.512), "0.512");
    }
}
