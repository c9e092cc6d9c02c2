use anyhow::{Context, Result};
use insights_engine::{AlertConfig, InsightsConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    // Storage
    pub data_dir: PathBuf,

    // Zones
    pub fear_threshold: f64,    // 25
    pub greed_threshold: f64,   // 75

    // Windows
    pub recent_correlation_window: usize, // 90 aligned points
    pub exit_lookback_days: i64,          // 30
    pub history_window: usize,            // 365 records
    pub long_history_window: usize,       // 1825 records

    // Alerts
    pub alert_delta_asset: f64,     // 7
    pub alert_delta_sentiment: f64, // 5
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            fear_threshold: parse_var(&lookup, "FEAR_THRESHOLD", "25")?,
            greed_threshold: parse_var(&lookup, "GREED_THRESHOLD", "75")?,
            recent_correlation_window: parse_var(&lookup, "RECENT_CORRELATION_WINDOW", "90")?,
            exit_lookback_days: parse_var(&lookup, "EXIT_LOOKBACK_DAYS", "30")?,
            history_window: parse_var(&lookup, "HISTORY_WINDOW", "365")?,
            long_history_window: parse_var(&lookup, "LONG_HISTORY_WINDOW", "1825")?,
            alert_delta_asset: parse_var(&lookup, "ALERT_DELTA_ASSET", "7.0")?,
            alert_delta_sentiment: parse_var(&lookup, "ALERT_DELTA_SENTIMENT", "5.0")?,
        };

        if config.fear_threshold >= config.greed_threshold {
            anyhow::bail!(
                "FEAR_THRESHOLD ({}) must be below GREED_THRESHOLD ({})",
                config.fear_threshold,
                config.greed_threshold
            );
        }
        if config.history_window == 0 || config.long_history_window == 0 {
            anyhow::bail!("history windows must be positive");
        }

        Ok(config)
    }

    pub fn insights(&self) -> InsightsConfig {
        InsightsConfig {
            fear_threshold: self.fear_threshold,
            greed_threshold: self.greed_threshold,
            recent_window: self.recent_correlation_window,
            exit_lookback_days: self.exit_lookback_days,
            ..InsightsConfig::default()
        }
    }

    pub fn alerts(&self) -> AlertConfig {
        AlertConfig {
            asset_delta: self.alert_delta_asset,
            sentiment_delta: self.alert_delta_sentiment,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("invalid {}: '{}'", key, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.fear_threshold, 25.0);
        assert_eq!(config.greed_threshold, 75.0);
        assert_eq!(config.recent_correlation_window, 90);
        assert_eq!(config.history_window, 365);
        assert_eq!(config.long_history_window, 1825);
        assert_eq!(config.insights(), InsightsConfig::default());
        assert_eq!(config.alerts(), AlertConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = RunnerConfig::from_lookup(lookup_from(&[
            ("DATA_DIR", "/tmp/fg"),
            ("FEAR_THRESHOLD", "20"),
            ("EXIT_LOOKBACK_DAYS", " 14 "),
            ("ALERT_DELTA_ASSET", "10"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/fg"));
        assert_eq!(config.insights().fear_threshold, 20.0);
        assert_eq!(config.insights().exit_lookback_days, 14);
        assert_eq!(config.alerts().asset_delta, 10.0);
    }

    #[test]
    fn test_invalid_value_is_error() {
        let err = RunnerConfig::from_lookup(lookup_from(&[("HISTORY_WINDOW", "a year")])).unwrap_err();
        assert!(err.to_string().contains("HISTORY_WINDOW"));
    }

    #[test]
    fn test_inverted_thresholds_are_rejected() {
        let result = RunnerConfig::from_lookup(lookup_from(&[("FEAR_THRESHOLD", "80")]));
        assert!(result.is_err());
    }
}
