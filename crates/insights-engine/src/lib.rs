pub mod aligner;
pub mod alerts;
pub mod correlation;
pub mod episodes;
pub mod models;
pub mod report;
pub mod score_stats;
pub mod signals;


pub use aligner::{align, align_embedded};
pub use alerts::{
    alert_label, composite_sentiment, current_snapshots, find_zone_changes, zone_context, AlertConfig,
    AlertState, IndexSnapshot, ZoneChange, SENTIMENT_KEY,
};
pub use correlation::{classify, correlate, pearson, trend};
pub use episodes::{compute_returns, days_in_zone, find_episodes};
pub use models::*;
pub use report::{build_report, report_from_long_history, report_from_sidecar, zone_summary, ReportInput};
pub use score_stats::{compute_score_stats, percentile_label};
pub use signals::{generate_signals, SignalContext};
