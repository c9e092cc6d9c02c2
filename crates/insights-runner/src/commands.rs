//! One function per runner command. Each returns what it wrote so tests can
//! inspect results without re-reading files.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use history_store::{
    load_price_map, read_json, rebuild_history, record_reading, trailing_dates, write_json_atomic,
    HistoryStore, JsonFileRepository, LongHistorySource,
};
use insights_engine::{
    current_snapshots, find_zone_changes, report_from_long_history, report_from_sidecar, AlertState,
    InsightsReport, ZoneChange,
};
use rayon::prelude::*;
use serde::Deserialize;
use sentiment_core::{
    combine, ComponentReading, DataError, HistoryRepository, IndexDocument, LongHistoryDocument,
    Market, ScoreHistory, ScoreRecord, SentimentLabel,
};

use crate::config::RunnerConfig;

pub const PREVIOUS_LABELS_FILE: &str = "previous-labels.json";
pub const PREVIOUS_SCORES_FILE: &str = "previous-scores.json";

/// Generate the insights report of every market in `markets`, in parallel.
///
/// A failing market is logged and skipped; the others still get written.
pub fn generate_insights(
    config: &RunnerConfig,
    markets: &[Market],
    long_history: bool,
    dry_run: bool,
    now: DateTime<Utc>,
) -> Vec<(Market, InsightsReport)> {
    let repo = JsonFileRepository::new(&config.data_dir);

    let mut results: Vec<(Market, InsightsReport)> = markets
        .par_iter()
        .filter_map(|&market| {
            match insights_for_market(&repo, config, market, long_history, dry_run, now) {
                Ok(report) => Some((market, report)),
                Err(e) => {
                    tracing::error!("{}: insights failed: {:#}", market, e);
                    None
                }
            }
        })
        .collect();

    results.sort_by_key(|(market, _)| *market);
    tracing::info!("Generated insights for {}/{} markets", results.len(), markets.len());
    results
}

fn insights_for_market(
    repo: &JsonFileRepository,
    config: &RunnerConfig,
    market: Market,
    long_history: bool,
    dry_run: bool,
    now: DateTime<Utc>,
) -> Result<InsightsReport> {
    let report = if long_history {
        let document = repo
            .load_long_history(market)?
            .with_context(|| format!("no {}", market.long_history_file()))?;
        report_from_long_history(&document, now, &config.insights())?
    } else {
        let document = repo
            .load(market)?
            .with_context(|| format!("no {}", market.index_file()))?;
        let prices = load_price_map(&repo.path_for(&market.price_file()))?;
        report_from_sidecar(market, &document, &prices, now, &config.insights())
    };

    for signal in &report.signals {
        tracing::info!("{}: {}", market, signal);
    }

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let path = repo.path_for(&market.insights_file(long_history));
        write_json_atomic(&path, &report).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(report)
}

/// A component result as handed over by a fetcher: either a score with its
/// detail text or the error that prevented computing it.
#[derive(Debug, Deserialize)]
struct ComponentInput {
    score: Option<f64>,
    #[serde(default)]
    detail: String,
    error: Option<String>,
}

impl ComponentInput {
    fn into_reading(self) -> Result<ComponentReading, DataError> {
        match (self.error, self.score) {
            (Some(error), _) => Err(DataError::Unavailable(error)),
            (None, Some(score)) if score.is_finite() => Ok(ComponentReading::new(score, self.detail)),
            (None, _) => Err(DataError::InvalidData("missing score".to_string())),
        }
    }
}

/// Combine the component file into today's reading and persist it to the
/// market's sidecar, and to its five-year document when one exists.
pub fn record(
    config: &RunnerConfig,
    market: Market,
    components_file: &Path,
    price: Option<f64>,
    now: DateTime<Utc>,
) -> Result<IndexDocument> {
    let inputs: BTreeMap<String, ComponentInput> = read_json(components_file)?
        .with_context(|| format!("components file {} not found", components_file.display()))?;
    let readings = inputs.into_iter().map(|(key, input)| (key, input.into_reading()));
    let composite = combine(&market.config().weights, readings);

    let repo = JsonFileRepository::new(&config.data_dir);
    let today = now.date_naive();
    let document = record_reading(
        &repo,
        market,
        &HistoryStore::new(config.history_window),
        &composite,
        today,
        price,
        now,
    )?;

    if let Some(long) = repo.load_long_history(market)? {
        let store = HistoryStore::new(config.long_history_window);
        let history = store.upsert(&long.history, ScoreRecord::new(today, composite.score, price));
        repo.save_long_history(&LongHistoryDocument::build(market, history, now))?;
    }

    Ok(document)
}

/// Rebuild the rolling sidecar history for the trailing window from the
/// five-year document. Non-trading days carry the previous reading; only days
/// before the document starts fall back to neutral.
pub fn rebuild(config: &RunnerConfig, market: Market, now: DateTime<Utc>) -> Result<IndexDocument> {
    let repo = JsonFileRepository::new(&config.data_dir);
    let long = repo
        .load_long_history(market)?
        .with_context(|| format!("no {} to rebuild from", market.long_history_file()))?;

    let dates = trailing_dates(now.date_naive(), config.history_window);
    let document = rebuild_history(
        &repo,
        market,
        &HistoryStore::new(config.history_window),
        &dates,
        &LongHistorySource::new(&long.history),
        now,
    )?;
    Ok(document)
}

/// Compare every index with the previous run and report zone changes.
pub fn alerts(config: &RunnerConfig, dry_run: bool, now: DateTime<Utc>) -> Result<Vec<ZoneChange>> {
    let repo = JsonFileRepository::new(&config.data_dir);

    let mut documents = BTreeMap::new();
    for market in Market::ALL {
        match repo.load(market) {
            Ok(Some(document)) => {
                documents.insert(market, document);
            }
            Ok(None) => tracing::warn!("{}: no sidecar, skipped", market),
            Err(e) => tracing::warn!("{}: {}", market, e),
        }
    }

    let current = current_snapshots(&documents);
    let previous = AlertState {
        labels: read_json::<BTreeMap<String, SentimentLabel>>(&repo.path_for(PREVIOUS_LABELS_FILE))?
            .unwrap_or_default(),
        scores: read_json::<BTreeMap<String, f64>>(&repo.path_for(PREVIOUS_SCORES_FILE))?
            .unwrap_or_default(),
    };
    let histories: BTreeMap<Market, ScoreHistory> = documents
        .into_iter()
        .map(|(market, doc)| (market, doc.history))
        .collect();

    let changes = find_zone_changes(&current, &previous, &histories, now.date_naive(), &config.alerts());
    for change in &changes {
        tracing::info!(
            "{}: {} -> {} ({}){}",
            change.key,
            change.old_label,
            change.new_label,
            change.score,
            change.context.as_deref().map(|c| format!(" {}", c)).unwrap_or_default()
        );
    }
    if changes.is_empty() {
        tracing::info!("No zone changes");
    }

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    } else {
        let state = AlertState::from_snapshots(&current);
        write_json_atomic(&repo.path_for(PREVIOUS_LABELS_FILE), &state.labels)?;
        write_json_atomic(&repo.path_for(PREVIOUS_SCORES_FILE), &state.scores)?;
    }

    Ok(changes)
}
