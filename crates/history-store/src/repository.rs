use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sentiment_core::{HistoryRepository, IndexDocument, LongHistoryDocument, Market, StoreError};

/// Read and parse a JSON file. `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path.display().to_string(), e)),
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StoreError::malformed(path.display().to_string(), e))
}

/// Serialize `value` as pretty JSON and replace `path` in one step.
///
/// The document goes to a sibling `.tmp` file first and is renamed over the
/// target, so readers see either the old file or the new one.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let shown = path.display().to_string();
    let body = serde_json::to_string_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent.display().to_string(), e))?;
    }

    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(|e| StoreError::io(shown.clone(), e))?;
        file.write_all(body.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::io(shown.clone(), e))?;
    }
    fs::rename(&tmp, path).map_err(|e| StoreError::io(shown.clone(), e))?;

    tracing::debug!("Wrote {} ({} bytes)", shown, body.len());
    Ok(())
}

/// Sidecars stored as JSON files in one data directory.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    data_dir: PathBuf,
}

impl JsonFileRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    pub fn load_long_history(&self, market: Market) -> Result<Option<LongHistoryDocument>, StoreError> {
        read_json(&self.path_for(&market.long_history_file()))
    }

    pub fn save_long_history(&self, document: &LongHistoryDocument) -> Result<(), StoreError> {
        write_json_atomic(&self.path_for(&document.asset.long_history_file()), document)
    }
}

impl HistoryRepository for JsonFileRepository {
    fn load(&self, market: Market) -> Result<Option<IndexDocument>, StoreError> {
        read_json(&self.path_for(&market.index_file()))
    }

    fn save(&self, market: Market, document: &IndexDocument) -> Result<(), StoreError> {
        write_json_atomic(&self.path_for(&market.index_file()), document)?;
        tracing::info!(
            "Saved {} ({} history days)",
            market.index_file(),
            document.history.len()
        );
        Ok(())
    }
}

/// In-process repository, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    documents: Mutex<HashMap<Market, IndexDocument>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryRepository for MemoryRepository {
    fn load(&self, market: Market) -> Result<Option<IndexDocument>, StoreError> {
        let documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        Ok(documents.get(&market).cloned())
    }

    fn save(&self, market: Market, document: &IndexDocument) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        documents.insert(market, document.clone());
        Ok(())
    }
}
