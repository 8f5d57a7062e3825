use crate::{Error, Result};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tagbadge_core::TextSize;
use tokio::sync::RwLock;

/// Persistent key -> size map behind [`super::MetricsCache`].
///
/// Keys are content hashes, so writes for the same key always carry the same size and may be
/// repeated safely.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn open(&self) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<TextSize>>;
    async fn put(&self, key: &str, size: TextSize) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    entries: RwLock<FxHashMap<String, TextSize>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<TextSize>> {
        Ok(self.entries.read().await.get(key).copied())
    }

    async fn put(&self, key: &str, size: TextSize) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), size);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

const WIDTH_PREFIX: &str = "width:";
const HEIGHT_PREFIX: &str = "height:";

/// Store persisted as a flat JSON object with separate `width:<key>` and `height:<key>`
/// entries.
///
/// The file is read on [`MetricsStore::open`] and rewritten on [`MetricsStore::close`] when
/// anything changed. A missing file opens as an empty store.
#[derive(Debug)]
pub struct JsonFileMetricsStore {
    path: PathBuf,
    entries: RwLock<FxHashMap<String, TextSize>>,
    dirty: AtomicBool,
}

impl JsonFileMetricsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: RwLock::default(),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<()> {
        let encoded = {
            let entries = self.entries.read().await;
            encode_entries(&entries)?
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, encoded).await?;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn decode_entries(raw: &str) -> Result<FxHashMap<String, TextSize>> {
    let flat: BTreeMap<String, f64> = serde_json::from_str(raw).map_err(|e| Error::Store {
        message: format!("invalid metrics file: {e}"),
    })?;

    let mut widths = FxHashMap::default();
    let mut heights = FxHashMap::default();
    for (name, value) in flat {
        if let Some(key) = name.strip_prefix(WIDTH_PREFIX) {
            widths.insert(key.to_string(), value);
        } else if let Some(key) = name.strip_prefix(HEIGHT_PREFIX) {
            heights.insert(key.to_string(), value);
        }
    }

    // A key is usable only once both halves are present.
    Ok(widths
        .into_iter()
        .filter_map(|(key, width)| {
            let height = heights.get(&key).copied()?;
            Some((key, TextSize::new(width, height)))
        })
        .collect())
}

fn encode_entries(entries: &FxHashMap<String, TextSize>) -> Result<String> {
    let mut flat = BTreeMap::new();
    for (key, size) in entries {
        flat.insert(format!("{WIDTH_PREFIX}{key}"), size.width);
        flat.insert(format!("{HEIGHT_PREFIX}{key}"), size.height);
    }
    serde_json::to_string_pretty(&flat).map_err(|e| Error::Store {
        message: format!("encode metrics file: {e}"),
    })
}

#[async_trait]
impl MetricsStore for JsonFileMetricsStore {
    async fn open(&self) -> Result<()> {
        let loaded = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => FxHashMap::default(),
            Ok(raw) => decode_entries(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FxHashMap::default(),
            Err(e) => return Err(e.into()),
        };
        let count = loaded.len();
        *self.entries.write().await = loaded;
        self.dirty.store(false, Ordering::Release);
        tracing::info!(path = %self.path.display(), entries = count, "opened metrics store");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<TextSize>> {
        Ok(self.entries.read().await.get(key).copied())
    }

    async fn put(&self, key: &str, size: TextSize) -> Result<()> {
        let previous = self.entries.write().await.insert(key.to_string(), size);
        if previous != Some(size) {
            self.dirty.store(true, Ordering::Release);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            tracing::info!(path = %self.path.display(), "closed metrics store (unchanged)");
            return Ok(());
        }
        if let Err(e) = self.flush().await {
            // Keep the unsaved entries eligible for the next close.
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        tracing::info!(path = %self.path.display(), "flushed metrics store");
        Ok(())
    }
}
