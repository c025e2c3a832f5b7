use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::app::model::{GenerationRecord, GenerationStatus};

/// Terminal result recorded for a generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed { artifact_path: PathBuf },
    Failed { message: String },
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn insert(&self, record: GenerationRecord) -> anyhow::Result<()>;
    async fn get(&self, id: &str) -> anyhow::Result<Option<GenerationRecord>>;
    /// Moves a `PROCESSING` record to its terminal state.
    async fn finish(&self, id: &str, outcome: Outcome) -> anyhow::Result<GenerationRecord>;
    async fn remove(&self, id: &str) -> anyhow::Result<()>;
    async fn snapshot(&self) -> anyhow::Result<BTreeMap<String, GenerationRecord>>;
}

/// Applies `outcome` to `record`, refusing to leave a terminal state.
pub fn apply_outcome(record: &mut GenerationRecord, outcome: Outcome) -> anyhow::Result<()> {
    if record.status.is_terminal() {
        anyhow::bail!(
            "generation {} is already {}; refusing to change it",
            record.id,
            record.status
        );
    }

    match outcome {
        Outcome::Completed { artifact_path } => {
            record.status = GenerationStatus::Completed;
            record.artifact_path = Some(artifact_path);
        }
        Outcome::Failed { message } => {
            record.status = GenerationStatus::Failed;
            record.message = Some(message);
        }
    }
    record.finished_at = Some(Utc::now());
    Ok(())
}

/// Process-local status table.
///
/// With a capacity set, inserting into a full table evicts the oldest
/// finished records first. `PROCESSING` records are never evicted, so the
/// table may exceed its capacity while many generations are in flight.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    records: RwLock<HashMap<String, GenerationRecord>>,
    capacity: Option<usize>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let raw = std::env::var("SLIDECRAFT_STATUS_CAPACITY").unwrap_or_default();
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::new());
        }
        let capacity = raw
            .parse::<usize>()
            .map_err(|err| anyhow::anyhow!("invalid SLIDECRAFT_STATUS_CAPACITY={raw:?}: {err}"))?;
        Ok(Self::with_capacity(capacity))
    }
}

fn evict_finished(records: &mut HashMap<String, GenerationRecord>, capacity: usize) {
    while records.len() >= capacity {
        let oldest = records
            .values()
            .filter(|record| record.status.is_terminal())
            .min_by_key(|record| record.finished_at.unwrap_or(record.created_at))
            .map(|record| record.id.clone());
        let Some(id) = oldest else {
            tracing::warn!(
                capacity,
                len = records.len(),
                "status table over capacity with only in-flight generations"
            );
            return;
        };
        tracing::debug!(id = %id, "evicting finished generation record");
        records.remove(&id);
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn insert(&self, record: GenerationRecord) -> anyhow::Result<()> {
        let mut records = self.records.write().await;
        if let Some(capacity) = self.capacity
            && !records.contains_key(&record.id)
        {
            evict_finished(&mut records, capacity);
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<GenerationRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn finish(&self, id: &str, outcome: Outcome) -> anyhow::Result<GenerationRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("generation not found: {id}"))?;
        apply_outcome(record, outcome)?;
        Ok(record.clone())
    }

    async fn remove(&self, id: &str) -> anyhow::Result<()> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn snapshot(&self) -> anyhow::Result<BTreeMap<String, GenerationRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect())
    }
}
