use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::resume::{record_key, ResumeRecord, RECORD_KEY_PREFIX};
use crate::storage::{KvStore, StorageError};

/// Resume records in the key-value store, one JSON document per `resume:<id>`.
/// Writes are plain overwrites; the last write for a key wins.
#[derive(Clone)]
pub struct ResumeRepository {
    kv: Arc<dyn KvStore>,
}

impl ResumeRepository {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn save(&self, record: &ResumeRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(record)
            .map_err(|e| StorageError::Backend(format!("serializing record {}: {e}", record.id)))?;
        self.kv.set(&record.key(), &json).await?;
        debug!("Saved {} ({} bytes)", record.key(), json.len());
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ResumeRecord>, StorageError> {
        let key = record_key(id);
        let Some(json) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&json)
            .map_err(|e| StorageError::Backend(format!("corrupt record {key}: {e}")))?;
        Ok(Some(record))
    }

    /// All readable records. Entries that fail to deserialize are skipped and logged.
    pub async fn list(&self) -> Result<Vec<ResumeRecord>, StorageError> {
        let entries = self.kv.list(RECORD_KEY_PREFIX).await?;
        Ok(entries
            .into_iter()
            .filter_map(|(key, json)| match serde_json::from_str(&json) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable record {key}: {e}");
                    None
                }
            })
            .collect())
    }
}
