use super::ProfileStoring;
use crate::models::ProfileRecord;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::{collections::HashMap, sync::Mutex};

/// A store keeping rows in memory, keyed by the conflict field.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    rows: Mutex<HashMap<String, ProfileRecord>>,
}

impl InMemoryProfileStore {
    pub fn rows(&self) -> Vec<ProfileRecord> {
        self.rows.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl ProfileStoring for InMemoryProfileStore {
    async fn upsert(&self, record: &ProfileRecord, on_conflict: &str) -> Result<()> {
        let key = record
            .field(on_conflict)
            .map(Value::to_string)
            .ok_or_else(|| anyhow!("record has no '{}' field", on_conflict))?;
        self.rows.lock().unwrap().insert(key, record.clone());
        Ok(())
    }
}
