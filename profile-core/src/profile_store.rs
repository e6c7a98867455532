//! Persistence of synchronized profiles.

#[cfg(test)]
pub mod memory;
mod postgrest;

pub use self::postgrest::{PostgrestProfileStore, DEFAULT_PROFILES_TABLE, DEFAULT_PROFILE_COLUMNS};
use crate::models::ProfileRecord;
use anyhow::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileStoring: Send + Sync {
    /// Inserts the record, or replaces the existing record with the same
    /// value for the `on_conflict` field.
    async fn upsert(&self, record: &ProfileRecord, on_conflict: &str) -> Result<()>;
}
