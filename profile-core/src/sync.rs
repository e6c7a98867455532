//! The profile synchronization pipeline.
//!
//! A notification is validated, filtered down to successful transactions on
//! the profile registry, resolved to the current profile of the updated token
//! and finally written to the profile store.

use crate::{
    metrics::{SyncEvent, SyncMetrics},
    models::{MalformedEvent, Profile, ProfileRecord, TokenId, TransactionEvent, ACCOUNT_FIELD},
    profile_resolver::ProfileResolving,
    profile_store::ProfileStoring,
};
use anyhow::{anyhow, Context as _, Result};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Successful end states of a notification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The transaction was sent to another contract.
    NotApplicable,
    /// The transaction did not succeed (yet).
    NotSuccessful,
    /// There is no profile for the updated token.
    ProfileNotFound,
    /// The profile was resolved and handed to the store.
    Processed,
}

impl Outcome {
    pub fn message(self) -> &'static str {
        match self {
            Outcome::NotApplicable => "Only process profile updates",
            Outcome::NotSuccessful => "Transaction status is not success, ignoring",
            Outcome::ProfileNotFound => "Profile not found, ignore",
            Outcome::Processed => "processed",
        }
    }

    fn event(self) -> SyncEvent {
        match self {
            Outcome::NotApplicable => SyncEvent::NotApplicable,
            Outcome::NotSuccessful => SyncEvent::NotSuccessful,
            Outcome::ProfileNotFound => SyncEvent::ProfileNotFound,
            Outcome::Processed => SyncEvent::Processed,
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    MalformedEvent(#[from] MalformedEvent),
    #[error("failed to resolve profile")]
    ResolverFailure(#[source] anyhow::Error),
}

impl SyncError {
    fn event(&self) -> SyncEvent {
        match self {
            SyncError::MalformedEvent(_) => SyncEvent::Malformed,
            SyncError::ResolverFailure(_) => SyncEvent::ResolverFailure,
        }
    }
}

/// Keeps the profile store in sync with the profile registry contract.
pub struct ProfileSync {
    profile_address: String,
    resolver: Arc<dyn ProfileResolving>,
    store: Arc<dyn ProfileStoring>,
    metrics: Arc<SyncMetrics>,
}

impl ProfileSync {
    pub fn new(
        profile_address: impl Into<String>,
        resolver: Arc<dyn ProfileResolving>,
        store: Arc<dyn ProfileStoring>,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        ProfileSync {
            profile_address: profile_address.into(),
            resolver,
            store,
            metrics,
        }
    }

    /// Handles a single transaction notification body.
    pub async fn handle_event(&self, body: &Value) -> Result<Outcome, SyncError> {
        let result = self.process(body).await;
        self.metrics.event(match &result {
            Ok(outcome) => outcome.event(),
            Err(err) => err.event(),
        });
        result
    }

    async fn process(&self, body: &Value) -> Result<Outcome, SyncError> {
        let event = TransactionEvent::from_body(body)?;
        log::debug!("received transaction record {:?}", event);

        if !event.targets(&self.profile_address) {
            return Ok(Outcome::NotApplicable);
        }
        if !event.is_successful() {
            return Ok(Outcome::NotSuccessful);
        }

        let token_id = match event.metadata_update() {
            Some(update) => update.token_id,
            None => {
                log::warn!("profile transaction without token id: {}", event.data);
                return Ok(Outcome::ProfileNotFound);
            }
        };
        let profile = match self
            .resolver
            .resolve_profile(&token_id)
            .await
            .map_err(SyncError::ResolverFailure)?
        {
            Some(profile) => profile,
            None => {
                log::info!("no profile found for token {}", token_id);
                return Ok(Outcome::ProfileNotFound);
            }
        };

        // Store failures are logged and counted, never reported to the trigger.
        match self.store_profile(profile, &token_id).await {
            Ok(record) => log::info!(
                "synchronized profile of {} for token {}",
                record.account().unwrap_or_default(),
                token_id
            ),
            Err(err) => {
                log::error!("failed to store profile for token {}: {:?}", token_id, err);
                self.metrics.store_failure();
            }
        }
        Ok(Outcome::Processed)
    }

    /// Writes the profile to the store, replacing any previous profile of the
    /// same account.
    pub async fn store_profile(&self, profile: Profile, token_id: &TokenId) -> Result<ProfileRecord> {
        let record = ProfileRecord::new(profile, token_id);
        if record.account().is_none() {
            return Err(anyhow!("resolved profile has no account"));
        }
        self.store
            .upsert(&record, ACCOUNT_FIELD)
            .await
            .context("profile upsert failed")?;
        Ok(record)
    }
}
