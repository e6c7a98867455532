use anyhow::Result;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// The ways a single notification can end.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncEvent {
    Malformed,
    NotApplicable,
    NotSuccessful,
    ProfileNotFound,
    ResolverFailure,
    Processed,
}

impl SyncEvent {
    const ALL: &'static [SyncEvent] = &[
        SyncEvent::Malformed,
        SyncEvent::NotApplicable,
        SyncEvent::NotSuccessful,
        SyncEvent::ProfileNotFound,
        SyncEvent::ResolverFailure,
        SyncEvent::Processed,
    ];

    fn as_str(self) -> &'static str {
        match self {
            SyncEvent::Malformed => "malformed",
            SyncEvent::NotApplicable => "not_applicable",
            SyncEvent::NotSuccessful => "not_successful",
            SyncEvent::ProfileNotFound => "profile_not_found",
            SyncEvent::ResolverFailure => "resolver_failure",
            SyncEvent::Processed => "processed",
        }
    }
}

/// Counters for the notifications handled by the synchronization pipeline.
pub struct SyncMetrics {
    events: IntCounterVec,
    store_failures: IntCounter,
}

impl SyncMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let opts = Opts::new(
            "profile_sync_events",
            "Number of transaction notifications handled, by outcome.",
        );
        let events = IntCounterVec::new(opts, &["outcome"])?;
        for event in SyncEvent::ALL {
            events.with_label_values(&[event.as_str()]);
        }
        registry.register(Box::new(events.clone()))?;

        let store_failures = IntCounter::new(
            "profile_sync_store_failures",
            "Number of resolved profiles that could not be written to the store.",
        )?;
        registry.register(Box::new(store_failures.clone()))?;

        Ok(Self {
            events,
            store_failures,
        })
    }

    pub fn event(&self, event: SyncEvent) {
        self.events.with_label_values(&[event.as_str()]).inc();
    }

    pub fn store_failure(&self) {
        self.store_failures.inc();
    }

    #[cfg(test)]
    pub fn event_count(&self, event: SyncEvent) -> u64 {
        self.events.with_label_values(&[event.as_str()]).get()
    }

    #[cfg(test)]
    pub fn store_failure_count(&self) -> u64 {
        self.store_failures.get()
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        SyncMetrics::new(&Registry::new()).unwrap()
    }
}
