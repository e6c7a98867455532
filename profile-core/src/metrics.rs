mod http_metrics;
mod sync_metrics;

pub use self::http_metrics::{HttpLabel, HttpMetrics};
pub use self::sync_metrics::{SyncEvent, SyncMetrics};
