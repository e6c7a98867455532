use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, Registry};
use std::time::Duration;

/// The remote services the HTTP client talks to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HttpLabel {
    /// JSON RPC calls to the node of the profile chain.
    Rpc,
    /// Profile metadata downloads from the IPFS gateway.
    Ipfs,
    /// Writes to the profile store.
    Store,
}

impl HttpLabel {
    const ALL: &'static [HttpLabel] = &[HttpLabel::Rpc, HttpLabel::Ipfs, HttpLabel::Store];

    fn as_str(self) -> &'static str {
        match self {
            HttpLabel::Rpc => "rpc",
            HttpLabel::Ipfs => "ipfs",
            HttpLabel::Store => "store",
        }
    }
}

/// A registry for all HTTP related metrics.
#[derive(Debug)]
pub struct HttpMetrics {
    latency: HistogramVec,
    size: HistogramVec,
}

impl HttpMetrics {
    /// Create a new HTTP metrics registry.
    pub fn new(registry: &Registry) -> Result<Self> {
        let latency = HttpMetrics::initialize_histogram(
            registry,
            "profile_sync_http_latency",
            "Latency in seconds for HTTP request",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0],
        )?;
        let size = HttpMetrics::initialize_histogram(
            registry,
            "profile_sync_http_size",
            "Size in bytes for HTTP response bodies",
            vec![100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0],
        )?;

        Ok(HttpMetrics { latency, size })
    }

    /// Initializes a histogram with for all the labels.
    fn initialize_histogram(
        registry: &Registry,
        name: &str,
        description: &str,
        buckets: Vec<f64>,
    ) -> Result<HistogramVec> {
        let options = HistogramOpts::new(name, description).buckets(buckets);
        let histogram = HistogramVec::new(options, &["client"])?;
        for label in HttpLabel::ALL {
            histogram.with_label_values(&[label.as_str()]);
        }

        registry.register(Box::new(histogram.clone()))?;

        Ok(histogram)
    }

    /// Add a request latency and size measurement for the specified client.
    pub fn request(&self, label: HttpLabel, latency: Duration, size: usize) {
        self.latency
            .with_label_values(&[label.as_str()])
            .observe(latency.as_secs_f64());
        self.size
            .with_label_values(&[label.as_str()])
            .observe(size as _);
    }

    #[cfg(test)]
    pub fn request_count(&self, label: HttpLabel) -> u64 {
        self.latency
            .with_label_values(&[label.as_str()])
            .get_sample_count()
    }
}

impl Default for HttpMetrics {
    fn default() -> Self {
        HttpMetrics::new(&Registry::new()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_initialized_on_creation() {
        let registry = Registry::new();
        let _metrics = HttpMetrics::new(&registry).unwrap();

        let latency = registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == "profile_sync_http_latency")
            .unwrap();
        assert_eq!(latency.get_metric().len(), HttpLabel::ALL.len());
    }

    #[test]
    fn records_requests_per_client() {
        let metrics = HttpMetrics::default();
        metrics.request(HttpLabel::Ipfs, Duration::from_millis(20), 512);

        let ipfs = metrics.latency.with_label_values(&["ipfs"]);
        assert_eq!(ipfs.get_sample_count(), 1);
        let rpc = metrics.latency.with_label_values(&["rpc"]);
        assert_eq!(rpc.get_sample_count(), 0);
    }
}
