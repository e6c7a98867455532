use anyhow::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use warp::{
    http::{header, Response, StatusCode},
    log::Info,
    Filter, Rejection, Reply,
};

// Response metrics are measured through warp's log functionality on the final
// response, so they include rejected requests.

pub struct Metrics {
    response_status: IntCounterVec,
    response_time: Histogram,
}

impl Metrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let opts = Opts::new(
            "profile_sync_response_status",
            "The status code of a profile sync response.",
        );
        let response_status = IntCounterVec::new(opts, &["status"])?;
        registry.register(Box::new(response_status.clone()))?;

        let opts = HistogramOpts::new(
            "profile_sync_response_time",
            "The duration it takes for the profile sync to respond.",
        );
        let response_time = Histogram::with_opts(opts)?;
        registry.register(Box::new(response_time.clone()))?;

        Ok(Self {
            response_status,
            response_time,
        })
    }

    pub fn handle_response(&self, info: Info<'_>) {
        let status = info.status();
        self.response_status
            .with_label_values(&[status.as_str()])
            .inc();
        let response_time = info.elapsed().as_secs_f64();
        self.response_time.observe(response_time);
    }
}

/// Serves the gathered metrics of the registry in the Prometheus text format.
pub fn filter(registry: Arc<Registry>) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("metrics")
        .and(warp::get())
        .map(move || encode(&registry))
}

fn encode(registry: &Registry) -> impl Reply {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&registry.gather(), &mut buffer) {
        Ok(()) => Response::builder()
            .header(header::CONTENT_TYPE, encoder.format_type())
            .body(buffer),
        Err(err) => {
            log::error!("failed to encode metrics: {:?}", err);
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_registered_metrics() {
        let registry = Arc::new(Registry::new());
        let _metrics = Metrics::new(&registry).unwrap();
        let response = warp::test::request()
            .path("/metrics")
            .reply(&filter(registry))
            .await;
        assert_eq!(response.status(), 200);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body.contains("profile_sync_response_time"));
    }
}
