//! Readiness reporting for the orchestrator. The service is ready as soon as
//! it accepts connections.

use warp::{
    http::{header, Response, StatusCode},
    Filter, Rejection, Reply,
};

/// A `warp` filter for responding to health checks.
pub fn filter() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("health" / "readiness")
        .and(warp::get().or(warp::head()).unify())
        .map(|| {
            Response::builder()
                .status(StatusCode::NO_CONTENT)
                .header(header::CACHE_CONTROL, "no-store")
                .body("")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_with_no_content() {
        for method in &["GET", "HEAD"] {
            let response = warp::test::request()
                .method(method)
                .path("/health/readiness")
                .reply(&filter())
                .await;
            assert_eq!(response.status(), 204);
            assert_eq!(response.headers()["cache-control"], "no-store");
        }
    }

    #[tokio::test]
    async fn rejects_other_methods() {
        let response = warp::test::request()
            .method("POST")
            .path("/health/readiness")
            .reply(&filter())
            .await;
        assert_eq!(response.status(), 405);
    }
}
