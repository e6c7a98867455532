use crate::{error::RejectionReason, health, metrics::Metrics};
use profile_core::sync::ProfileSync;
use prometheus::Registry;
use serde_json::Value;
use std::{convert::Infallible, sync::Arc};
use warp::{http::StatusCode, reply::WithStatus, Filter, Rejection, Reply};

/// The largest notification body accepted, in bytes.
const MAX_BODY_SIZE: u64 = 64 * 1024;

/// Handles transaction notifications together with the monitoring endpoints.
pub fn all(
    sync: Arc<ProfileSync>,
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone + Send + Sync {
    let handle_metrics = warp::log::custom(move |info| metrics.handle_response(info));

    notification(sync)
        .or(health::filter())
        .or(crate::metrics::filter(registry))
        .recover(handle_rejection)
        .with(handle_metrics)
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if let Some(reason) = err.find::<RejectionReason>() {
        log::warn!("rejection reason: {:?}", reason);
        reason.as_http_error()
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "invalid url path")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "payload too large")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "length required")
    } else if err.find::<warp::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        log::debug!("invalid notification body: {:?}", err);
        (StatusCode::BAD_REQUEST, "Invalid record data")
    } else {
        log::warn!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "unexpected internal error",
        )
    };

    Ok(warp::reply::with_status(message, code))
}

/// Accepts a transaction notification of the form
/// `POST / {"record": {"dest": .., "status": .., "data": {"_tokenId": ..}}}`.
fn notification(
    sync: Arc<ProfileSync>,
) -> impl Filter<Extract = (WithStatus<&'static str>,), Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(warp::any().map(move || sync.clone()))
        .and_then(handle_notification)
}

async fn handle_notification(
    body: Value,
    sync: Arc<ProfileSync>,
) -> Result<WithStatus<&'static str>, Rejection> {
    let outcome = sync
        .handle_event(&body)
        .await
        .map_err(RejectionReason::from)?;
    log::info!("handled notification: {}", outcome.message());
    Ok(warp::reply::with_status(outcome.message(), StatusCode::OK))
}
