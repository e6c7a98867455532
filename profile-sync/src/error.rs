//! Module implementing a custom warp rejection for failed notifications.

use anyhow::Error;
use profile_core::{models::MalformedEvent, sync::SyncError};
use warp::{
    http::StatusCode,
    reject::{self, Reject, Rejection},
};

/// The reasons a notification is answered with an error status.
#[derive(Debug)]
pub enum RejectionReason {
    /// The body is not a transaction notification.
    MalformedEvent(MalformedEvent),
    /// The current profile could not be retrieved.
    ResolverFailure(Error),
}

impl RejectionReason {
    /// Retrieve an HTTP status code and error message for the given rejection
    /// reason.
    pub fn as_http_error(&self) -> (StatusCode, &'static str) {
        match self {
            RejectionReason::MalformedEvent(reason) => (StatusCode::BAD_REQUEST, reason.message()),
            RejectionReason::ResolverFailure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to resolve profile",
            ),
        }
    }
}

impl From<SyncError> for RejectionReason {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::MalformedEvent(reason) => RejectionReason::MalformedEvent(reason),
            SyncError::ResolverFailure(err) => RejectionReason::ResolverFailure(err),
        }
    }
}

impl Reject for RejectionReason {}

impl From<RejectionReason> for Rejection {
    fn from(reason: RejectionReason) -> Self {
        reject::custom(reason)
    }
}
