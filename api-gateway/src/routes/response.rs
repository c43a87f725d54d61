//! Response envelope and error mapping shared by every route.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use votechain::{Envelope, LedgerError, StateError};

pub type ApiResult<T> = Result<Reply<T>, ApiError>;

/// Successful reply: a status code and an [`Envelope`] with data.
pub struct Reply<T> {
    status: StatusCode,
    body: Envelope<T>,
}

pub fn reply<T>(status: StatusCode, message: impl Into<String>, data: T) -> Reply<T> {
    Reply {
        status,
        body: Envelope::ok(message, data),
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Failed reply, rendered as an envelope with `success: false`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Maps a ledger error onto a status code.
    ///
    /// Client errors carry the error text as the message. Server errors
    /// get a generic message, with the error text in `details` only when
    /// `dev_mode` is set.
    pub fn from_ledger(e: LedgerError, dev_mode: bool) -> Self {
        let status = status_for(&e);
        if !status.is_server_error() {
            return Self::new(status, e.to_string());
        }

        tracing::error!(error = %e, "request failed");
        let message = match e {
            LedgerError::Peer(_) => "Peer communication failed",
            _ => "Internal server error",
        };
        Self {
            status,
            message: message.to_string(),
            details: dev_mode.then(|| e.to_string()),
        }
    }
}

pub fn status_for(e: &LedgerError) -> StatusCode {
    match e {
        LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::State(StateError::UnknownCitizen) => StatusCode::UNAUTHORIZED,
        LedgerError::State(_) => StatusCode::CONFLICT,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Crypto(_) | LedgerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LedgerError::Peer(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: Envelope<()> = Envelope::err(self.message, self.details);
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use votechain::{CryptoError, StorageError};

    #[test]
    fn ledger_errors_map_to_statuses() {
        assert_eq!(
            status_for(&LedgerError::Validation("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&StateError::UnknownCitizen.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&StateError::DoubleVote("v".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&LedgerError::NotFound("block".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&LedgerError::Persistence(StorageError::Poisoned)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_error_details_only_in_dev_mode() {
        let prod = ApiError::from_ledger(LedgerError::Crypto(CryptoError::Unpad), false);
        assert_eq!(prod.message, "Internal server error");
        assert!(prod.details.is_none());

        let dev = ApiError::from_ledger(LedgerError::Crypto(CryptoError::Unpad), true);
        assert!(dev.details.is_some());

        let client = ApiError::from_ledger(StateError::ElectionClosed.into(), true);
        assert_eq!(client.message, "election is not open for voting");
        assert!(client.details.is_none());
    }
}
