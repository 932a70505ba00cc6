//! Maps `AuctionError` onto HTTP status codes and a uniform JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use error_stack::Report;
use serde_json::json;

use aip_auction_common::error::AuctionError;

pub struct ApiError(pub Report<AuctionError>);

impl From<Report<AuctionError>> for ApiError {
    fn from(report: Report<AuctionError>) -> Self {
        Self(report)
    }
}

impl From<AuctionError> for ApiError {
    fn from(error: AuctionError) -> Self {
        Self(Report::new(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let context = *self.0.current_context();
        let status = status_for(context);
        log::warn!("request failed: {:?}", self.0);
        let body = Json(json!({
            "error": context.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Maps `AuctionError` onto the literal status-code table of spec §6/§8: 400
/// for schema failures, 401 for signature/nonce/timestamp failures plus a
/// late bid (spec §8 Scenario 3: "401-class rejection `window_closed`"), 404
/// for an unknown auction on the event-report surface, 500 for everything
/// else.
fn status_for(error: AuctionError) -> StatusCode {
    match error {
        AuctionError::SchemaInvalid => StatusCode::BAD_REQUEST,
        AuctionError::SignatureInvalid
        | AuctionError::TimestampOutOfRange
        | AuctionError::NonceDuplicate
        | AuctionError::WindowClosed => StatusCode::UNAUTHORIZED,
        AuctionError::NoSuchAuction => StatusCode::NOT_FOUND,
        AuctionError::UnknownAuction
        | AuctionError::NotInvited
        | AuctionError::DuplicateBid
        | AuctionError::Conflict
        | AuctionError::TerminalState
        | AuctionError::StorageUnavailable
        | AuctionError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_invalid_maps_to_bad_request() {
        assert_eq!(status_for(AuctionError::SchemaInvalid), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn signature_invalid_maps_to_unauthorized() {
        assert_eq!(
            status_for(AuctionError::SignatureInvalid),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn nonce_duplicate_maps_to_unauthorized() {
        assert_eq!(status_for(AuctionError::NonceDuplicate), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn no_such_auction_maps_to_not_found() {
        assert_eq!(status_for(AuctionError::NoSuchAuction), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_unavailable_maps_to_internal_server_error() {
        assert_eq!(
            status_for(AuctionError::StorageUnavailable),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn window_closed_maps_to_unauthorized() {
        assert_eq!(status_for(AuctionError::WindowClosed), StatusCode::UNAUTHORIZED);
    }
}
