//! Error types for edge platform calls.
//!
//! The edge platform reports failures in two ways: legacy releases return
//! sentinel strings in the body, newer ones a JSON envelope with a
//! `statusCode`. `classify_response` folds both into `EdgeError` so callers
//! never look at bodies.

use serde::Deserialize;
use thiserror::Error;

/// Result type for edge platform calls.
pub type EdgeResult<T> = Result<T, EdgeError>;

/// Errors that can occur talking to the edge platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EdgeError {
    /// The object does not exist on the edge platform.
    #[error("not found: {0}")]
    NotFound(String),

    /// An object with the same name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The platform could not be reached (connect failure or timeout).
    #[error("edge platform unreachable: {0}")]
    Unreachable(String),

    /// The platform answered with a non-success status.
    #[error("edge platform rejected request ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The device exposes no command with this name.
    #[error("property {property} not found on device {device}")]
    PropertyNotFound {
        /// Edge device name.
        device: String,
        /// Property name.
        property: String,
    },

    /// The client was asked for something it cannot express.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EdgeError {
    /// Returns true if the object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EdgeError::NotFound(_))
    }

    /// Returns true if the object already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, EdgeError::AlreadyExists(_))
    }

    /// Returns true if the platform could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, EdgeError::Unreachable(_))
    }

    /// Returns true if the call may succeed when repeated later.
    pub fn is_retryable(&self) -> bool {
        match self {
            EdgeError::Unreachable(_) => true,
            EdgeError::Rejected { status, .. } => *status >= 500 || *status == 423,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for EdgeError {
    fn from(err: serde_json::Error) -> Self {
        EdgeError::Decode(err.to_string())
    }
}

const LEGACY_NOT_FOUND: &str = "Item not found";
const LEGACY_NOT_FOUND_PREFIX: &str = "no item found";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    status_code: u16,
    #[serde(default)]
    message: String,
}

/// Parses a structured error envelope, if the body is one.
fn envelope(body: &str) -> Option<Envelope> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str::<Envelope>(trimmed).ok()
}

/// Returns true if the body is a structured success envelope.
pub(crate) fn is_success_envelope(body: &str) -> bool {
    envelope(body).is_some_and(|e| (200..300).contains(&e.status_code))
}

fn from_status(status: u16, body: String) -> EdgeResult<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(EdgeError::NotFound(body)),
        409 => Err(EdgeError::AlreadyExists(body)),
        _ => Err(EdgeError::Rejected { status, body }),
    }
}

/// Maps an HTTP status and body onto the error taxonomy.
///
/// # Errors
///
/// Returns the `EdgeError` the response represents.
pub fn classify_response(status: u16, body: &str) -> EdgeResult<()> {
    let text = body.trim_end();
    if text == LEGACY_NOT_FOUND || text.starts_with(LEGACY_NOT_FOUND_PREFIX) {
        return Err(EdgeError::NotFound(text.to_string()));
    }
    if let Some(env) = envelope(body) {
        return from_status(env.status_code, env.message);
    }
    from_status(status, text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_sentinels_are_not_found() {
        assert!(classify_response(404, "Item not found\n")
            .unwrap_err()
            .is_not_found());
        // Some releases answer 200 with the sentinel.
        assert!(classify_response(200, "Item not found")
            .unwrap_err()
            .is_not_found());
        assert!(classify_response(404, "no item found for name lamp")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn v2_envelope_is_normalized() {
        let body = r#"{"apiVersion":"v2","statusCode":404,"message":"device lamp does not exist"}"#;
        assert_eq!(
            classify_response(404, body).unwrap_err(),
            EdgeError::NotFound("device lamp does not exist".into())
        );

        let body = r#"{"apiVersion":"v2","statusCode":409,"message":"duplicate"}"#;
        assert!(classify_response(409, body).unwrap_err().is_already_exists());

        let body = r#"{"apiVersion":"v2","statusCode":200}"#;
        assert!(classify_response(200, body).is_ok());
        assert!(is_success_envelope(body));
    }

    #[test]
    fn other_failures_carry_body() {
        let err = classify_response(500, "boom").unwrap_err();
        assert_eq!(
            err,
            EdgeError::Rejected {
                status: 500,
                body: "boom".into()
            }
        );
        assert!(err.is_retryable());
        assert!(!EdgeError::NotFound("x".into()).is_retryable());
        assert!(classify_response(200, "edge-id-1").is_ok());
    }
}
