//! Response relay.
//!
//! # Responsibilities
//! - Map an [`OutboundOutcome`] onto the response sent to the caller
//! - Present every body as JSON
//!
//! # Design Decisions
//! - Target status codes pass through untouched, 4xx/5xx included
//! - A JSON body is relayed byte-for-byte; other bodies become a JSON string
//! - Target response headers are not relayed
//! - Failures without a status map to 500 with `{error, details}`

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value};

use crate::forwarding::OutboundOutcome;

/// Details reported when the target produced no readable response.
pub const NO_RESPONSE_DETAILS: &str = "No response from target server";

/// Build the caller's response for an outcome.
pub fn relay(outcome: OutboundOutcome) -> Response {
    match outcome {
        OutboundOutcome::Success { status, body, .. } => relay_success(status, body),
        OutboundOutcome::Failure {
            status,
            message,
            details,
        } => {
            let details = details
                .filter(|d| !d.is_empty())
                .map(|d| body_as_json(&d))
                .unwrap_or_else(|| Value::String(NO_RESPONSE_DETAILS.to_string()));
            (
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(json!({ "error": message, "details": details })),
            )
                .into_response()
        }
    }
}

fn relay_success(status: StatusCode, body: Bytes) -> Response {
    if body.is_empty() {
        return status.into_response();
    }

    let body = if serde_json::from_slice::<Value>(&body).is_ok() {
        body
    } else {
        match serde_json::to_vec(&Value::String(String::from_utf8_lossy(&body).into_owned())) {
            Ok(encoded) => Bytes::from(encoded),
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Interpret a body as JSON, falling back to a string.
fn body_as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    async fn read(response: Response) -> (StatusCode, Option<String>, Bytes) {
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body)
    }

    fn success(status: u16, body: &'static [u8]) -> OutboundOutcome {
        OutboundOutcome::Success {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn test_json_relayed_verbatim() {
        let (status, ct, body) = read(relay(success(201, br#"{ "a" : 1 }"#))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(ct.as_deref(), Some("application/json"));
        assert_eq!(&body[..], br#"{ "a" : 1 }"#);
    }

    #[tokio::test]
    async fn test_non_2xx_passes_through() {
        let (status, _, body) = read(relay(success(404, br#"{"x":"y"}"#))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(&body[..], br#"{"x":"y"}"#);
    }

    #[tokio::test]
    async fn test_text_becomes_json_string() {
        let (_, ct, body) = read(relay(success(200, b"<h1>hi</h1>"))).await;
        assert_eq!(ct.as_deref(), Some("application/json"));
        assert_eq!(&body[..], br#""<h1>hi</h1>""#);
    }

    #[tokio::test]
    async fn test_empty_body_stays_empty() {
        let (status, ct, body) = read(relay(success(204, b""))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(ct.is_none());
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_failure_without_status() {
        let outcome = OutboundOutcome::Failure {
            status: None,
            message: "connection refused".into(),
            details: None,
        };
        let (status, _, body) = read(relay(outcome)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            json!({ "error": "connection refused", "details": NO_RESPONSE_DETAILS })
        );
    }

    #[tokio::test]
    async fn test_failure_with_status_and_details() {
        let outcome = OutboundOutcome::Failure {
            status: Some(StatusCode::BAD_GATEWAY),
            message: "error decoding response body".into(),
            details: Some(Bytes::from_static(br#"{"partial":true}"#)),
        };
        let (status, _, body) = read(relay(outcome)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["details"], json!({ "partial": true }));
    }
}
