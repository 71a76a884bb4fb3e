use crate::errors::ForwardError;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use shared::http::full_body;

/// Collects at most `limit` bytes of `body` and parses them as JSON.
///
/// An empty body is read as `{}`, so it fails validation like any payload
/// without an email.
pub async fn read_json_body<B>(body: B, limit: usize) -> Result<Value, ForwardError>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<http_body_util::LengthLimitError>() {
                ForwardError::BodyTooLarge(limit)
            } else {
                ForwardError::InvalidBody(e.to_string())
            }
        })?
        .to_bytes();

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }

    serde_json::from_slice(&bytes).map_err(|e| ForwardError::InvalidBody(e.to_string()))
}

/// Serializes `value` into an `application/json` response.
pub fn json_response<T, E>(status: StatusCode, value: &T) -> Response<BoxBody<Bytes, E>>
where
    T: Serialize,
    E: 'static,
{
    match serde_json::to_vec(value) {
        Ok(bytes) => {
            let mut response = Response::new(full_body(bytes));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            shared::http::make_boxed_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
