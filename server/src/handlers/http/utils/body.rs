use bytes::Bytes;
use hyper::Request;
use hyper::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ApiError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Deserialize a request body sent either as JSON or as a urlencoded form.
/// `expected` is used as the detail of the 400 when neither parses.
pub fn parse_body<T: DeserializeOwned>(req: &Request<Bytes>, expected: &str) -> Result<T, ApiError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let parsed = if content_type.starts_with(FORM_CONTENT_TYPE) {
        debug!("Parsing form body ({} bytes)", req.body().len());
        let fields: Map<String, Value> = form_urlencoded::parse(req.body())
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        serde_json::from_value(Value::Object(fields))
    } else {
        debug!("Parsing JSON body ({} bytes)", req.body().len());
        serde_json::from_slice(req.body())
    };

    parsed.map_err(|e| {
        warn!("Rejected body for {}: {}", req.uri().path(), e);
        ApiError::wrong_body_format(expected)
    })
}
