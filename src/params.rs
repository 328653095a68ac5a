//! Request parameter collection.
//!
//! Parameters come from the query string, a form-encoded body and a JSON object body. Later
//! sources win on key collisions: JSON body over form body over query string.

use actix_web::{
    HttpRequest,
    http::header,
    web::{self, Bytes, BytesMut},
};
use futures::StreamExt;
use serde_json::{Map, Value};

use crate::errors::RuntimeError;

pub type Params = Map<String, Value>;

/// Reads the whole request body, refusing anything larger than `limit` bytes.
pub async fn read_body(mut payload: web::Payload, limit: usize) -> Result<Bytes, RuntimeError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk
            .map_err(|e| RuntimeError::MalformedRequest(format!("Error reading body: {e}")))?;
        if body.len() + chunk.len() > limit {
            return Err(RuntimeError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// Collects the parameters of `req` given its already read body.
pub fn collect(req: &HttpRequest, body: &[u8]) -> Result<Params, RuntimeError> {
    let is_form = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.as_ref());

    parse(req.query_string(), is_form, body)
}

fn parse(query: &str, is_form: bool, body: &[u8]) -> Result<Params, RuntimeError> {
    let mut params = Params::new();
    merge_form(&mut params, query.as_bytes());
    if is_form {
        merge_form(&mut params, body);
    }

    let content = std::str::from_utf8(body).unwrap_or_default().trim();
    if content.starts_with('{') && content.ends_with('}') {
        let object: Params = serde_json::from_str(content).map_err(|e| {
            RuntimeError::MalformedRequest(format!("Error parsing input params: {e}"))
        })?;
        params.extend(object);
    }

    Ok(params)
}

fn merge_form(params: &mut Params, encoded: &[u8]) {
    let mut seen = std::collections::HashSet::new();
    for (key, value) in url::form_urlencoded::parse(encoded) {
        // First occurrence of a repeated key wins within one source.
        if seen.insert(key.clone()) {
            params.insert(key.into_owned(), Value::String(value.into_owned()));
        }
    }
}

/// Looks up a string parameter. Missing and `null` values are `None`.
pub fn string_param(params: &Params, key: &str) -> Result<Option<String>, RuntimeError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(RuntimeError::MalformedRequest(format!(
            "Parameter '{key}' must be a string"
        ))),
    }
}
