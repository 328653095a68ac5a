//! Content negotiation and the JSON response envelope.

use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;

use crate::errors::{RuntimeError, log_error_chain};

/// Output mode chosen for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Negotiation {
    /// Respond with a JSON envelope instead of HTML/plain text/raw bytes
    pub json: bool,

    /// Script-tag callback name wrapping the JSON envelope
    pub callback: Option<String>,
}

impl Negotiation {
    /// JSON is selected by an `Accept` or `Content-Type` mentioning `application/json`, or by a
    /// `format=json` query parameter.
    pub fn from_request(req: &HttpRequest) -> Self {
        let header_wants_json = |name: actix_web::http::header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains(mime::APPLICATION_JSON.as_ref()))
        };

        let mut format_json = false;
        let mut callback = None;
        for (key, value) in url::form_urlencoded::parse(req.query_string().as_bytes()) {
            match key.as_ref() {
                "format" if value == "json" => format_json = true,
                "callback" if is_valid_callback(&value) => callback = Some(value.into_owned()),
                _ => {}
            }
        }

        Self {
            json: format_json
                || header_wants_json(actix_web::http::header::ACCEPT)
                || header_wants_json(actix_web::http::header::CONTENT_TYPE),
            callback,
        }
    }
}

/// Callback names are restricted to dotted identifiers so they cannot inject script.
fn is_valid_callback(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
}

/// Uniform JSON body: `{code, message, data}`.
#[derive(Debug, Serialize, PartialEq)]
pub struct Envelope<T: Serialize> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: Option<T>) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: "OK".to_string(),
            data,
        }
    }
}

impl Envelope<()> {
    pub fn error(error: &RuntimeError) -> Self {
        Self {
            code: error.status_code().as_u16(),
            message: error.public_message(),
            data: None,
        }
    }
}

/// Successful response without a payload.
pub fn respond_ok(negotiation: &Negotiation) -> HttpResponse {
    if negotiation.json {
        respond_json(negotiation, StatusCode::OK, &Envelope::<()>::ok(None))
    } else {
        HttpResponse::Ok()
            .content_type(mime::TEXT_PLAIN_UTF_8)
            .body("OK")
    }
}

/// Successful JSON response carrying `data`.
pub fn respond_data<T: Serialize>(negotiation: &Negotiation, data: T) -> HttpResponse {
    respond_json(negotiation, StatusCode::OK, &Envelope::ok(Some(data)))
}

/// Renders an error in the negotiated mode.
pub fn respond_error(negotiation: &Negotiation, error: &RuntimeError) -> HttpResponse {
    if !negotiation.json {
        return error.error_response();
    }

    log_error_chain(error);
    respond_json(negotiation, error.status_code(), &Envelope::error(error))
}

fn respond_json<T: Serialize>(
    negotiation: &Negotiation,
    status: StatusCode,
    envelope: &Envelope<T>,
) -> HttpResponse {
    let body = match serde_json::to_string(envelope) {
        Ok(body) => body,
        Err(e) => {
            log::error!("Failed to serialize response envelope: {e}");
            return HttpResponse::InternalServerError()
                .content_type(mime::TEXT_PLAIN_UTF_8)
                .body("Server error");
        }
    };

    match &negotiation.callback {
        // Script tags ignore failed loads, so the status travels only inside the envelope.
        Some(callback) => HttpResponse::Ok()
            .content_type(mime::APPLICATION_JAVASCRIPT_UTF_8)
            .body(format!("{callback}({body})")),
        None => HttpResponse::build(status)
            .content_type(mime::APPLICATION_JSON)
            .body(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, test::TestRequest};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    #[test]
    fn negotiates_json_from_headers_and_query() {
        let plain = TestRequest::get().uri("/").to_http_request();
        assert!(!Negotiation::from_request(&plain).json);

        let accept = TestRequest::get()
            .uri("/")
            .insert_header(("Accept", "application/json, text/plain"))
            .to_http_request();
        assert!(Negotiation::from_request(&accept).json);

        let content_type = TestRequest::post()
            .uri("/")
            .insert_header(("Content-Type", "application/json"))
            .to_http_request();
        assert!(Negotiation::from_request(&content_type).json);

        let query = TestRequest::get()
            .uri("/a.txt?format=json&callback=cb")
            .to_http_request();
        assert_eq!(
            Negotiation::from_request(&query),
            Negotiation {
                json: true,
                callback: Some("cb".to_string()),
            }
        );
    }

    #[test]
    fn rejects_unsafe_callback_names() {
        let req = TestRequest::get()
            .uri("/?format=json&callback=alert(1)%3B")
            .to_http_request();
        assert_eq!(Negotiation::from_request(&req).callback, None);
    }

    #[actix_web::test]
    async fn error_envelope_carries_code_and_message() {
        let res = respond_error(
            &Negotiation {
                json: true,
                callback: None,
            },
            &RuntimeError::NotFound("Not found".to_string()),
        );
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(res.into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            json!({"code": 404, "message": "Not found", "data": null})
        );
    }

    #[actix_web::test]
    async fn callback_wraps_envelope() {
        let negotiation = Negotiation {
            json: true,
            callback: Some("handle".to_string()),
        };
        let res = respond_error(&negotiation, &RuntimeError::MethodNotAllowed);
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body()).await.unwrap();
        let body = std::str::from_utf8(&body).unwrap();
        assert!(body.starts_with("handle({"));
        assert!(body.contains("\"code\":405"));
        assert!(body.ends_with("})"));
    }
}
