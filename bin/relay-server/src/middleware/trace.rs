use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::entities::credential::mask;
use crate::error::ServerError;

pub static X_TRACE_ID: &str = "x-trace-id";

const MAX_LOGGED_BODY: usize = 1024;
/// Same ceiling as axum's default `Json` body limit.
const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;
const SECRET_FIELD: &str = "apiKey";

pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let (parts, body) = req.into_parts();
        let req_bytes = match collect_request(body).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let mut response = e.into_response();
                if let Some(value) = trace_header {
                    response.headers_mut().insert(X_TRACE_ID, value);
                }
                return response;
            }
        };
        log_body("request", &parts.headers, &req_bytes);
        let mut req = Request::from_parts(parts, Body::from(req_bytes));
        if let Some(value) = &trace_header {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let response = next.run(req).await;

        let (parts, body) = response.into_parts();
        let res_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "failed to buffer response body");
                Bytes::new()
            }
        };
        log_body("response", &parts.headers, &res_bytes);
        let mut response = Response::from_parts(parts, Body::from(res_bytes));
        if let Some(value) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        response
    }
    .instrument(span)
    .await
}

/// Buffer a request body, refusing anything over [`MAX_REQUEST_BODY`].
async fn collect_request(body: Body) -> Result<Bytes, ServerError> {
    match Limited::new(body, MAX_REQUEST_BODY).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(limit = MAX_REQUEST_BODY, "request body too large");
            Err(ServerError::PayloadTooLarge(format!(
                "request body exceeds {MAX_REQUEST_BODY} bytes"
            )))
        }
        Err(e) => {
            warn!(error = %e, "failed to buffer request body");
            Err(ServerError::BadRequest("failed to read request body".to_owned()))
        }
    }
}

/// Log a body when it is a small JSON document.
fn log_body(direction: &str, headers: &header::HeaderMap, bytes: &Bytes) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.contains("application/json") && bytes.len() < MAX_LOGGED_BODY {
        info!(direction, body = %redacted(bytes), "body");
    } else if !bytes.is_empty() {
        info!(direction, content_type, size = bytes.len(), "body skipped");
    }
}

/// Render a JSON body for logging with every `apiKey` string masked.
fn redacted(bytes: &[u8]) -> String {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(mut value) => {
            mask_secrets(&mut value);
            value.to_string()
        }
        Err(_) => "[unparsable JSON]".to_owned(),
    }
}

fn mask_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                match v {
                    Value::String(s) if key == SECRET_FIELD && !s.is_empty() => {
                        *s = mask(s);
                    }
                    other => mask_secrets(other),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_secrets),
        _ => {}
    }
}
