//! Request decoding and response shaping.
//!
//! The GET handler reads the raw path straight off the request's `Uri`
//! rather than through axum's `Path` extractor, and the router it's
//! registered under never runs `tower_http::normalize_path` — both matter
//! because repeated `/` in a base64-encoded DER request are significant
//! data, not redundant path syntax, and must reach the decoder untouched.

use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::Engine;

use crate::error::ResolveError;
use crate::http::server::AppState;
use crate::metrics;
use crate::ocsp::wire;
use crate::resolver::ResponseHeaders;

const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

/// `GET /`: health/landing, no admission, no backend.
pub async fn root(State(state): State<AppState>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_str(&format!("max-age={}", state.root_max_age_seconds)).unwrap(),
    );
    (StatusCode::OK, headers, Bytes::new()).into_response()
}

/// `GET <prefix>/{base64-encoded OCSPRequest}`.
pub async fn get_request(State(state): State<AppState>, uri: OriginalUri) -> Response {
    let raw_path = uri.0.path();
    let Some(encoded) = raw_path.strip_prefix(state.path_prefix.as_str()) else {
        return malformed_response(&state, ResolveError::malformed("path does not match configured prefix"));
    };
    let encoded = encoded.trim_start_matches('/');

    let der = match decode_base64(encoded) {
        Ok(der) => der,
        Err(e) => return malformed_response(&state, e),
    };

    respond(&state, &der).await
}

/// `POST <prefix>` with `Content-Type: application/ocsp-request`, raw DER body.
pub async fn post_request(State(state): State<AppState>, body: Bytes) -> Response {
    respond(&state, &body).await
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, ResolveError> {
    // Accept both the standard and URL-safe alphabets, with or without
    // padding, since real clients send either (RFC 6960 §A.1 shows plain
    // base64 with '+' and '/').
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(encoded))
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(encoded))
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(encoded))
        .map_err(|e| ResolveError::malformed(format!("invalid base64: {e}")))
}

async fn respond(state: &AppState, der: &[u8]) -> Response {
    let resolved = state.resolver.resolve(der, state.shutdown.clone()).await;
    metrics::record_resolve(resolved.lookup_result, resolved.source_used);

    match resolved.bytes {
        Ok(bytes) => ok_response(state, bytes, &resolved.headers),
        Err(ResolveError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Err(e) => error_response(state, &e, &resolved.headers),
    }
}

fn malformed_response(state: &AppState, err: ResolveError) -> Response {
    error_response(state, &err, &ResponseHeaders::default())
}

fn ok_response(state: &AppState, bytes: Vec<u8>, resolved_headers: &ResponseHeaders) -> Response {
    let mut headers = base_headers(state, resolved_headers);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(OCSP_RESPONSE_CONTENT_TYPE));
    (StatusCode::OK, headers, bytes).into_response()
}

/// Request-level errors still get HTTP 200 with an OCSP-encoded error
/// status body — HTTP 4xx is reserved for framing failures
/// the axum router itself rejects (wrong method, etc.), never for
/// application-level OCSP outcomes.
fn error_response(state: &AppState, err: &ResolveError, resolved_headers: &ResponseHeaders) -> Response {
    let mut headers = base_headers(state, resolved_headers);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(OCSP_RESPONSE_CONTENT_TYPE));
    let body = wire::error_response_for(err);
    (StatusCode::OK, headers, body).into_response()
}

fn base_headers(state: &AppState, resolved_headers: &ResponseHeaders) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_str(&format!("max-age={}", state.max_age_seconds)).unwrap(),
    );
    if let Some(tag) = &resolved_headers.edge_cache_tag {
        if let Ok(value) = HeaderValue::from_str(tag) {
            headers.insert("Edge-Cache-Tag", value);
        }
    }
    headers
}
