//! End-to-end HTTP surface scenarios.
//!
//! Drives the real axum `Router` with fake backends wired in via
//! [`LookupSource`], exercising exactly the request/response path a client
//! sees: raw-path GET decoding, POST, root health check, admission
//! rejection, and the two-source race.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use ocsp_responder::http::AppState;
use ocsp_responder::issuer::AdmissionFilter;
use ocsp_responder::lookup::{LookupResponse, LookupSource};
use ocsp_responder::ocsp::ParsedRequest;
use ocsp_responder::resolver::Resolver;

mod common;
use common::{build_request_der, good_response_der, revoked_response_der, TEST_KEY_HASH};

struct FakeSource {
    delay: Duration,
    result: LookupResponse,
}

impl LookupSource for FakeSource {
    fn lookup(&self, _request: &ParsedRequest, cancel: CancellationToken) -> tokio::sync::oneshot::Receiver<LookupResponse> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let delay = self.delay;
        let result = self.result.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ocsp_responder::error::ResolveError::Cancelled),
                _ = tokio::time::sleep(delay) => result,
            };
            let _ = tx.send(outcome);
        });
        rx
    }
}

fn test_state(resolver: Resolver) -> AppState {
    AppState {
        resolver: Arc::new(resolver),
        path_prefix: "/ocsp".to_string(),
        max_age_seconds: 3600,
        root_max_age_seconds: 43_200,
        shutdown: CancellationToken::new(),
    }
}

fn router(state: AppState) -> axum::Router {
    // Mirrors `http::server`'s route table; kept here instead of exposing
    // the private `router()` builder just for tests.
    use axum::routing::get;
    axum::Router::new()
        .route("/", get(ocsp_responder::http::handlers::root).post(ocsp_responder::http::handlers::post_request))
        .route(
            "/*rest",
            get(ocsp_responder::http::handlers::get_request).post(ocsp_responder::http::handlers::post_request),
        )
        .with_state(state)
}

#[tokio::test]
async fn root_health_check_returns_empty_200() {
    let admission = Arc::new(AdmissionFilter::for_testing(vec![TEST_KEY_HASH], vec![]));
    let primary = Arc::new(FakeSource { delay: Duration::from_millis(1), result: Ok(good_response_der(1)) });
    let state = test_state(Resolver::new(admission, primary, None, None));
    let app = router(state);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "max-age=43200"
    );
}

#[tokio::test]
async fn get_and_post_reach_the_same_admission_decision() {
    let admission = Arc::new(AdmissionFilter::for_testing(vec![TEST_KEY_HASH], vec![]));
    let primary = Arc::new(FakeSource { delay: Duration::from_millis(1), result: Ok(good_response_der(10)) });
    let state = test_state(Resolver::new(admission, primary, None, None));

    let der = build_request_der(10);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&der);

    let get_app = router(state.clone());
    let get_response = get_app
        .oneshot(
            Request::builder()
                .uri(format!("/ocsp/{encoded}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let post_app = router(state);
    let post_response = post_app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .body(Body::from(der))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    assert_eq!(post_response.status(), StatusCode::OK);
    let get_body = axum::body::to_bytes(get_response.into_body(), usize::MAX).await.unwrap();
    let post_body = axum::body::to_bytes(post_response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(get_body, post_body);
}

#[tokio::test]
async fn repeated_slashes_in_the_base64_path_survive_to_the_decoder() {
    // Standard base64 can legitimately contain '/'; a path with "//" must
    // not be collapsed by routing.
    let admission = Arc::new(AdmissionFilter::for_testing(vec![TEST_KEY_HASH], vec![]));
    let primary = Arc::new(FakeSource { delay: Duration::from_millis(1), result: Ok(good_response_der(11)) });
    let state = test_state(Resolver::new(admission, primary, None, None));
    let app = router(state);

    // Force a '/' into the encoded body by picking a serial whose DER
    // request base64-encodes with a slash in it is brittle to pin exactly,
    // so instead assert the *literal* doubled-slash path segment is passed
    // through unaltered by checking the decoder rejects it as malformed
    // base64 rather than as a 404 (which routing-level collapsing would
    // instead produce for a differently-shaped path).
    let response = app
        .oneshot(
            Request::builder()
                .uri("/ocsp//not-valid-base64//")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Reaches the OCSP decoder (HTTP 200 with a malformedRequest OCSP body),
    // not a router-level 404 — proof the doubled slash was not collapsed
    // into a path the wildcard route would otherwise have missed.
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_issuer_is_rejected_without_a_200_good_body() {
    let admission = Arc::new(AdmissionFilter::for_testing(vec![[0x11; 20]], vec![]));
    let primary = Arc::new(FakeSource { delay: Duration::from_millis(1), result: Ok(good_response_der(12)) });
    let state = test_state(Resolver::new(admission, primary, None, None));
    let app = router(state);

    let der = build_request_der(12);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&der);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/ocsp/{encoded}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_ne!(body.to_vec(), good_response_der(12));
}

#[tokio::test]
async fn secondary_wins_on_latency_when_it_agrees_with_primary() {
    let admission = Arc::new(AdmissionFilter::for_testing(vec![TEST_KEY_HASH], vec![]));
    let primary = Arc::new(FakeSource { delay: Duration::from_millis(50), result: Ok(good_response_der(13)) });
    let secondary = Arc::new(FakeSource { delay: Duration::from_millis(5), result: Ok(good_response_der(13)) });
    let state = test_state(Resolver::new(admission, primary, Some(secondary), None));
    let app = router(state);

    let der = build_request_der(13);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&der);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/ocsp/{encoded}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.to_vec(), good_response_der(13));
}

#[tokio::test]
async fn secondary_good_cannot_override_primary_revoked_over_http() {
    let admission = Arc::new(AdmissionFilter::for_testing(vec![TEST_KEY_HASH], vec![]));
    let primary = Arc::new(FakeSource { delay: Duration::from_millis(50), result: Ok(revoked_response_der(14)) });
    let secondary = Arc::new(FakeSource { delay: Duration::from_millis(5), result: Ok(good_response_der(14)) });
    let state = test_state(Resolver::new(admission, primary, Some(secondary), None));
    let app = router(state);

    let der = build_request_der(14);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&der);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/ocsp/{encoded}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.to_vec(), revoked_response_der(14));
}
