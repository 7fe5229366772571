//! Integration tests using wiremock to simulate HTTP servers.

use autoauth::{CallOverrides, Error, RequestOptions, RetryPolicy, Session};
use http::Method;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Credentials {
    user: String,
    key: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Builds a session against `server` with 2xx-only predicates and fast
/// backoff, leaving everything else at defaults.
fn quick_session(server: &MockServer, delay: Duration) -> Session {
    init_tracing();
    Session::builder()
        .auth_endpoint(Method::POST, format!("{}/login", server.uri()))
        .unwrap()
        .auth_expected(|r| r.is_success())
        .auth_policy(RetryPolicy::new(2, delay))
        .expected(|r| r.is_success())
        .policy(RetryPolicy::new(3, delay))
        .build()
        .unwrap()
}

#[tokio::test]
async fn succeeds_on_first_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
        .expect(1)
        .mount(&server)
        .await;

    let session = quick_session(&server, Duration::from_millis(10));
    let response = session
        .get(format!("{}/data", server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert!(response.is_success());
    assert_eq!(response.body, "{\"ok\":true}");
    assert_eq!(response.json::<serde_json::Value>().unwrap()["ok"], true);
}

#[tokio::test]
async fn exhausted_retries_return_last_response_after_two_sleeps() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let session = quick_session(&server, Duration::from_millis(300));
    let start = Instant::now();
    let response = session
        .get(format!("{}/data", server.uri()))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // Never an error: the last response comes back as-is.
    assert_eq!(response.status.as_u16(), 500);
    assert_eq!(response.body, "boom");
    // Three attempts, but the fixed delay is slept only between them.
    assert!(
        elapsed >= Duration::from_millis(600),
        "expected two backoff sleeps, got {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(880),
        "expected no sleep after the final attempt, got {elapsed:?}"
    );
}

#[tokio::test]
async fn stops_retrying_once_predicate_passes() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(move |_req: &wiremock::Request| {
            if hits_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(503).set_body_string("warming up")
            } else {
                ResponseTemplate::new(200).set_body_string("ready")
            }
        })
        .mount(&server)
        .await;

    let session = Session::builder()
        .auth_endpoint(Method::POST, format!("{}/login", server.uri()))
        .unwrap()
        .expected(|r| r.is_success())
        .policy(RetryPolicy::new(5, Duration::from_millis(10)))
        .build()
        .unwrap();

    let response = session
        .request(
            Method::GET,
            format!("{}/data", server.uri()),
            RequestOptions::new(),
            CallOverrides::new().log_tag("warmup fetch"),
        )
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_after_header_wins_over_fixed_delay() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(move |_req: &wiremock::Request| {
            if hits_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "1")
                    .set_body_string("slow down")
            } else {
                ResponseTemplate::new(200).set_body_string("ok")
            }
        })
        .mount(&server)
        .await;

    // Fixed delay of 5s would blow the upper bound below if it were used.
    let session = quick_session(&server, Duration::from_secs(5));
    let start = Instant::now();
    let response = session
        .get(format!("{}/data", server.uri()))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(
        elapsed >= Duration::from_millis(900),
        "expected the 1s Retry-After sleep, got {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(4),
        "fixed delay used instead of Retry-After, got {elapsed:?}"
    );
}

#[tokio::test]
async fn malformed_retry_after_falls_back_to_fixed_delay() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(move |_req: &wiremock::Request| {
            if hits_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "soon")
                    .set_body_string("slow down")
            } else {
                ResponseTemplate::new(200).set_body_string("ok")
            }
        })
        .mount(&server)
        .await;

    let session = quick_session(&server, Duration::from_millis(100));
    let start = Instant::now();
    let response = session
        .get(format!("{}/data", server.uri()))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(
        elapsed < Duration::from_secs(1),
        "malformed header should not stall the loop, got {elapsed:?}"
    );
}

#[tokio::test]
async fn overflowing_retry_after_falls_back_to_fixed_delay() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();

    // Finite and non-negative, but far beyond what a Duration can hold. A
    // hostile server must not be able to crash the loop.
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(move |_req: &wiremock::Request| {
            if hits_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "1e300")
                    .set_body_string("slow down")
            } else {
                ResponseTemplate::new(200).set_body_string("ok")
            }
        })
        .mount(&server)
        .await;

    let session = quick_session(&server, Duration::from_millis(50));
    let start = Instant::now();
    let response = session
        .get(format!("{}/data", server.uri()))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(elapsed >= Duration::from_millis(50));
    assert!(
        elapsed < Duration::from_secs(1),
        "oversized header should fall back to the fixed delay, got {elapsed:?}"
    );
}

#[tokio::test]
async fn unauthorized_response_triggers_one_auth_cycle() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(&Credentials {
            user: "bot".to_string(),
            key: "secret".to_string(),
        }))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(move |_req: &wiremock::Request| {
            if hits_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(401).set_body_string("who are you")
            } else {
                ResponseTemplate::new(200).set_body_string("hello bot")
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    let session = Session::builder()
        .auth_endpoint(Method::POST, format!("{}/login", server.uri()))
        .unwrap()
        .auth_options(
            RequestOptions::new()
                .json(&Credentials {
                    user: "bot".to_string(),
                    key: "secret".to_string(),
                })
                .unwrap(),
        )
        .auth_expected(|r| r.is_success())
        .expected(|r| r.is_success())
        .policy(RetryPolicy::new(3, Duration::from_millis(10)))
        .build()
        .unwrap();

    let response = session
        .get(format!("{}/data", server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.body, "hello bot");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn auth_cookie_is_carried_into_retried_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Set-Cookie", "token=fresh; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    // With the cookie the data endpoint answers; without it, 401.
    Mock::given(method("GET"))
        .and(path("/data"))
        .and(header("Cookie", "token=fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("authorized"))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(10)
        .mount(&server)
        .await;

    let session = Session::builder()
        .auth_endpoint(Method::POST, format!("{}/login", server.uri()))
        .unwrap()
        .auth_expected(|r| r.is_success())
        .expected(|r| r.is_success())
        .policy(RetryPolicy::new(3, Duration::from_millis(10)))
        .build()
        .unwrap();

    let response = session
        .get(format!("{}/data", server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.body, "authorized");
}

#[tokio::test]
async fn per_call_overrides_shrink_the_attempt_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let session = quick_session(&server, Duration::from_millis(10));
    let response = session
        .request(
            Method::GET,
            format!("{}/data", server.uri()),
            RequestOptions::new(),
            // Zero is coerced up to a single attempt.
            CallOverrides::new().max_tries(0),
        )
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 500);
}

#[tokio::test]
async fn query_parameters_and_headers_reach_the_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(wiremock::matchers::query_param("q", "widgets"))
        .and(header("X-Trace", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("found"))
        .expect(1)
        .mount(&server)
        .await;

    let session = quick_session(&server, Duration::from_millis(10));
    let response = session
        .request(
            Method::GET,
            format!("{}/search", server.uri()),
            RequestOptions::new()
                .query("q", "widgets")
                .header("X-Trace", "abc123")
                .unwrap(),
            CallOverrides::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.body, "found");
}

#[tokio::test]
async fn transport_fault_propagates_to_caller() {
    // Nothing listens on port 1; the transport's connection error must cross
    // the retry loop untouched.
    let session = Session::builder()
        .auth_endpoint(Method::POST, "http://127.0.0.1:1/login")
        .unwrap()
        .policy(RetryPolicy::new(3, Duration::from_millis(10)))
        .build()
        .unwrap();

    let result = session.get("http://127.0.0.1:1/data").await;

    match result {
        Err(Error::Transport(_)) => {}
        other => panic!("expected a transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_url_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let session = quick_session(&server, Duration::from_millis(10));

    let result = session.get("not a url").await;
    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}
