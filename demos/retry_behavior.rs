//! Example demonstrating retry policies and per-call overrides.
//!
//! This example shows how to:
//! - Watch the loop exhaust its attempts against a failing endpoint
//! - Override the policy and success predicate for a single call
//! - Observe Retry-After handling on a 429
//!
//! Run with: `cargo run --example retry_behavior`

use autoauth::{CallOverrides, Error, RequestOptions, RetryPolicy, Session};
use http::Method;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("autoauth=debug,retry_behavior=info")
        .init();

    let session = Session::builder()
        .auth_endpoint(Method::GET, "https://httpbin.org/cookies/set/token/demo")?
        .expected(|r| r.is_success())
        .policy(RetryPolicy::new(3, Duration::from_millis(500)))
        .build()?;

    println!("=== Exhausting Retries ===");
    // Always answers 503; the loop runs all three attempts and then hands
    // back the last response instead of erroring.
    let response = session
        .request(
            Method::GET,
            "https://httpbin.org/status/503",
            RequestOptions::new(),
            CallOverrides::new().log_tag("flaky endpoint"),
        )
        .await?;
    println!("Last response: {} {}", response.status, response.reason());
    println!();

    println!("=== Per-Call Overrides ===");
    // One attempt only, and 404 counts as acceptable for this call.
    let response = session
        .request(
            Method::GET,
            "https://httpbin.org/status/404",
            RequestOptions::new(),
            CallOverrides::new()
                .expected(|r| r.status.as_u16() == 404)
                .max_tries(1),
        )
        .await?;
    println!("Accepted: {} {}", response.status, response.reason());
    println!();

    println!("=== Rate Limiting ===");
    // 429 responses are slept through per the server's Retry-After header,
    // falling back to the fixed delay when the header is missing or bad.
    let response = session
        .request(
            Method::GET,
            "https://httpbin.org/status/429",
            RequestOptions::new(),
            CallOverrides::new().max_tries(2).delay(Duration::from_secs(1)),
        )
        .await?;
    println!("Last response: {} {}", response.status, response.reason());

    Ok(())
}
