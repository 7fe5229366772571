//! Basic example demonstrating a session with cookie-based re-authentication.
//!
//! This example shows how to:
//! - Configure the dedicated authentication endpoint
//! - Make a GET request through the retry loop
//! - Access response status, headers, elapsed time, and body
//!
//! Run with: `cargo run --example basic_request`

use autoauth::{CallOverrides, Error, RequestOptions, RetryPolicy, Session};
use http::Method;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("autoauth=debug,basic_request=info")
        .init();

    // httpbin's cookie endpoints stand in for a login flow: the auth call
    // sets a cookie, later requests ride on it.
    let session = Session::builder()
        .auth_endpoint(Method::GET, "https://httpbin.org/cookies/set/token/demo")?
        .auth_expected(|r| r.is_success())
        .expected(|r| r.is_success())
        .policy(RetryPolicy::new(3, Duration::from_secs(1)))
        .build()?;

    println!("=== Authentication Example ===");
    let response = session.auth_request().await?;
    println!("Login status: {}", response.status);
    println!("Final URL: {}", response.url);
    println!();

    println!("=== GET Request Example ===");
    let response = session
        .request(
            Method::GET,
            "https://httpbin.org/cookies",
            RequestOptions::new().header("Accept", "application/json")?,
            CallOverrides::new().log_tag("read cookies back"),
        )
        .await?;

    println!("Status: {} {}", response.status, response.reason());
    println!("Elapsed: {:?}", response.elapsed);
    println!("Body: {}", response.body);
    println!("Content-Type: {:?}", response.header("content-type"));

    // Exhausted retries never raise: check the response yourself.
    if !response.is_success() {
        println!("request did not succeed, see the warning above");
    }

    Ok(())
}
