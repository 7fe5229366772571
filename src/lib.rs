//! # autoauth - a retrying HTTP session that logs itself back in
//!
//! `autoauth` wraps an HTTP transport in retry loops that re-authenticate on
//! 401, honor server-side `Retry-After` rate limiting, and back off with a
//! fixed delay otherwise. It is not an HTTP client: connection management,
//! TLS, and redirects belong to the transport (stock implementation on
//! `reqwest`); this crate owns only the control logic around it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use autoauth::{CallOverrides, RequestOptions, RetryPolicy, Session};
//! use http::Method;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), autoauth::Error> {
//!     let session = Session::builder()
//!         // The dedicated endpoint used to refresh credentials after a 401.
//!         .auth_endpoint(Method::POST, "https://api.example.com/login")?
//!         .auth_options(RequestOptions::new().json(&serde_json::json!({
//!             "user": "bot",
//!             "key": "secret",
//!         }))?)
//!         .auth_expected(|r| r.is_success())
//!         // Ordinary requests: up to 3 attempts, 2 seconds apart.
//!         .expected(|r| r.is_success())
//!         .policy(RetryPolicy::new(3, Duration::from_secs(2)))
//!         .build()?;
//!
//!     let response = session
//!         .request(
//!             Method::GET,
//!             "https://api.example.com/widgets",
//!             RequestOptions::new(),
//!             CallOverrides::new().log_tag("list widgets"),
//!         )
//!         .await?;
//!
//!     // Exhausted retries are not an error; inspect the response yourself.
//!     println!("{} after {:?}: {}", response.status, response.elapsed, response.body);
//!     Ok(())
//! }
//! ```
//!
//! ## How a request is retried
//!
//! Each call runs up to `max_tries` attempts. After every attempt the
//! response is handed to the call's success predicate; an accepted response
//! ends the loop. Between attempts the loop reacts to the status it saw:
//!
//! - **401** - one full nested authentication cycle (its own predicate,
//!   attempt bound, and delay), then the fixed delay. The nested cycle's
//!   outcome never aborts the outer loop.
//! - **429** - sleep for the server's `Retry-After` hint, falling back to
//!   the fixed delay when the header is absent or malformed.
//! - anything else - sleep for the fixed delay.
//!
//! When the attempts run out the **last response is returned as `Ok`** and a
//! warning with the full call signature and response is logged. Only
//! transport faults (connection errors, timeouts) surface as `Err`.
//!
//! ## Observability
//!
//! The session speaks `tracing`: a `debug!` per attempt, a `warn!` dump on
//! exhaustion, and an `info!` line carrying the attempt count whenever a
//! call sets [`CallOverrides::log_tag`]. Install any `tracing` subscriber to
//! collect them.

mod error;
pub mod policy;
pub mod rate_limit;
mod request;
mod response;
mod session;
pub mod transport;

pub use error::{Error, Result};
pub use policy::{CallOverrides, RetryPolicy, SuccessPredicate};
pub use request::RequestOptions;
pub use response::Response;
pub use session::{AuthOverrides, Session, SessionBuilder};
pub use transport::Transport;
