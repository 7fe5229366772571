//! Error types for session configuration and transport faults.
//!
//! Note that an exhausted retry loop is *not* an error: [`Session`](crate::Session)
//! always hands back the last response it obtained and leaves a warning in the
//! logs. Only transport-level faults and configuration mistakes surface as `Err`.

/// The error type for session operations.
///
/// # Examples
///
/// ```no_run
/// use autoauth::{Error, Session};
/// use http::Method;
///
/// # async fn example() -> Result<(), Error> {
/// let session = Session::builder()
///     .auth_endpoint(Method::POST, "https://api.example.com/login")?
///     .build()?;
///
/// match session.get("https://api.example.com/data").await {
///     Ok(response) => println!("status {}", response.status),
///     Err(Error::Transport(e)) => eprintln!("network fault: {e}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A fault raised by the underlying HTTP transport (connection failure,
    /// DNS lookup failure, timeout, ...).
    ///
    /// These are never absorbed by the retry loops; they propagate straight
    /// to the caller.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An invalid URL was supplied.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid session or request configuration, such as a missing
    /// authentication endpoint or a malformed header value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request body could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(String),
}

/// A specialized `Result` type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
