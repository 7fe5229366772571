//! Retry policies, success predicates, and per-call overrides.
//!
//! A [`RetryPolicy`] bounds one retry loop: how many attempts to make and how
//! long to sleep between them when the server gives no rate-limit hint. A
//! [`SuccessPredicate`] decides whether a response ends the loop. The session
//! holds one policy/predicate pair for ordinary requests and an independent
//! pair for authentication requests; [`CallOverrides`] replaces either pair's
//! values for a single call.

use crate::Response;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a response is acceptable, ending the retry loop.
///
/// Predicates must be pure: they are invoked once per attempt and must not
/// mutate shared state.
pub type SuccessPredicate = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// The default predicate: every response is acceptable.
pub fn accept_any() -> SuccessPredicate {
    Arc::new(|_| true)
}

/// Bounds for one retry loop: maximum attempt count and the fixed backoff
/// delay used when the server supplies no rate-limit hint.
///
/// Constructors clamp their inputs: `max_tries` is raised to at least 1 and a
/// negative delay becomes zero, so a policy always permits one attempt and
/// never produces a nonsensical sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_tries: usize,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy from an attempt count and a fixed delay.
    ///
    /// `max_tries` is clamped to a minimum of 1.
    pub fn new(max_tries: usize, delay: Duration) -> Self {
        Self {
            max_tries: max_tries.max(1),
            delay,
        }
    }

    /// Creates a policy from an attempt count and a delay in seconds.
    ///
    /// Negative, non-finite, or overflowing delays are clamped to zero.
    pub fn from_secs_f64(max_tries: usize, delay_secs: f64) -> Self {
        let delay = Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::ZERO);
        Self::new(max_tries, delay)
    }

    /// The maximum number of attempts (always ≥ 1).
    pub fn max_tries(&self) -> usize {
        self.max_tries
    }

    /// The fixed backoff delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Applies per-call overrides, re-clamping the result.
    pub(crate) fn with_overrides(&self, max_tries: Option<usize>, delay: Option<Duration>) -> Self {
        Self::new(
            max_tries.unwrap_or(self.max_tries),
            delay.unwrap_or(self.delay),
        )
    }
}

impl Default for RetryPolicy {
    /// Three attempts, two seconds between them.
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Per-call replacements for a session's retry defaults.
///
/// Any field left unset falls back to the session-level value for the call in
/// question (the ordinary pair for [`Session::request`], the authentication
/// pair for [`Session::auth_request_with`]).
///
/// [`Session::request`]: crate::Session::request
/// [`Session::auth_request_with`]: crate::Session::auth_request_with
///
/// # Examples
///
/// ```
/// use autoauth::CallOverrides;
/// use std::time::Duration;
///
/// let call = CallOverrides::new()
///     .expected(|r| r.status.as_u16() == 200)
///     .max_tries(5)
///     .delay(Duration::from_millis(500))
///     .log_tag("fetch widgets");
/// ```
#[derive(Clone, Default)]
pub struct CallOverrides {
    pub(crate) expected: Option<SuccessPredicate>,
    pub(crate) max_tries: Option<usize>,
    pub(crate) delay: Option<Duration>,
    pub(crate) log_tag: Option<String>,
}

impl CallOverrides {
    /// Creates an empty set of overrides (session defaults apply).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the success predicate for this call.
    pub fn expected<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.expected = Some(Arc::new(predicate));
        self
    }

    /// Replaces the maximum attempt count for this call (clamped to ≥ 1).
    pub fn max_tries(mut self, max_tries: usize) -> Self {
        self.max_tries = Some(max_tries);
        self
    }

    /// Replaces the fixed backoff delay for this call.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Attaches a tag emitted in an info-level log line once the call
    /// finishes, together with the number of attempts used.
    pub fn log_tag(mut self, tag: impl Into<String>) -> Self {
        self.log_tag = Some(tag.into());
        self
    }
}
