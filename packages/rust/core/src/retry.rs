//! Bounded retry with server-directed backoff.
//!
//! [`RetryPolicy::invoke`] runs an async operation until it succeeds, fails
//! permanently, or has failed transiently `max_retries` times. It knows
//! nothing about translation: any error type that implements [`Retryable`]
//! can be driven through it.
//!
//! On a transient failure the wait is whatever delay the failure message
//! suggests (see [`parse_suggested_delay`]) or `base_delay`, plus one second.

use std::fmt;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use essaybridge_shared::{EssayBridgeError, RetryConfig};

/// Padding added on top of every computed wait.
const DELAY_PADDING: Duration = Duration::from_secs(1);

/// How a failure should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service asked us to slow down (quota exhausted, overloaded).
    Transient,
    /// Transport-level failure. Retried only under [`NetworkErrorPolicy::Transient`].
    Network,
    /// Anything else. Never retried.
    Permanent,
}

/// Errors the retry loop can classify.
///
/// The `Display` output is handed to the delay parser, so it should carry the
/// raw service payload when there is one.
pub trait Retryable: fmt::Display {
    fn failure_kind(&self) -> FailureKind;
}

impl Retryable for EssayBridgeError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            EssayBridgeError::RateLimited { .. } => FailureKind::Transient,
            EssayBridgeError::Network(_) => FailureKind::Network,
            _ => FailureKind::Permanent,
        }
    }
}

/// Whether network errors count as transient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkErrorPolicy {
    #[default]
    Permanent,
    Transient,
}

impl NetworkErrorPolicy {
    pub fn from_retry_flag(retry_network_errors: bool) -> Self {
        if retry_network_errors {
            Self::Transient
        } else {
            Self::Permanent
        }
    }
}

/// Decision for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Not retryable; surface the error as is.
    Fail,
    /// Retryable, but the attempt budget is spent.
    GiveUp,
    /// Wait this long, then try again.
    RetryAfter(Duration),
}

/// Terminal failure of [`RetryPolicy::invoke`].
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed transiently.
    Exhausted { attempts: u32, last: E },
    /// The operation failed in a way that retrying cannot fix.
    Permanent(E),
}

impl<E> RetryError<E> {
    /// The underlying failure.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent(e) => e,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            Self::Permanent(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Permanent(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Sleeping
// ---------------------------------------------------------------------------

/// Something that can wait. Swapped out in tests so nothing actually sleeps.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real wall-clock sleeping on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ---------------------------------------------------------------------------
// Delay parsing
// ---------------------------------------------------------------------------

static RETRY_DELAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]retryDelay['"]\s*:\s*['"](\d+)s['"]"#).expect("valid retryDelay regex")
});

/// Extract a server-suggested wait from a failure message.
///
/// Recognises `"retryDelay": "7s"` and `'retryDelay': '7s'`. Only whole
/// seconds are understood; anything else yields `None`.
pub fn parse_suggested_delay(message: &str) -> Option<Duration> {
    RETRY_DELAY_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(Duration::from_secs)
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Retry policy applied around a single fallible call.
#[derive(Debug, Clone)]
pub struct RetryPolicy<S = TokioSleeper> {
    max_retries: u32,
    base_delay: Duration,
    network_errors: NetworkErrorPolicy,
    delay_parser: fn(&str) -> Option<Duration>,
    sleeper: S,
}

impl RetryPolicy<TokioSleeper> {
    /// `max_retries` below 1 is treated as 1.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
            network_errors: NetworkErrorPolicy::default(),
            delay_parser: parse_suggested_delay,
            sleeper: TokioSleeper,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_secs(config.base_delay_secs))
            .with_network_errors(NetworkErrorPolicy::from_retry_flag(
                config.retry_network_errors,
            ))
    }
}

impl<S: Sleeper> RetryPolicy<S> {
    pub fn with_network_errors(mut self, policy: NetworkErrorPolicy) -> Self {
        self.network_errors = policy;
        self
    }

    pub fn with_delay_parser(mut self, parser: fn(&str) -> Option<Duration>) -> Self {
        self.delay_parser = parser;
        self
    }

    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> RetryPolicy<T> {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.base_delay,
            network_errors: self.network_errors,
            delay_parser: self.delay_parser,
            sleeper,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed.
    pub fn decide(&self, attempt: u32, kind: FailureKind, message: &str) -> RetryDecision {
        let transient = match kind {
            FailureKind::Transient => true,
            FailureKind::Network => self.network_errors == NetworkErrorPolicy::Transient,
            FailureKind::Permanent => false,
        };

        if !transient {
            return RetryDecision::Fail;
        }
        if attempt >= self.max_retries {
            return RetryDecision::GiveUp;
        }

        let wait = (self.delay_parser)(message).unwrap_or(self.base_delay);
        RetryDecision::RetryAfter(wait + DELAY_PADDING)
    }

    /// Run `op` until it succeeds or the policy says stop.
    pub async fn invoke<F, Fut, T, E>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    let message = e.to_string();
                    match self.decide(attempt, e.failure_kind(), &message) {
                        RetryDecision::Fail => return Err(RetryError::Permanent(e)),
                        RetryDecision::GiveUp => {
                            warn!(attempts = attempt, error = %message, "retries exhausted");
                            return Err(RetryError::Exhausted {
                                attempts: attempt,
                                last: e,
                            });
                        }
                        RetryDecision::RetryAfter(wait) => {
                            warn!(
                                attempt,
                                max = self.max_retries,
                                wait_secs = wait.as_secs(),
                                "transient failure, backing off"
                            );
                            self.sleeper.sleep(wait).await;
                            attempt += 1;
                        }
                    }
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSleeper;
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max: u32) -> (RetryPolicy<RecordingSleeper>, RecordingSleeper) {
        let sleeper = RecordingSleeper::default();
        let p = RetryPolicy::new(max, Duration::from_secs(60)).with_sleeper(sleeper.clone());
        (p, sleeper)
    }

    fn rate_limited(body: &str) -> EssayBridgeError {
        EssayBridgeError::RateLimited {
            message: format!("HTTP 429: {body}"),
        }
    }

    #[test]
    fn parse_json_retry_delay() {
        let body = r#"{"details":[{"@type":"RetryInfo","retryDelay": "7s"}]}"#;
        assert_eq!(parse_suggested_delay(body), Some(Duration::from_secs(7)));
    }

    #[test]
    fn parse_python_repr_retry_delay() {
        let msg = "429 RESOURCE_EXHAUSTED. {'retryDelay': '42s'}";
        assert_eq!(parse_suggested_delay(msg), Some(Duration::from_secs(42)));
    }

    #[test]
    fn parse_rejects_unrecognised_delays() {
        assert_eq!(parse_suggested_delay("no hint here"), None);
        assert_eq!(parse_suggested_delay(r#""retryDelay": "1.5s""#), None);
        assert_eq!(parse_suggested_delay(r#""retryDelay": "7m""#), None);
    }

    #[test]
    fn classify_shared_errors() {
        assert_eq!(rate_limited("x").failure_kind(), FailureKind::Transient);
        assert_eq!(
            EssayBridgeError::Network("reset".into()).failure_kind(),
            FailureKind::Network
        );
        assert_eq!(EssayBridgeError::EmptyResponse.failure_kind(), FailureKind::Permanent);
        assert_eq!(
            EssayBridgeError::Api { status: 400, message: "bad".into() }.failure_kind(),
            FailureKind::Permanent
        );
    }

    #[test]
    fn decide_respects_budget_and_network_policy() {
        let (p, _) = policy(3);
        assert_eq!(
            p.decide(1, FailureKind::Transient, "busy"),
            RetryDecision::RetryAfter(Duration::from_secs(61))
        );
        assert_eq!(p.decide(3, FailureKind::Transient, "busy"), RetryDecision::GiveUp);
        assert_eq!(p.decide(1, FailureKind::Network, "reset"), RetryDecision::Fail);
        assert_eq!(p.decide(1, FailureKind::Permanent, "bad"), RetryDecision::Fail);

        let p = p.with_network_errors(NetworkErrorPolicy::Transient);
        assert!(matches!(
            p.decide(1, FailureKind::Network, "reset"),
            RetryDecision::RetryAfter(_)
        ));
    }

    #[test]
    fn zero_retries_still_makes_one_attempt() {
        let p = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(p.max_retries(), 1);
    }

    #[tokio::test]
    async fn exactly_n_attempts_then_exhausted() {
        let (p, sleeper) = policy(3);
        let calls = AtomicU32::new(0);

        let result: Result<String, _> = p
            .invoke(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limited("quota")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(last, EssayBridgeError::RateLimited { .. }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        // No wait after the final attempt.
        assert_eq!(sleeper.waits().len(), 2);
    }

    #[tokio::test]
    async fn server_suggested_delay_is_honoured() {
        let (p, sleeper) = policy(2);
        let calls = AtomicU32::new(0);

        let result = p
            .invoke(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(rate_limited(r#"{"retryDelay": "7s"}"#))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        let waits = sleeper.waits();
        assert_eq!(waits, vec![Duration::from_secs(8)]);
        assert!(waits[0] >= Duration::from_secs(7));
    }

    #[tokio::test]
    async fn falls_back_to_base_delay() {
        let (p, sleeper) = policy(2);
        let calls = AtomicU32::new(0);

        let _ = p
            .invoke(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 { Err(rate_limited("no hint")) } else { Ok(()) }
                }
            })
            .await;

        assert_eq!(sleeper.waits(), vec![Duration::from_secs(61)]);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let (p, sleeper) = policy(5);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = p
            .invoke(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(EssayBridgeError::Api {
                        status: 400,
                        message: "invalid argument".into(),
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Permanent(_))));
        assert!(sleeper.waits().is_empty());
    }
}
