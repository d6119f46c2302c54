//! Rate-limit aware wrapper for outbound API calls
//!
//! Every catalog and history request goes through [`RateLimitedRequester::call`].
//! A response that carries a server-specified retry interval is waited out
//! (plus a fixed buffer) and the same call is issued again, for as long as the
//! server keeps asking. Any other failure is handed straight back to the
//! caller, which gives up that unit of work.

use governor::{Quota, RateLimiter};
use scrobbled_common::config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Errors that may ask the caller to come back later
pub trait RetryAfter {
    /// Server-specified wait before the call may be retried, if rate limited
    fn retry_after(&self) -> Option<Duration>;
}

/// Terminal outcome of a wrapped call that did not succeed
#[derive(Debug, Error)]
pub enum RequestError<E> {
    /// Non-rate-limit failure; not retried
    #[error("{0}")]
    Failed(E),

    /// Still rate limited after an explicitly configured number of waits
    #[error("gave up after {attempts} rate-limited attempts: {last}")]
    RetriesExhausted { attempts: u32, last: E },
}

impl<E> RequestError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RequestError::Failed(e) => e,
            RequestError::RetriesExhausted { last, .. } => last,
        }
    }
}

/// Retry and pacing policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Added on top of the server's Retry-After interval
    pub retry_after_buffer: Duration,
    /// Optional cap on rate-limit waits per call; `None` never gives up
    pub max_rate_limit_retries: Option<u32>,
    /// Proactive pacing of call attempts
    pub requests_per_second: Option<NonZeroU32>,
    /// Cap on simultaneous in-flight attempts through this requester
    pub max_in_flight: Option<usize>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_after_buffer: Duration::from_secs(1),
            max_rate_limit_retries: None,
            requests_per_second: None,
            max_in_flight: None,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            retry_after_buffer: Duration::from_secs(config.buffer_secs),
            max_rate_limit_retries: config.max_rate_limit_retries,
            requests_per_second: NonZeroU32::new(config.requests_per_second),
            max_in_flight: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight.max(1));
        self
    }
}

/// Scoped-call wrapper applying a [`RetryPolicy`]
pub struct RateLimitedRequester {
    policy: RetryPolicy,
    pacer: Option<
        RateLimiter<
            governor::state::direct::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
    in_flight: Option<Semaphore>,
}

impl RateLimitedRequester {
    pub fn new(policy: RetryPolicy) -> Self {
        let pacer = policy
            .requests_per_second
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));
        let in_flight = policy.max_in_flight.map(Semaphore::new);

        Self {
            policy,
            pacer,
            in_flight,
        }
    }

    /// Invoke `op`, waiting out rate limits until it succeeds or fails for
    /// another reason
    ///
    /// `op` is called again from scratch for every attempt. The in-flight
    /// permit is held only while an attempt runs, never across a wait.
    pub async fn call<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RequestError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryAfter + Display,
    {
        let mut rate_limited: u32 = 0;

        loop {
            if let Some(pacer) = &self.pacer {
                pacer.until_ready().await;
            }

            let outcome = {
                let _permit = match &self.in_flight {
                    Some(semaphore) => semaphore.acquire().await.ok(),
                    None => None,
                };
                op().await
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let Some(wait) = error.retry_after() else {
                debug!(call = %label, error = %error, "Request failed, not retrying");
                return Err(RequestError::Failed(error));
            };

            if let Some(max) = self.policy.max_rate_limit_retries {
                if rate_limited >= max {
                    warn!(
                        call = %label,
                        attempts = rate_limited + 1,
                        "Still rate limited, giving up"
                    );
                    return Err(RequestError::RetriesExhausted {
                        attempts: rate_limited + 1,
                        last: error,
                    });
                }
            }

            rate_limited += 1;
            let delay = wait + self.policy.retry_after_buffer;
            debug!(
                call = %label,
                retry = rate_limited,
                delay_ms = delay.as_millis() as u64,
                "Rate limited, waiting before retry"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RateLimitedRequester {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
