use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::time::sleep;

use crate::config::TransportConfig;
use crate::error::{LLMError, is_retryable_status};

use super::limit::{ConnectionLimiter, RateLimiter};
use super::reqwest::ReqwestTransport;
use super::retry::{RetryPolicy, retry_after_from_headers};
use super::{DynHttpTransport, HttpRequest, HttpResponse, HttpTransport};

/// Transport decorator adding rate limiting, a per-host connection cap and bounded
/// retries on top of any [`HttpTransport`].
///
/// Each attempt first waits for a rate-limit token and a connection slot. Network
/// errors and retryable statuses (408, 429, 5xx) are retried according to the
/// [`RetryPolicy`], honoring a numeric `Retry-After` header up to the backoff cap;
/// once the policy is exhausted the last response or error is
/// returned unchanged so the caller can report the upstream status.
pub struct ResilientTransport {
    inner: DynHttpTransport,
    retry: RetryPolicy,
    rate_limiter: Option<RateLimiter>,
    connections: Option<ConnectionLimiter>,
}

impl ResilientTransport {
    /// Wraps `inner` with a retry policy and no throttling.
    pub fn new(inner: DynHttpTransport, retry: RetryPolicy) -> Self {
        Self {
            inner,
            retry,
            rate_limiter: None,
            connections: None,
        }
    }

    /// Builds the full stack (reqwest client, limiter, retries) described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Config`] when the reqwest client cannot be created.
    pub fn from_config(config: &TransportConfig, api_key: &SecretString) -> Result<Self, LLMError> {
        let inner: DynHttpTransport = Arc::new(ReqwestTransport::from_config(config, api_key)?);
        Ok(Self::with_inner(inner, config))
    }

    /// Applies the throttling and retry knobs of `config` around a caller-supplied transport.
    pub fn with_inner(inner: DynHttpTransport, config: &TransportConfig) -> Self {
        Self {
            inner,
            retry: RetryPolicy::new(config.retry_count, config.retry_backoff),
            rate_limiter: RateLimiter::new(config.requests_per_second, config.burst_limit),
            connections: ConnectionLimiter::new(config.max_connections_per_host),
        }
    }

    async fn attempt(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }
        let _permit = match &self.connections {
            Some(connections) => connections.acquire(&request.url).await,
            None => None,
        };
        self.inner.send(request).await
    }
}

#[async_trait]
impl HttpTransport for ResilientTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            let outcome = self.attempt(request.clone()).await;
            attempt += 1;

            let retry_reason = match &outcome {
                Ok(response) if is_retryable_status(response.status) => Some((
                    format!("status {}", response.status),
                    retry_after_from_headers(&response.headers),
                )),
                Err(err) if err.is_retryable() => Some((err.to_string(), None)),
                _ => None,
            };
            let Some((reason, retry_after)) = retry_reason else {
                return outcome;
            };
            if attempt >= max_attempts {
                tracing::debug!(
                    url = %request.url,
                    attempts = attempt,
                    reason = %reason,
                    "retry budget exhausted"
                );
                return outcome;
            }

            // Retry-After from the server wins over the computed backoff, within the cap.
            let delay = match retry_after {
                Some(wait) => wait.min(self.retry.max_backoff),
                None => self.retry.delay_for(attempt - 1),
            };
            tracing::warn!(
                url = %request.url,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "retrying request"
            );
            sleep(delay).await;
        }
    }
}
