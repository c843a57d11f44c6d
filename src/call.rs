//! Per-call cancellation and deadline signal.

use std::future::{Future, pending};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::LLMError;

/// Cancellation signal threaded through a single `chat` / `embed` call.
///
/// When the token fires or the deadline elapses, the in-flight future (HTTP request,
/// retry backoff, or rate-limit wait) is dropped and the call resolves to
/// [`LLMError::Cancelled`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use llm_connector::call::CallContext;
/// use tokio_util::sync::CancellationToken;
///
/// let token = CancellationToken::new();
/// let ctx = CallContext::background()
///     .with_cancellation(token.clone())
///     .with_timeout(Duration::from_secs(5));
/// token.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets an absolute deadline; an earlier deadline already set is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Sets a deadline `timeout` from now.
    ///
    /// A timeout too large to represent as an instant adds no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Drives `future` until it completes, the token fires, or the deadline passes.
    pub async fn run<F, T>(&self, future: F) -> Result<T, LLMError>
    where
        F: Future<Output = Result<T, LLMError>>,
    {
        let cancelled = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(LLMError::Cancelled {
                message: "cancelled by caller".to_string(),
            }),
            _ = expired => Err(LLMError::Cancelled {
                message: "deadline exceeded".to_string(),
            }),
            result = future => result,
        }
    }
}
