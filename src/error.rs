use thiserror::Error;

/// Upper bound on how much of a raw body is quoted inside an error.
const BODY_EXCERPT_CHARS: usize = 512;

/// Aggregates every failure mode exposed by the connector.
///
/// Callers can match on the specific variant to decide whether to retry, reconfigure
/// the [`crate::context::ModelContext`], or surface an actionable message to the user.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Raised when building a strategy or transport from configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    Config {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// Dispatch was attempted while no strategy is registered for the capability.
    #[error("{capability} strategy not configured")]
    NotConfigured {
        /// Either `chat` or `embed`.
        capability: &'static str,
    },
    /// Signals invalid call input such as an empty message list.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Network failures, timeouts, and non-2xx statuses.
    #[error("transport error calling {endpoint}: {message}")]
    Transport {
        /// URL the request was sent to.
        endpoint: String,
        /// HTTP status returned by the upstream, absent for network-level failures.
        status: Option<u16>,
        /// Upstream message or a body excerpt.
        message: String,
    },
    /// The vendor answered 2xx but the payload does not have the expected envelope.
    #[error("malformed {provider} response at `{field}`: {reason}; body: {body}")]
    ResponseFormat {
        /// Name of the provider, such as `openai`.
        provider: &'static str,
        /// Path of the missing or malformed field.
        field: String,
        /// What is wrong with the field.
        reason: String,
        /// Excerpt of the raw body for diagnosis.
        body: String,
    },
    /// The caller cancelled the call or its deadline elapsed.
    #[error("request cancelled: {message}")]
    Cancelled { message: String },
    /// An unexpected fault (panic, poisoned lock) caught at a public entry point.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] for a network-level failure without a status.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_connector::error::LLMError;
    ///
    /// let err = LLMError::transport("https://example.com", "dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { status: None, .. }));
    /// assert!(err.is_retryable());
    /// ```
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Transport`] for a non-2xx upstream status.
    pub fn status(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Config`] for the given field.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`LLMError::ResponseFormat`], quoting at most a bounded excerpt of `body`.
    pub fn response_format(
        provider: &'static str,
        field: impl Into<String>,
        reason: impl Into<String>,
        body: &str,
    ) -> Self {
        Self::ResponseFormat {
            provider,
            field: field.into(),
            reason: reason.into(),
            body: excerpt(body),
        }
    }

    /// Returns `true` when issuing the same request again may succeed.
    ///
    /// Only transport failures qualify: network errors and timeouts, plus the 408, 429
    /// and 5xx statuses. Malformed payloads, validation failures and cancellations are
    /// never retried because repeating the call cannot change their outcome.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(status),
                ..
            } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Upstream HTTP status, when the error carries one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Statuses worth another attempt.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}

/// Truncates `body` to a bounded number of characters, respecting char boundaries.
pub(crate) fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}
