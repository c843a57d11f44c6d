//! Vendor-agnostic data structures shared by every strategy.
//!
//! Requests are expressed with [`ChatMessage`] values and results are read through the
//! [`ChatResponse`] and [`EmbedResponse`] traits, so callers never touch a vendor's
//! wire format directly.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Chat role string compatible with provider-specific semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    pub fn system() -> Self {
        Self("system".to_string())
    }

    pub fn user() -> Self {
        Self("user".to_string())
    }

    pub fn assistant() -> Self {
        Self("assistant".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Single chat turn sent to a provider.
///
/// Serializes to the `{"role": ..., "content": ...}` object both supported vendors
/// accept.
///
/// # Examples
///
/// ```
/// use llm_connector::types::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("Hello");
/// assert_eq!(msg.role, Role::user());
/// assert_eq!(
///     serde_json::to_value(&msg).unwrap(),
///     serde_json::json!({"role": "user", "content": "Hello"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::system(), content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::user(), content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::assistant(), content)
    }
}

/// Token accounting normalized across vendors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// Normalized view over a vendor chat completion.
///
/// Each strategy returns its own concrete type holding the parsed vendor payload;
/// [`ChatResponse::as_any`] allows downcasting when vendor-specific fields are needed.
pub trait ChatResponse: fmt::Debug + Send + Sync {
    /// Text of the first completion, or an empty string when the vendor produced none.
    fn content(&self) -> &str;

    /// Name of the provider that produced the response.
    fn provider(&self) -> &'static str;

    /// Token usage reported by the vendor.
    fn usage(&self) -> Option<TokenUsage> {
        None
    }

    /// Vendor request identifier, useful when filing support tickets.
    fn request_id(&self) -> Option<&str> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Normalized view over a vendor embedding result.
pub trait EmbedResponse: fmt::Debug + Send + Sync {
    /// One vector per input text, in the caller's input order.
    fn embeddings(&self) -> &[Vec<f32>];

    /// Name of the provider that produced the response.
    fn provider(&self) -> &'static str;

    /// Token usage reported by the vendor.
    fn usage(&self) -> Option<TokenUsage> {
        None
    }

    /// Vendor request identifier.
    fn request_id(&self) -> Option<&str> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}
