//! Request-scoped call options and the functional modifiers that populate them.
//!
//! Every call builds a fresh options value, so modifiers never observe state from
//! another call. Each modifier sets exactly one field; modifiers touching different
//! fields commute.

use serde::{Deserialize, Serialize};

/// Optional parameters of a chat call. `None` fields are omitted from the wire payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub stop: Option<Vec<String>>,
}

impl ChatOptions {
    /// Options targeting `model` with every optional parameter unset.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Applies `modifiers` in order.
    pub fn apply<I>(&mut self, modifiers: I)
    where
        I: IntoIterator<Item = ChatOption>,
    {
        for modifier in modifiers {
            modifier(self);
        }
    }
}

/// Whether embedded text is a search query or a stored document.
///
/// Asymmetric retrieval benefits from distinguishing the two; symmetric tasks such as
/// clustering or classification can leave the type unset, in which case the vendor
/// default (`document`) applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingType {
    Query,
    Document,
    Custom(String),
}

impl EmbeddingType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Query => "query",
            Self::Document => "document",
            Self::Custom(value) => value,
        }
    }
}

impl From<&str> for EmbeddingType {
    fn from(value: &str) -> Self {
        match value {
            "query" => Self::Query,
            "document" => Self::Document,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Optional parameters of an embedding call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedOptions {
    pub model: String,
    pub embedding_type: Option<EmbeddingType>,
}

impl EmbedOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Applies `modifiers` in order.
    pub fn apply<I>(&mut self, modifiers: I)
    where
        I: IntoIterator<Item = EmbedOption>,
    {
        for modifier in modifiers {
            modifier(self);
        }
    }
}

/// Modifier mutating one field of [`ChatOptions`].
pub type ChatOption = Box<dyn FnOnce(&mut ChatOptions) + Send>;

/// Modifier mutating one field of [`EmbedOptions`].
pub type EmbedOption = Box<dyn FnOnce(&mut EmbedOptions) + Send>;

/// Sets the chat model.
///
/// # Examples
///
/// ```
/// use llm_connector::options::{ChatOptions, with_chat_model, with_max_tokens};
///
/// let mut options = ChatOptions::default();
/// options.apply([with_max_tokens(10), with_chat_model("m")]);
/// assert_eq!(options.model, "m");
/// assert_eq!(options.max_tokens, Some(10));
/// ```
pub fn with_chat_model(model: impl Into<String>) -> ChatOption {
    let model = model.into();
    Box::new(move |options| options.model = model)
}

pub fn with_temperature(temperature: f64) -> ChatOption {
    Box::new(move |options| options.temperature = Some(temperature))
}

pub fn with_max_tokens(max_tokens: u32) -> ChatOption {
    Box::new(move |options| options.max_tokens = Some(max_tokens))
}

pub fn with_top_p(top_p: f64) -> ChatOption {
    Box::new(move |options| options.top_p = Some(top_p))
}

/// Sets the stop sequences, preserving their order.
pub fn with_stop<I, S>(stop: I) -> ChatOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let stop: Vec<String> = stop.into_iter().map(Into::into).collect();
    Box::new(move |options| options.stop = Some(stop))
}

pub fn with_embed_model(model: impl Into<String>) -> EmbedOption {
    let model = model.into();
    Box::new(move |options| options.model = model)
}

pub fn with_embedding_type(embedding_type: impl Into<EmbeddingType>) -> EmbedOption {
    let embedding_type = embedding_type.into();
    Box::new(move |options| options.embedding_type = Some(embedding_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_on_disjoint_fields_commute() {
        let mut forward = ChatOptions::default();
        forward.apply([with_chat_model("m"), with_max_tokens(10)]);

        let mut backward = ChatOptions::default();
        backward.apply([with_max_tokens(10), with_chat_model("m")]);

        assert_eq!(forward, backward);
        assert_eq!(forward.model, "m");
        assert_eq!(forward.max_tokens, Some(10));
        assert_eq!(forward.temperature, None);
        assert_eq!(forward.top_p, None);
        assert_eq!(forward.stop, None);
    }

    #[test]
    fn later_modifier_wins_on_same_field() {
        let mut options = ChatOptions::default();
        options.apply([with_temperature(0.1), with_temperature(0.9)]);
        assert_eq!(options.temperature, Some(0.9));
    }

    #[test]
    fn stop_sequences_keep_order() {
        let mut options = ChatOptions::new("m");
        options.apply([with_stop(["b", "a", "c"]), with_top_p(0.5)]);
        assert_eq!(
            options.stop,
            Some(vec!["b".to_string(), "a".to_string(), "c".to_string()])
        );
        assert_eq!(options.top_p, Some(0.5));
    }

    #[test]
    fn embed_modifiers_set_model_and_type() {
        let mut options = EmbedOptions::default();
        options.apply([with_embedding_type("query"), with_embed_model("text-embedding-v1")]);
        assert_eq!(options.model, "text-embedding-v1");
        assert_eq!(options.embedding_type, Some(EmbeddingType::Query));
    }

    #[test]
    fn embedding_type_parses_known_and_custom_values() {
        assert_eq!(EmbeddingType::from("document"), EmbeddingType::Document);
        assert_eq!(
            EmbeddingType::from("passage"),
            EmbeddingType::Custom("passage".to_string())
        );
        assert_eq!(EmbeddingType::Custom("passage".into()).as_str(), "passage");
    }
}
