use std::any::Any;

use serde_json::Value;

use crate::error::LLMError;
use crate::provider::{decode_payload, order_embeddings};
use crate::types::{ChatResponse, EmbedResponse, TokenUsage};

use super::PROVIDER;
use super::types::{OpenAiChatPayload, OpenAiEmbedPayload, OpenAiUsage};

/// OpenAI chat 结果 保留原始 payload 便于读取供应商特有字段
#[derive(Debug, Clone)]
pub struct OpenAiChatResponse {
    payload: OpenAiChatPayload,
}

impl OpenAiChatResponse {
    pub fn payload(&self) -> &OpenAiChatPayload {
        &self.payload
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.payload.choices.first()?.finish_reason.as_deref()
    }
}

impl ChatResponse for OpenAiChatResponse {
    fn content(&self) -> &str {
        self.payload
            .choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
            .unwrap_or_default()
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn usage(&self) -> Option<TokenUsage> {
        self.payload.usage.as_ref().map(convert_usage)
    }

    fn request_id(&self) -> Option<&str> {
        self.payload.id.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// OpenAI embedding 结果 向量已按输入顺序排列
#[derive(Debug, Clone)]
pub struct OpenAiEmbedResponse {
    embeddings: Vec<Vec<f32>>,
    model: Option<String>,
    usage: Option<OpenAiUsage>,
}

impl OpenAiEmbedResponse {
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }
}

impl EmbedResponse for OpenAiEmbedResponse {
    fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn usage(&self) -> Option<TokenUsage> {
        self.usage.as_ref().map(convert_usage)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn convert_usage(usage: &OpenAiUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

/// `choices` 缺失为格式错误 为空数组则内容为空字符串
pub(crate) fn parse_chat(text: &str) -> Result<OpenAiChatResponse, LLMError> {
    let payload: OpenAiChatPayload = decode_payload(PROVIDER, text, |value| {
        let choices = match value.get("choices") {
            None | Some(Value::Null) => return Err(missing("choices")),
            Some(Value::Array(choices)) => choices,
            Some(_) => return Err(("choices".to_string(), "expected an array".to_string())),
        };
        match choices.first() {
            Some(first) if first.get("message").is_none_or(Value::is_null) => {
                Err(missing("choices[0].message"))
            }
            _ => Ok(()),
        }
    })?;
    Ok(OpenAiChatResponse { payload })
}

pub(crate) fn parse_embed(text: &str, expected: usize) -> Result<OpenAiEmbedResponse, LLMError> {
    let payload: OpenAiEmbedPayload = decode_payload(PROVIDER, text, |value| match value.get("data") {
        None | Some(Value::Null) => Err(missing("data")),
        Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(("data".to_string(), "expected an array".to_string())),
    })?;

    let entries = payload
        .data
        .into_iter()
        .map(|item| (item.index, item.embedding))
        .collect();
    let embeddings = order_embeddings(PROVIDER, "data", entries, expected, text)?;

    Ok(OpenAiEmbedResponse {
        embeddings,
        model: payload.model,
        usage: payload.usage,
    })
}

fn missing(field: &str) -> (String, String) {
    (field.to_string(), "missing".to_string())
}
