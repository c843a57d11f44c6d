use std::any::Any;

use serde_json::Value;

use crate::error::LLMError;
use crate::provider::{decode_payload, order_embeddings};
use crate::types::{ChatResponse, EmbedResponse, TokenUsage};

use super::PROVIDER;
use super::types::{DashScopeChatPayload, DashScopeEmbedPayload, DashScopeUsage};

/// DashScope chat 结果
#[derive(Debug, Clone)]
pub struct DashScopeChatResponse {
    payload: DashScopeChatPayload,
}

impl DashScopeChatResponse {
    pub fn payload(&self) -> &DashScopeChatPayload {
        &self.payload
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.payload.output.finish_reason.as_deref()
    }
}

impl ChatResponse for DashScopeChatResponse {
    fn content(&self) -> &str {
        self.payload.output.text.as_deref().unwrap_or_default()
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn usage(&self) -> Option<TokenUsage> {
        self.payload.usage.as_ref().map(convert_usage)
    }

    fn request_id(&self) -> Option<&str> {
        self.payload.request_id.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// DashScope embedding 结果 已按 `text_index` 还原输入顺序
#[derive(Debug, Clone)]
pub struct DashScopeEmbedResponse {
    embeddings: Vec<Vec<f32>>,
    request_id: Option<String>,
    usage: Option<DashScopeUsage>,
}

impl EmbedResponse for DashScopeEmbedResponse {
    fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn usage(&self) -> Option<TokenUsage> {
        self.usage.as_ref().map(convert_usage)
    }

    fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn convert_usage(usage: &DashScopeUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: usage.total_tokens,
    }
}

/// `output` 缺失为格式错误 `output.text` 缺失或为 null 时内容为空字符串
pub(crate) fn parse_chat(text: &str) -> Result<DashScopeChatResponse, LLMError> {
    let payload: DashScopeChatPayload = decode_payload(PROVIDER, text, |value| {
        let output = match value.get("output") {
            None | Some(Value::Null) => return Err(missing("output")),
            Some(Value::Object(output)) => output,
            Some(_) => return Err(("output".to_string(), "expected an object".to_string())),
        };
        match output.get("text") {
            None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
            Some(_) => Err(("output.text".to_string(), "expected a string".to_string())),
        }
    })?;
    Ok(DashScopeChatResponse { payload })
}

pub(crate) fn parse_embed(text: &str, expected: usize) -> Result<DashScopeEmbedResponse, LLMError> {
    let payload: DashScopeEmbedPayload = decode_payload(PROVIDER, text, |value| {
        match value.pointer("/output/embeddings") {
            None | Some(Value::Null) => Err(missing("output.embeddings")),
            Some(Value::Array(_)) => Ok(()),
            Some(_) => Err((
                "output.embeddings".to_string(),
                "expected an array".to_string(),
            )),
        }
    })?;

    let entries = payload
        .output
        .embeddings
        .into_iter()
        .map(|item| (item.text_index, item.embedding))
        .collect();
    let embeddings = order_embeddings(PROVIDER, "output.embeddings", entries, expected, text)?;

    Ok(DashScopeEmbedResponse {
        embeddings,
        request_id: payload.request_id,
        usage: payload.usage,
    })
}

fn missing(field: &str) -> (String, String) {
    (field.to_string(), "missing".to_string())
}
