use serde::{Deserialize, Serialize};

/// Chat Completions 响应体
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiChatPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiChoice {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub message: Option<OpenAiMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiMessage {
    #[serde(default)]
    pub role: Option<String>,
    /// 可能为 null 例如仅返回工具调用时
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct OpenAiUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

/// Embeddings 响应体
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiEmbedPayload {
    #[serde(default)]
    pub model: Option<String>,
    pub data: Vec<OpenAiEmbedding>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiEmbedding {
    /// 对应输入下标 缺失时按响应顺序
    #[serde(default)]
    pub index: Option<usize>,
    pub embedding: Vec<f32>,
}
