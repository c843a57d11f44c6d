use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DashScopeChatPayload {
    #[serde(default)]
    pub request_id: Option<String>,
    pub output: DashScopeChatOutput,
    #[serde(default)]
    pub usage: Option<DashScopeUsage>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DashScopeChatOutput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// DashScope 使用 input/output 命名 与 OpenAI 的 prompt/completion 对应
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DashScopeUsage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DashScopeEmbedPayload {
    #[serde(default)]
    pub request_id: Option<String>,
    pub output: DashScopeEmbedOutput,
    #[serde(default)]
    pub usage: Option<DashScopeUsage>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DashScopeEmbedOutput {
    pub embeddings: Vec<DashScopeEmbedding>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DashScopeEmbedding {
    #[serde(default)]
    pub text_index: Option<usize>,
    pub embedding: Vec<f32>,
}
