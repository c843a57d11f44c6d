//! 阿里云 DashScope 形态的供应商 `output.text` 与 `output.embeddings[].text_index`

mod error;
mod response;
mod strategy;
pub mod types;

pub use response::{DashScopeChatResponse, DashScopeEmbedResponse};
pub use strategy::{DEFAULT_CHAT_URL, DEFAULT_EMBED_URL, DashScopeStrategy};

pub(crate) const PROVIDER: &str = "dashscope";
