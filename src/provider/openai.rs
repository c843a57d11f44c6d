//! OpenAI 形态的供应商 `choices[0].message.content` 与 `data[].embedding`

mod error;
mod response;
mod strategy;
pub mod types;

pub use response::{OpenAiChatResponse, OpenAiEmbedResponse};
pub use strategy::{DEFAULT_CHAT_URL, DEFAULT_EMBED_URL, OpenAiStrategy};

pub(crate) const PROVIDER: &str = "openai";
