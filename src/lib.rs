//! 多供应商 chat / embedding 统一调用库

pub mod call;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod options;
pub mod provider;
pub mod types;

pub use call::CallContext;
pub use config::{
    Config, ContextConfig, ProviderConfig, ProviderKind, Strategy, TransportConfig,
    build_context, build_strategy,
};
pub use context::ModelContext;
pub use error::LLMError;
pub use options::*;
pub use provider::dashscope::DashScopeStrategy;
pub use provider::openai::OpenAiStrategy;
pub use provider::{ChatStrategy, DynChatStrategy, DynEmbedStrategy, EmbedStrategy};
pub use types::*;
