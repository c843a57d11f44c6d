use std::sync::Arc;

use async_trait::async_trait;

use crate::call::CallContext;
use crate::config::Config;
use crate::error::LLMError;
use crate::http::{DynHttpTransport, ResilientTransport};
use crate::options::{ChatOptions, EmbedOptions};
use crate::provider::request::{build_chat_body, build_embed_body, send_json};
use crate::provider::{ChatStrategy, EmbedStrategy, shield};
use crate::types::{ChatMessage, ChatResponse, EmbedResponse};

use super::PROVIDER;
use super::error::parse_openai_error;
use super::response::{parse_chat, parse_embed};

pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_EMBED_URL: &str = "https://api.openai.com/v1/engines/text-similarity/embeddings";

/// OpenAI 形态的策略 构建后不可变 所有调用共用同一个 transport
pub struct OpenAiStrategy {
    transport: DynHttpTransport,
    chat_url: String,
    embed_url: String,
}

impl OpenAiStrategy {
    /// 校验配置并构建带重试与限流的 transport
    pub fn new(config: Config) -> Result<Self, LLMError> {
        config.validate()?;
        let transport = ResilientTransport::from_config(&config.transport, &config.api_key)?;
        Ok(Self::assemble(Arc::new(transport), &config))
    }

    /// 使用自定义 transport 鉴权头由该 transport 负责
    pub fn with_transport(transport: DynHttpTransport, config: Config) -> Result<Self, LLMError> {
        config.validate()?;
        Ok(Self::assemble(transport, &config))
    }

    fn assemble(transport: DynHttpTransport, config: &Config) -> Self {
        Self {
            transport,
            chat_url: config.chat_url_or(DEFAULT_CHAT_URL),
            embed_url: config.embed_url_or(DEFAULT_EMBED_URL),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub fn embed_url(&self) -> &str {
        &self.embed_url
    }

    async fn chat_inner(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        let body = build_chat_body(messages, options)?;
        tracing::debug!(
            provider = PROVIDER,
            endpoint = %self.chat_url,
            model = %options.model,
            messages = messages.len(),
            "dispatching chat request"
        );
        let text = send_json(self.transport.as_ref(), &self.chat_url, &body, parse_openai_error).await?;
        Ok(Box::new(parse_chat(&text)?))
    }

    async fn embed_inner(
        &self,
        texts: &[String],
        options: &EmbedOptions,
    ) -> Result<Box<dyn EmbedResponse>, LLMError> {
        let body = build_embed_body(texts, options)?;
        tracing::debug!(
            provider = PROVIDER,
            endpoint = %self.embed_url,
            model = %options.model,
            texts = texts.len(),
            "dispatching embed request"
        );
        let text = send_json(self.transport.as_ref(), &self.embed_url, &body, parse_openai_error).await?;
        Ok(Box::new(parse_embed(&text, texts.len())?))
    }
}

#[async_trait]
impl ChatStrategy for OpenAiStrategy {
    async fn chat(
        &self,
        ctx: &CallContext,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        shield(PROVIDER, "chat", ctx.run(self.chat_inner(messages, options))).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[async_trait]
impl EmbedStrategy for OpenAiStrategy {
    async fn embed(
        &self,
        ctx: &CallContext,
        texts: &[String],
        options: &EmbedOptions,
    ) -> Result<Box<dyn EmbedResponse>, LLMError> {
        shield(PROVIDER, "embed", ctx.run(self.embed_inner(texts, options))).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
