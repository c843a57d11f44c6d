use std::sync::{PoisonError, RwLock};

use crate::call::CallContext;
use crate::error::LLMError;
use crate::options::{ChatOption, ChatOptions, EmbedOption, EmbedOptions};
use crate::provider::{DynChatStrategy, DynEmbedStrategy, shield};
use crate::types::{ChatMessage, ChatResponse, EmbedResponse};

/// 调用入口 持有至多一个 chat 策略与一个 embed 策略
///
/// 两个槽位互相独立 可以指向不同供应商 策略可在运行期替换 后设置者生效
#[derive(Default)]
pub struct ModelContext {
    chat: RwLock<Option<DynChatStrategy>>,
    embed: RwLock<Option<DynEmbedStrategy>>,
}

impl ModelContext {
    /// 创建未配置任何策略的 ModelContext
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chat_strategy(mut self, strategy: DynChatStrategy) -> Self {
        self.chat = RwLock::new(Some(strategy));
        self
    }

    pub fn with_embed_strategy(mut self, strategy: DynEmbedStrategy) -> Self {
        self.embed = RwLock::new(Some(strategy));
        self
    }

    /// 替换 chat 策略
    pub fn set_chat_strategy(&self, strategy: DynChatStrategy) -> Result<(), LLMError> {
        *self.chat.write().map_err(poisoned)? = Some(strategy);
        Ok(())
    }

    /// 替换 embed 策略
    pub fn set_embed_strategy(&self, strategy: DynEmbedStrategy) -> Result<(), LLMError> {
        *self.embed.write().map_err(poisoned)? = Some(strategy);
        Ok(())
    }

    pub fn clear_chat_strategy(&self) -> Result<(), LLMError> {
        *self.chat.write().map_err(poisoned)? = None;
        Ok(())
    }

    pub fn clear_embed_strategy(&self) -> Result<(), LLMError> {
        *self.embed.write().map_err(poisoned)? = None;
        Ok(())
    }

    /// 当前 chat 策略的供应商名称
    pub fn chat_strategy_name(&self) -> Result<Option<&'static str>, LLMError> {
        Ok(self.chat.read().map_err(poisoned)?.as_ref().map(|s| s.name()))
    }

    pub fn embed_strategy_name(&self) -> Result<Option<&'static str>, LLMError> {
        Ok(self.embed.read().map_err(poisoned)?.as_ref().map(|s| s.name()))
    }

    /// 依次应用 `options` 后转交给 chat 策略
    ///
    /// 未配置策略时返回 [`LLMError::NotConfigured`] modifier 或策略内的 panic 转换为
    /// [`LLMError::Internal`]
    pub async fn chat<I>(
        &self,
        ctx: &CallContext,
        messages: &[ChatMessage],
        options: I,
    ) -> Result<Box<dyn ChatResponse>, LLMError>
    where
        I: IntoIterator<Item = ChatOption>,
    {
        let strategy = self
            .chat
            .read()
            .map_err(poisoned)?
            .clone()
            .ok_or(LLMError::NotConfigured { capability: "chat" })?;

        shield("context", "chat", async move {
            let mut resolved = ChatOptions::default();
            resolved.apply(options);
            strategy.chat(ctx, messages, &resolved).await
        })
        .await
    }

    /// 依次应用 `options` 后转交给 embed 策略
    pub async fn embed<I>(
        &self,
        ctx: &CallContext,
        texts: &[String],
        options: I,
    ) -> Result<Box<dyn EmbedResponse>, LLMError>
    where
        I: IntoIterator<Item = EmbedOption>,
    {
        let strategy = self
            .embed
            .read()
            .map_err(poisoned)?
            .clone()
            .ok_or(LLMError::NotConfigured {
                capability: "embed",
            })?;

        shield("context", "embed", async move {
            let mut resolved = EmbedOptions::default();
            resolved.apply(options);
            strategy.embed(ctx, texts, &resolved).await
        })
        .await
    }
}

fn poisoned<T>(_: PoisonError<T>) -> LLMError {
    LLMError::Internal {
        message: "strategy lock poisoned".to_string(),
    }
}
