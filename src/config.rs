use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::context::ModelContext;
use crate::error::LLMError;
use crate::provider::dashscope::DashScopeStrategy;
use crate::provider::openai::OpenAiStrategy;
use crate::provider::{DynChatStrategy, DynEmbedStrategy};

/// 供应商配置 api_key 必填 其余字段留空时使用供应商默认值
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "secret_from_string")]
    pub api_key: SecretString,
    #[serde(default)]
    pub chat_url: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    /// 传输层调优参数 与其余字段平铺在同一层
    #[serde(flatten)]
    pub transport: TransportConfig,
}

impl Config {
    /// 使用默认 URL 与默认传输参数
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            chat_url: None,
            embed_url: None,
            transport: TransportConfig::default(),
        }
    }

    pub fn with_chat_url(mut self, url: impl Into<String>) -> Self {
        self.chat_url = Some(url.into());
        self
    }

    pub fn with_embed_url(mut self, url: impl Into<String>) -> Self {
        self.embed_url = Some(url.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// 校验 api_key 非空
    pub fn validate(&self) -> Result<(), LLMError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(LLMError::config("api_key", "API key must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn chat_url_or(&self, default: &str) -> String {
        resolve_url(self.chat_url.as_deref(), default)
    }

    pub(crate) fn embed_url_or(&self, default: &str) -> String {
        resolve_url(self.embed_url.as_deref(), default)
    }
}

fn resolve_url(url: Option<&str>, default: &str) -> String {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => default.to_string(),
    }
}

/// 传输层参数 时长以秒表示 可带小数
///
/// 取值为零表示关闭对应功能 例如 `timeout = 0` 不设超时 `requests_per_second = 0` 不限速
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub retry_count: u32,
    /// 首次重试前的等待 之后按指数增长 上限 5 秒
    #[serde(with = "duration_secs")]
    pub retry_backoff: Duration,
    pub requests_per_second: f64,
    pub burst_limit: u32,
    pub max_idle_connections: usize,
    pub max_connections_per_host: usize,
    #[serde(with = "duration_secs")]
    pub idle_connection_timeout: Duration,
    pub proxy_url: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_count: 3,
            retry_backoff: Duration::from_millis(200),
            requests_per_second: 10.0,
            burst_limit: 10,
            max_idle_connections: 100,
            max_connections_per_host: 10,
            idle_connection_timeout: Duration::from_secs(90),
            proxy_url: None,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|err| D::Error::custom(format!("invalid duration {secs}: {err}")))
    }
}

fn secret_from_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// 供应商类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(alias = "alibaba")]
    DashScope,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DashScope => "dashscope",
        }
    }
}

/// 单个能力的配置 供应商类型加上该供应商的 Config
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    #[serde(flatten)]
    pub config: Config,
}

/// 描述整个 ModelContext 两个能力可以指向不同供应商
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub chat: Option<ProviderConfig>,
    #[serde(default)]
    pub embed: Option<ProviderConfig>,
}

/// 已构建的策略 同一实例可同时提供 chat 与 embed
#[derive(Clone)]
pub enum Strategy {
    OpenAi(Arc<OpenAiStrategy>),
    DashScope(Arc<DashScopeStrategy>),
}

impl Strategy {
    pub fn chat(&self) -> DynChatStrategy {
        match self {
            Self::OpenAi(strategy) => strategy.clone(),
            Self::DashScope(strategy) => strategy.clone(),
        }
    }

    pub fn embed(&self) -> DynEmbedStrategy {
        match self {
            Self::OpenAi(strategy) => strategy.clone(),
            Self::DashScope(strategy) => strategy.clone(),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAi(_) => ProviderKind::OpenAi,
            Self::DashScope(_) => ProviderKind::DashScope,
        }
    }
}

/// 根据供应商类型构建策略
pub fn build_strategy(kind: ProviderKind, config: Config) -> Result<Strategy, LLMError> {
    let strategy = match kind {
        ProviderKind::OpenAi => Strategy::OpenAi(Arc::new(OpenAiStrategy::new(config)?)),
        ProviderKind::DashScope => Strategy::DashScope(Arc::new(DashScopeStrategy::new(config)?)),
    };
    Ok(strategy)
}

/// 根据配置构建 ModelContext 未配置的能力保持为空
pub fn build_context(config: &ContextConfig) -> Result<ModelContext, LLMError> {
    let mut context = ModelContext::new();

    if let Some(chat) = &config.chat {
        let strategy = build_strategy(chat.provider, chat.config.clone())?;
        context = context.with_chat_strategy(strategy.chat());
    }
    if let Some(embed) = &config.embed {
        let strategy = build_strategy(embed.provider, embed.config.clone())?;
        context = context.with_embed_strategy(strategy.embed());
    }

    Ok(context)
}
