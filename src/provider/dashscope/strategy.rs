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
use super::error::parse_dashscope_error;
use super::response::{parse_chat, parse_embed};

pub const DEFAULT_CHAT_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/chat/completions";
pub const DEFAULT_EMBED_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/embeddings/text-embedding";

/// DashScope 策略
pub struct DashScopeStrategy {
    transport: DynHttpTransport,
    chat_url: String,
    embed_url: String,
}

impl DashScopeStrategy {
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
        let text = send_json(self.transport.as_ref(), &self.chat_url, &body, parse_dashscope_error).await?;
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
        let text = send_json(self.transport.as_ref(), &self.embed_url, &body, parse_dashscope_error).await?;
        Ok(Box::new(parse_embed(&text, texts.len())?))
    }
}

#[async_trait]
impl ChatStrategy for DashScopeStrategy {
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
impl EmbedStrategy for DashScopeStrategy {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse, HttpTransport};
    use serde_json::Value;
    use std::collections::HashMap;
    use crate::options::EmbeddingType;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct FixedTransport {
        body: &'static str,
        sent: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
            self.sent.lock().expect("lock").push(request);
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    /// 延迟响应的 transport
    struct SlowTransport(Duration);

    #[async_trait]
    impl HttpTransport for SlowTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
            tokio::time::sleep(self.0).await;
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: br#"{"output":{"text":"late"}}"#.to_vec(),
            })
        }
    }

    /// 在 send 中 panic 的 transport
    struct PanickingTransport;

    #[async_trait]
    impl HttpTransport for PanickingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
            panic!("transport bug");
        }
    }

    fn fixed(body: &'static str) -> Arc<FixedTransport> {
        Arc::new(FixedTransport {
            body,
            sent: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn custom_urls_override_defaults_and_blank_ones_do_not() {
        let config = Config::new("sk-test")
            .with_chat_url("http://localhost:8080/chat")
            .with_embed_url("");
        let strategy = DashScopeStrategy::with_transport(fixed("{}"), config).expect("strategy");
        assert_eq!(strategy.chat_url(), "http://localhost:8080/chat");
        assert_eq!(strategy.embed_url(), DEFAULT_EMBED_URL);
    }

    #[test]
    fn with_transport_still_validates_key() {
        let result = DashScopeStrategy::with_transport(fixed("{}"), Config::new(" "));
        assert!(matches!(result, Err(LLMError::Config { .. })));
    }

    #[tokio::test]
    async fn embed_reorders_by_text_index_and_sends_text_type() {
        let transport = fixed(
            r#"{"output":{"embeddings":[{"text_index":1,"embedding":[0.4,0.5]},{"text_index":0,"embedding":[0.1,0.2]}]},"usage":{"total_tokens":4},"request_id":"r"}"#,
        );
        let strategy =
            DashScopeStrategy::with_transport(transport.clone(), Config::new("sk-test")).expect("strategy");
        let options = EmbedOptions {
            model: "text-embedding-v1".to_string(),
            embedding_type: Some(EmbeddingType::Document),
        };
        let texts = vec!["a".to_string(), "b".to_string()];

        let response = strategy
            .embed(&CallContext::background(), &texts, &options)
            .await
            .expect("response");

        assert_eq!(response.embeddings().to_vec(), vec![vec![0.1_f32, 0.2], vec![0.4, 0.5]]);
        assert_eq!(response.provider(), "dashscope");

        let sent = transport.sent.lock().expect("lock");
        assert_eq!(sent[0].url, DEFAULT_EMBED_URL);
        let body: Value = serde_json::from_slice(&sent[0].body).expect("json");
        assert_eq!(body["params"]["text_type"], "document");
    }

    #[tokio::test]
    async fn response_can_be_downcast_to_vendor_type() {
        let strategy = DashScopeStrategy::with_transport(
            fixed(r#"{"output":{"text":"ok","finish_reason":"stop"}}"#),
            Config::new("sk-test"),
        )
        .expect("strategy");
        let response = strategy
            .chat(
                &CallContext::background(),
                &[ChatMessage::user("hi")],
                &ChatOptions::new("qwen-turbo"),
            )
            .await
            .expect("response");

        let concrete = response
            .as_any()
            .downcast_ref::<crate::provider::dashscope::DashScopeChatResponse>()
            .expect("dashscope response");
        assert_eq!(concrete.finish_reason(), Some("stop"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_token_aborts_in_flight_call() {
        let strategy = DashScopeStrategy::with_transport(
            Arc::new(SlowTransport(Duration::from_secs(60))),
            Config::new("sk-test"),
        )
        .expect("strategy");
        let token = CancellationToken::new();
        let ctx = CallContext::background().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let err = strategy
            .chat(&ctx, &[ChatMessage::user("hi")], &ChatOptions::new("qwen-turbo"))
            .await
            .expect_err("cancelled");
        canceller.await.expect("canceller");

        assert!(matches!(err, LLMError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn panicking_transport_surfaces_as_internal_error() {
        let strategy =
            DashScopeStrategy::with_transport(Arc::new(PanickingTransport), Config::new("sk-test"))
                .expect("strategy");
        let err = strategy
            .embed(
                &CallContext::background(),
                &["x".to_string()],
                &EmbedOptions::new("text-embedding-v1"),
            )
            .await
            .expect_err("panic");
        assert!(matches!(err, LLMError::Internal { .. }));
    }
}
