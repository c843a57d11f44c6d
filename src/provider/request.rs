use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::error::LLMError;
use crate::http::{HttpTransport, post_json_with_headers};
use crate::options::{ChatOptions, EmbedOptions};
use crate::types::ChatMessage;

/// 构建 chat 请求体 两个供应商共用同一结构 未设置的可选字段不会出现在请求中
pub(crate) fn build_chat_body(
    messages: &[ChatMessage],
    options: &ChatOptions,
) -> Result<Value, LLMError> {
    if messages.is_empty() {
        return Err(LLMError::Validation {
            message: "messages cannot be empty".to_string(),
        });
    }
    let model = require_model(&options.model)?;

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "messages".to_string(),
        Value::Array(
            messages
                .iter()
                .map(|message| json!({"role": message.role.as_str(), "content": message.content}))
                .collect(),
        ),
    );
    if let Some(temperature) = options.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        body.insert("max_tokens".to_string(), Value::from(max_tokens));
    }
    if let Some(top_p) = options.top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(stop) = &options.stop {
        body.insert(
            "stop".to_string(),
            Value::Array(stop.iter().cloned().map(Value::String).collect()),
        );
    }
    Ok(Value::Object(body))
}

/// 构建 embed 请求体 `params.text_type` 仅在设置了非空类型时出现
pub(crate) fn build_embed_body(texts: &[String], options: &EmbedOptions) -> Result<Value, LLMError> {
    if texts.is_empty() {
        return Err(LLMError::Validation {
            message: "texts cannot be empty".to_string(),
        });
    }
    let model = require_model(&options.model)?;

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("input".to_string(), json!({ "texts": texts }));
    if let Some(text_type) = options
        .embedding_type
        .as_ref()
        .map(|kind| kind.as_str())
        .filter(|kind| !kind.is_empty())
    {
        body.insert("params".to_string(), json!({ "text_type": text_type }));
    }
    Ok(Value::Object(body))
}

fn require_model(model: &str) -> Result<&str, LLMError> {
    let model = model.trim();
    if model.is_empty() {
        return Err(LLMError::Validation {
            message: "model is required".to_string(),
        });
    }
    Ok(model)
}

/// 将供应商的非 2xx 响应体转换为错误
pub(crate) type ErrorParser = fn(&str, u16, &str) -> LLMError;

/// POST JSON 请求体 2xx 时返回响应文本 否则交给 `parse_error`
pub(crate) async fn send_json(
    transport: &dyn HttpTransport,
    url: &str,
    body: &Value,
    parse_error: ErrorParser,
) -> Result<String, LLMError> {
    let headers = HashMap::from([("Accept".to_string(), "application/json".to_string())]);
    let response = post_json_with_headers(transport, url, headers, body).await?;
    let text = response.text();
    if response.is_success() {
        Ok(text)
    } else {
        Err(parse_error(url, response.status, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::options::EmbeddingType;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StatusTransport {
        status: u16,
        sent: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for StatusTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
            self.sent.lock().expect("lock").push(request);
            Ok(HttpResponse {
                status: self.status,
                headers: HashMap::new(),
                body: b"payload".to_vec(),
            })
        }
    }

    fn status_error(endpoint: &str, status: u16, body: &str) -> LLMError {
        LLMError::status(endpoint, status, format!("vendor said {body}"))
    }

    #[tokio::test]
    async fn send_json_returns_text_on_success_and_accepts_json() {
        let transport = StatusTransport {
            status: 200,
            sent: Mutex::new(Vec::new()),
        };
        let text = send_json(&transport, "http://localhost/chat", &json!({"a": 1}), status_error)
            .await
            .expect("text");
        assert_eq!(text, "payload");

        let sent = transport.sent.lock().expect("lock");
        assert_eq!(sent[0].headers.get("Accept").map(String::as_str), Some("application/json"));
        assert_eq!(sent[0].body, br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn send_json_hands_failures_to_the_vendor_parser() {
        let transport = StatusTransport {
            status: 503,
            sent: Mutex::new(Vec::new()),
        };
        let err = send_json(&transport, "http://localhost/chat", &json!({}), status_error)
            .await
            .expect_err("status");
        match err {
            LLMError::Transport {
                status, message, ..
            } => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "vendor said payload");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn chat_body_omits_unset_options() {
        let body = build_chat_body(&[ChatMessage::user("Hi")], &ChatOptions::new("qwen-turbo"))
            .expect("body");
        assert_eq!(
            body,
            json!({
                "model": "qwen-turbo",
                "messages": [{"role": "user", "content": "Hi"}]
            })
        );
    }

    #[test]
    fn chat_body_includes_every_set_option() {
        let options = ChatOptions {
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.5),
            max_tokens: Some(64),
            top_p: Some(0.9),
            stop: Some(vec!["END".to_string()]),
        };
        let messages = [ChatMessage::system("be brief"), ChatMessage::user("Hello")];
        let body = build_chat_body(&messages, &options).expect("body");

        assert_eq!(body["temperature"], json!(0.5));
        assert_eq!(body["max_tokens"], json!(64));
        assert_eq!(body["top_p"], json!(0.9));
        assert_eq!(body["stop"], json!(["END"]));
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][1]["content"], json!("Hello"));
    }

    #[test]
    fn empty_inputs_are_validation_errors() {
        let err = build_chat_body(&[], &ChatOptions::new("m")).expect_err("no messages");
        assert!(matches!(err, LLMError::Validation { .. }));

        let err = build_chat_body(&[ChatMessage::user("x")], &ChatOptions::default())
            .expect_err("no model");
        assert!(matches!(err, LLMError::Validation { .. }));

        let err = build_embed_body(&[], &EmbedOptions::new("m")).expect_err("no texts");
        assert!(matches!(err, LLMError::Validation { .. }));
    }

    #[test]
    fn embed_body_adds_text_type_only_when_set() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let plain = build_embed_body(&texts, &EmbedOptions::new("text-embedding-v1")).expect("body");
        assert_eq!(
            plain,
            json!({"model": "text-embedding-v1", "input": {"texts": ["a", "b"]}})
        );

        let mut options = EmbedOptions::new("text-embedding-v1");
        options.embedding_type = Some(EmbeddingType::Query);
        let typed = build_embed_body(&texts, &options).expect("body");
        assert_eq!(typed["params"], json!({"text_type": "query"}));

        options.embedding_type = Some(EmbeddingType::Custom(String::new()));
        let blank = build_embed_body(&texts, &options).expect("body");
        assert!(blank.get("params").is_none());
    }
}
