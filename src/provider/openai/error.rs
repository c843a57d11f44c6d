use serde::Deserialize;
use serde_json::Value;

use crate::error::{LLMError, excerpt};

/// 将非 2xx 响应转换为 Transport 错误 优先使用 `error.message`
pub(crate) fn parse_openai_error(endpoint: &str, status: u16, body: &str) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }
    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        r#type: Option<String>,
        code: Option<Value>,
    }

    if let Ok(ErrorBody { error: Some(error) }) = serde_json::from_str::<ErrorBody>(body) {
        let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
        if let Some(kind) = error.r#type {
            message = format!("{message} [{kind}]");
        }
        match error.code {
            Some(Value::Null) | None => {}
            Some(Value::String(code)) => message = format!("{message} ({code})"),
            Some(code) => message = format!("{message} ({code})"),
        }
        return LLMError::status(endpoint, status, message);
    }
    LLMError::status(endpoint, status, format!("status {status}: {}", excerpt(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_message_type_and_code() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        match parse_openai_error("https://api.openai.com/v1/chat/completions", 401, body) {
            LLMError::Transport {
                status, message, ..
            } => {
                assert_eq!(status, Some(401));
                assert_eq!(
                    message,
                    "Incorrect API key provided [invalid_request_error] (invalid_api_key)"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_body_excerpt() {
        match parse_openai_error("u", 502, "<html>Bad Gateway</html>") {
            LLMError::Transport {
                status, message, ..
            } => {
                assert_eq!(status, Some(502));
                assert!(message.contains("Bad Gateway"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
