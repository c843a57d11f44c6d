use serde::Deserialize;

use crate::error::{LLMError, excerpt};

/// DashScope 错误体为 `{"code","message","request_id"}`
pub(crate) fn parse_dashscope_error(endpoint: &str, status: u16, body: &str) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        code: Option<String>,
        message: Option<String>,
        request_id: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if parsed.code.is_some() || parsed.message.is_some() => {
            let mut message = parsed.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(code) = parsed.code {
                message = format!("{message} ({code})");
            }
            if let Some(request_id) = parsed.request_id {
                message = format!("{message} [request_id {request_id}]");
            }
            LLMError::status(endpoint, status, message)
        }
        _ => LLMError::status(endpoint, status, format!("status {status}: {}", excerpt(body))),
    }
}
