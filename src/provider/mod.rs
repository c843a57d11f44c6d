use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::call::CallContext;
use crate::error::LLMError;
use crate::options::{ChatOptions, EmbedOptions};
use crate::types::{ChatMessage, ChatResponse, EmbedResponse};

pub mod dashscope;
pub mod openai;
pub(crate) mod request;

/// 供应商 chat 策略 通过 [`crate::context::ModelContext`] 互相替换
#[async_trait]
pub trait ChatStrategy: Send + Sync {
    /// 发送消息并返回归一化的结果
    async fn chat(
        &self,
        ctx: &CallContext,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<Box<dyn ChatResponse>, LLMError>;

    /// 供应商名称
    fn name(&self) -> &'static str;
}

/// 供应商 embedding 策略
#[async_trait]
pub trait EmbedStrategy: Send + Sync {
    /// 每条输入文本返回一个向量 顺序与输入一致
    async fn embed(
        &self,
        ctx: &CallContext,
        texts: &[String],
        options: &EmbedOptions,
    ) -> Result<Box<dyn EmbedResponse>, LLMError>;

    /// 供应商名称
    fn name(&self) -> &'static str;
}

/// 线程安全的 chat 策略
pub type DynChatStrategy = Arc<dyn ChatStrategy>;

/// 线程安全的 embed 策略
pub type DynEmbedStrategy = Arc<dyn EmbedStrategy>;

/// Runs `future`, converting a panic inside it into [`LLMError::Internal`].
pub(crate) async fn shield<F, T>(
    component: &'static str,
    operation: &'static str,
    future: F,
) -> Result<T, LLMError>
where
    F: Future<Output = Result<T, LLMError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(component, operation, panic = %message, "caught panic at call boundary");
            Err(LLMError::Internal {
                message: format!("{component} {operation} panicked: {message}"),
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Parses a 2xx body, validates its envelope with `check`, then decodes it into `T`.
///
/// `check` returns the path and reason of the first missing or malformed field, so the
/// resulting [`LLMError::ResponseFormat`] names it precisely.
pub(crate) fn decode_payload<T, C>(provider: &'static str, text: &str, check: C) -> Result<T, LLMError>
where
    T: DeserializeOwned,
    C: FnOnce(&Value) -> Result<(), (String, String)>,
{
    let value: Value = serde_json::from_str(text)
        .map_err(|err| LLMError::response_format(provider, "body", format!("not JSON: {err}"), text))?;
    check(&value).map_err(|(field, reason)| LLMError::response_format(provider, field, reason, text))?;
    serde_json::from_value(value)
        .map_err(|err| LLMError::response_format(provider, "body", err.to_string(), text))
}

/// Puts vectors back in input order.
///
/// When every entry carries an index the result is ordered by it; when none do, the
/// response order is kept. Mixed, duplicated or out-of-range indices and a vector count
/// different from `expected` are rejected.
pub(crate) fn order_embeddings(
    provider: &'static str,
    field: &str,
    entries: Vec<(Option<usize>, Vec<f32>)>,
    expected: usize,
    body: &str,
) -> Result<Vec<Vec<f32>>, LLMError> {
    let malformed = |reason: String| LLMError::response_format(provider, field, reason, body);

    if entries.len() != expected {
        return Err(malformed(format!(
            "expected {expected} embeddings, got {}",
            entries.len()
        )));
    }
    if entries.iter().all(|(index, _)| index.is_none()) {
        return Ok(entries.into_iter().map(|(_, vector)| vector).collect());
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, (index, vector)) in entries.into_iter().enumerate() {
        let index = index.ok_or_else(|| malformed(format!("entry {position} has no index")))?;
        let slot = slots
            .get_mut(index)
            .ok_or_else(|| malformed(format!("index {index} out of range for {expected} inputs")))?;
        if slot.replace(vector).is_some() {
            return Err(malformed(format!("duplicate index {index}")));
        }
    }
    // Every slot is filled: the count matches and no index repeats.
    Ok(slots.into_iter().flatten().collect())
}

/// Every ordering of `0..n`, used to shuffle vendor index order in tests.
#[cfg(test)]
pub(crate) fn index_permutations(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for shorter in index_permutations(n - 1) {
        for position in 0..=shorter.len() {
            let mut order = shorter.clone();
            order.insert(position, n - 1);
            result.push(order);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_permutations_cover_every_order() {
        let orders = index_permutations(4);
        assert_eq!(orders.len(), 24);
        let mut unique = orders.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 24);
    }

    #[tokio::test]
    async fn shield_converts_panics_into_internal_errors() {
        let result: Result<(), LLMError> =
            shield("test", "chat", async { panic!("strategy exploded") }).await;
        match result {
            Err(LLMError::Internal { message }) => {
                assert!(message.contains("strategy exploded"), "{message}")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn shield_passes_results_through() {
        let ok = shield("test", "chat", async { Ok::<_, LLMError>(7) }).await;
        assert_eq!(ok.expect("value"), 7);

        let err = shield("test", "chat", async {
            Err::<(), _>(LLMError::Validation {
                message: "bad".into(),
            })
        })
        .await;
        assert!(matches!(err, Err(LLMError::Validation { .. })));
    }

    #[test]
    fn order_embeddings_sorts_by_index() {
        let entries = vec![
            (Some(2), vec![0.5]),
            (Some(0), vec![0.1]),
            (Some(1), vec![0.3]),
        ];
        let ordered = order_embeddings("p", "data", entries, 3, "{}").expect("ordered");
        assert_eq!(ordered, vec![vec![0.1], vec![0.3], vec![0.5]]);
    }

    #[test]
    fn order_embeddings_keeps_response_order_without_indices() {
        let entries = vec![(None, vec![0.9]), (None, vec![0.1])];
        let ordered = order_embeddings("p", "data", entries, 2, "{}").expect("ordered");
        assert_eq!(ordered, vec![vec![0.9], vec![0.1]]);
    }

    #[test]
    fn order_embeddings_rejects_bad_indices() {
        let cases = vec![
            vec![(Some(0), vec![0.1]), (Some(0), vec![0.2])],
            vec![(Some(0), vec![0.1]), (Some(5), vec![0.2])],
            vec![(Some(0), vec![0.1]), (None, vec![0.2])],
            vec![(Some(0), vec![0.1])],
        ];
        for entries in cases {
            let err = order_embeddings("p", "output.embeddings", entries, 2, "{}")
                .expect_err("should reject");
            match err {
                LLMError::ResponseFormat { field, .. } => assert_eq!(field, "output.embeddings"),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn decode_payload_reports_non_json_body() {
        let err = decode_payload::<Value, _>("p", "<html>oops</html>", |_| Ok(()))
            .expect_err("not json");
        match err {
            LLMError::ResponseFormat { field, body, .. } => {
                assert_eq!(field, "body");
                assert!(body.contains("oops"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
