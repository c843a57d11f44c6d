use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy};
use secrecy::{ExposeSecret, SecretString};

use crate::config::TransportConfig;
use crate::error::LLMError;

use super::{HttpRequest, HttpResponse, HttpTransport};

/// reqwest-backed HttpTransport with no retry or throttling of its own.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps a preconfigured reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a pooled client from the tuning knobs in `config`.
    ///
    /// The bearer token and JSON content type become default headers, so every request
    /// issued through this transport carries them without per-call work.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Config`] when the proxy URL or the API key cannot be used.
    pub fn from_config(config: &TransportConfig, api_key: &SecretString) -> Result<Self, LLMError> {
        let mut builder = Client::builder()
            .default_headers(default_headers(api_key)?)
            .pool_max_idle_per_host(config.max_idle_connections);

        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }
        if !config.idle_connection_timeout.is_zero() {
            builder = builder.pool_idle_timeout(config.idle_connection_timeout);
        }
        if let Some(proxy_url) = config.proxy_url.as_deref().filter(|url| !url.trim().is_empty()) {
            let proxy = Proxy::all(proxy_url)
                .map_err(|err| LLMError::config("proxy_url", format!("invalid proxy URL: {err}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map(Self::new)
            .map_err(|err| LLMError::config("transport", format!("failed to create reqwest client: {err}")))
    }

    fn build_request(&self, mut request: HttpRequest) -> Result<reqwest::RequestBuilder, LLMError> {
        let mut builder = self.client.post(&request.url);

        for (name, value) in request.headers.drain() {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                LLMError::transport(&request.url, format!("invalid header name: {err}"))
            })?;
            let header_value = HeaderValue::from_str(&value).map_err(|err| {
                LLMError::transport(
                    &request.url,
                    format!("invalid header value for {header_name}: {err}"),
                )
            })?;
            builder = builder.header(header_name, header_value);
        }

        Ok(builder.body(request.body))
    }

    fn headers_to_map(headers: &HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

fn default_headers(api_key: &SecretString) -> Result<HeaderMap, LLMError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
        .map_err(|_| LLMError::config("api_key", "contains characters not allowed in a header"))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let url = request.url.clone();
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(|err| LLMError::transport(&url, describe(&err)))?;

        let status = response.status().as_u16();
        let headers = Self::headers_to_map(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|err| LLMError::transport(&url, describe(&err)))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
