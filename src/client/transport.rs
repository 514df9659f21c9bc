//! HTTP transport for the client runtime.
//!
//! A thin wrapper around a configured `reqwest::Client`, builder-style
//! timeout/header configuration, and uniform error classification
//! (`Timeout` vs `Transport` vs `Http`). Every call here is a plain REST
//! request against the agent's route table.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RuntimeError, RuntimeResult};

/// Client-side configuration: base URL, request timeout, and headers
/// sent with every request (e.g. an opaque auth token).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub headers: HashMap<String, String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(60),
            headers: HashMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// A configured HTTP client bound to one agent's base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> RuntimeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RuntimeError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn apply_headers(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (key, value) in &self.config.headers {
            builder = builder.header(key, value);
        }
        builder
    }

    async fn send_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> RuntimeResult<R> {
        let mut builder = self.client.request(method, self.url(path));
        builder = self.apply_headers(builder);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(classify_reqwest_error)?;

        if !status.is_success() {
            return Err(RuntimeError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| RuntimeError::InvalidJson(e.to_string()))
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> RuntimeResult<R> {
        self.send_json::<(), R>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> RuntimeResult<R> {
        self.send_json(Method::POST, path, Some(body)).await
    }

    pub async fn post_empty<R: DeserializeOwned>(&self, path: &str) -> RuntimeResult<R> {
        self.send_json::<(), R>(Method::POST, path, None).await
    }

    /// Opens a raw SSE response, deferring line parsing to
    /// [`super::sse::SseStream`].
    pub async fn get_sse(&self, path: &str) -> RuntimeResult<reqwest::Response> {
        let mut builder = self.client.get(self.url(path)).header("Accept", "text/event-stream");
        builder = self.apply_headers(builder);
        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RuntimeError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Sends a POST and opens the SSE response it returns, for
    /// streaming entrypoint invocations.
    pub async fn post_sse<B: Serialize>(&self, path: &str, body: &B) -> RuntimeResult<reqwest::Response> {
        let mut builder = self
            .client
            .post(self.url(path))
            .header("Accept", "text/event-stream")
            .json(body);
        builder = self.apply_headers(builder);
        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RuntimeError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> RuntimeError {
    if err.is_timeout() {
        RuntimeError::Timeout(err.to_string())
    } else {
        RuntimeError::Transport(err.to_string())
    }
}
