use std::time::Duration;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use serde_json::Value;

use chat_core::Config;

use crate::error::ClientError;
use crate::event::ChatStream;
use crate::sse::event_stream;

pub const APP_TITLE: &str = "AI Assistant";

/// HTTP transport for the chat-completion API. Request dispatch goes through
/// retrying middleware; an open stream is never retried.
pub struct ChatClient {
    http: ClientWithMiddleware,
    api_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: Option<WireErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl ChatClient {
    pub fn new(config: &Config, api_key: impl Into<String>) -> Self {
        Self {
            http: build_retry_client(),
            api_key: api_key.into(),
            api_base: config.api_base.clone(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Dispatch one streaming chat-completion request and adapt the response
    /// body into the typed event stream.
    pub async fn chat_stream(&self, body: &Value) -> Result<ChatStream, ClientError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", APP_TITLE)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = extract_error_message(response, status.as_u16()).await;
            log::error!("chat completion request failed: HTTP {status}: {message}");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(event_stream(response))
    }

    /// List model ids; also serves as the key validation probe.
    pub async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let response = self
            .http
            .get(format!("{}/models", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", APP_TITLE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = extract_error_message(response, status.as_u16()).await;
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let models: ModelsResponse = response.json().await?;
        Ok(models.data.into_iter().map(|entry| entry.id).collect())
    }
}

fn build_retry_client() -> ClientWithMiddleware {
    // Exponential backoff: 1s, 2s, 4s with jitter
    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(Duration::from_secs(1), Duration::from_secs(8))
        .build_with_max_retries(3);

    ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

async fn extract_error_message(response: reqwest::Response, status: u16) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<WireErrorBody>(&body)
        .ok()
        .and_then(|wire| wire.error)
        .and_then(|detail| detail.message)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
