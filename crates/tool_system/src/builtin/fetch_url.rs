use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::registry::Tool;

/// Body text cap; pages past this are truncated rather than rejected.
const MAX_CONTENT_CHARS: usize = 20_000;

/// Fetch a URL and return its body text. Read-only.
pub struct FetchUrlTool {
    http: reqwest::Client,
}

impl FetchUrlTool {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for FetchUrlTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "Fetch the contents of a web page by URL. Long pages are truncated."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The http(s) URL to fetch"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let url = args["url"]
            .as_str()
            .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
            .ok_or_else(|| {
                ToolError::InvalidArguments("missing or non-http 'url'".to_string())
            })?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| ToolError::Execution(format!("fetch failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Execution(format!(
                "fetch returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|error| ToolError::Execution(format!("failed to read body: {error}")))?;

        let truncated = body.chars().count() > MAX_CONTENT_CHARS;
        let content: String = body.chars().take(MAX_CONTENT_CHARS).collect();

        Ok(json!({
            "url": url,
            "status": status.as_u16(),
            "content": content,
            "truncated": truncated,
        }))
    }
}
