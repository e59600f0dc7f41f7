use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::registry::Tool;

const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com";
const DEFAULT_MAX_RESULTS: usize = 5;

/// Web search backed by the DuckDuckGo instant-answer API. Read-only; safe to
/// abandon mid-flight on cancellation.
pub struct WebSearchTool {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns a short abstract and related results."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of related results to return (default 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let query = args["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("missing 'query'".to_string()))?;
        let max_results = args["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let response = self
            .http
            .get(format!("{}/", self.endpoint))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|error| ToolError::Execution(format!("search request failed: {error}")))?;

        if !response.status().is_success() {
            return Err(ToolError::Execution(format!(
                "search returned HTTP {}",
                response.status()
            )));
        }

        let answer: InstantAnswer = response
            .json()
            .await
            .map_err(|error| ToolError::Execution(format!("bad search response: {error}")))?;

        let results: Vec<Value> = answer
            .related_topics
            .iter()
            .filter(|topic| !topic.text.is_empty())
            .take(max_results)
            .map(|topic| json!({ "title": topic.text, "url": topic.first_url }))
            .collect();

        Ok(json!({
            "query": query,
            "heading": answer.heading,
            "abstract": answer.abstract_text,
            "abstract_url": answer.abstract_url,
            "results": results,
        }))
    }
}
