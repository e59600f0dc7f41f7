//! Built-in read-only tools: web search and page fetch.

mod fetch_url;
mod web_search;

pub use fetch_url::FetchUrlTool;
pub use web_search::WebSearchTool;
