//! Tavily Search Tool
//!
//! Calls the Tavily search API and hands the raw JSON body back to the agent.
//! Failures come back as plain-text tool results so the model can explain
//! them to the user and ask for a more specific query.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolResult};
use crate::config::SearchConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
pub const TOOL_NAME: &str = "tavily_search";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Web search through the Tavily API.
pub struct TavilySearchTool {
    api_key: String,
    url: String,
    max_results: u32,
    topic: String,
    search_depth: String,
    client: Client,
}

impl TavilySearchTool {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_key,
            url: TAVILY_SEARCH_URL.to_string(),
            max_results: 2,
            topic: "general".to_string(),
            search_depth: "basic".to_string(),
            client,
        }
    }

    /// Build from the `[search]` config section.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ToolError::Execution("Tavily API key not configured".to_string()))?;
        let mut tool = Self::new(api_key.expose_secret().to_string()).with_max_results(config.max_results);
        tool.topic = config.topic.clone();
        tool.search_depth = config.search_depth.clone();
        if let Some(url) = &config.base_url {
            tool.url = url.clone();
        }
        Ok(tool)
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }

    fn build_request<'a>(&'a self, query: &'a str, input: &'a Value) -> SearchRequest<'a> {
        let str_field = |key: &str| input.get(key).and_then(|v| v.as_str());
        let list_field = |key: &str| {
            input.get(key).and_then(|v| v.as_array()).map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .collect::<Vec<_>>()
            })
        };

        SearchRequest {
            query,
            max_results: self.max_results,
            topic: str_field("topic").unwrap_or(&self.topic),
            search_depth: str_field("search_depth").unwrap_or(&self.search_depth),
            time_range: str_field("time_range"),
            include_domains: list_field("include_domains").unwrap_or_default(),
            exclude_domains: list_field("exclude_domains").unwrap_or_default(),
            include_answer: false,
            include_raw_content: false,
            include_images: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    topic: &'a str,
    search_depth: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_range: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    include_domains: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclude_domains: Vec<&'a str>,
    include_answer: bool,
    include_raw_content: bool,
    include_images: bool,
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "A search engine optimized for comprehensive, accurate, and trusted results. \
         Useful for when you need to answer questions about current events. \
         Input should be a search query."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query to look up"
                },
                "topic": {
                    "type": "string",
                    "enum": ["general", "news", "finance"],
                    "description": "Category of the search"
                },
                "time_range": {
                    "type": "string",
                    "enum": ["day", "week", "month", "year"],
                    "description": "Restrict results to this recent time window"
                },
                "include_domains": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Only return results from these domains"
                },
                "exclude_domains": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Never return results from these domains"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let query = match input.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q,
            _ => {
                return Err(ToolError::InvalidInput {
                    tool: TOOL_NAME.to_string(),
                    message: "'query' is required".to_string(),
                });
            }
        };

        let body = self.build_request(query, &input);
        tracing::info!(
            "Tavily search: query={:?}, max_results={}, topic={}",
            query,
            body.max_results,
            body.topic
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!("Tavily search failed with HTTP {}: {}", status, text);
            return Ok(ToolResult::error(format!(
                "Error: Tavily search failed with HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| ToolError::Execution(format!("Invalid Tavily response: {}", e)))?;
        let result_count = parsed
            .get("results")
            .and_then(|r| r.as_array())
            .map(|r| r.len())
            .unwrap_or(0);

        if result_count == 0 {
            return Ok(ToolResult::error(format!(
                "No search results found for '{}'. Suggestions: try a more specific query, \
                 remove domain restrictions, or widen the time range.",
                query
            )));
        }

        tracing::debug!("Tavily returned {} results", result_count);
        Ok(ToolResult::success(text))
    }
}
