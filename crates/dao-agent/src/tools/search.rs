use async_trait::async_trait;
use serde_json::{json, Value};

use super::http::HttpToolExecutor;
use super::{require_env, ToolDescriptor, ToolHandler};
use crate::config::SearchSettings;
use crate::models::tool::Tool;

/// Web search through the Serper API
struct WebSearch {
    endpoint: String,
    api_key_var: String,
    executor: HttpToolExecutor,
}

#[async_trait]
impl ToolHandler for WebSearch {
    async fn call(&self, arguments: Value) -> String {
        let api_key = match require_env("Web search", &self.api_key_var) {
            Ok(key) => key,
            Err(failure) => return failure,
        };
        let query = arguments["query"].as_str().unwrap_or_default();
        tracing::info!(query, "Searching the web");

        match self
            .executor
            .post_json(
                &self.endpoint,
                &[("X-API-KEY", api_key.as_str())],
                &json!({ "q": query }),
            )
            .await
        {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Web search failed: {}", e);
                format!("Web search error: {}", e)
            }
        }
    }
}

pub fn web_search_tool(settings: &SearchSettings) -> anyhow::Result<ToolDescriptor> {
    let handler = WebSearch {
        endpoint: settings.endpoint.clone(),
        api_key_var: settings.api_key_var.clone(),
        executor: HttpToolExecutor::new(settings.timeout())?,
    };

    Ok(ToolDescriptor::new(
        Tool::new(
            "web_search",
            "Performs a web search for a given query.",
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query."
                    }
                }
            }),
        ),
        handler,
    ))
}
