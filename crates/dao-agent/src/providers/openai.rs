use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::base::{Provider, Usage};
use super::utils::{messages_to_openai_spec, openai_response_to_message, tools_to_openai_spec};
use crate::config::ProviderSettings;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Any chat completions API speaking the OpenAI wire format, Gemini's included
pub struct OpenAiCompatibleProvider {
    client: Client,
    settings: ProviderSettings,
}

impl OpenAiCompatibleProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout()).build()?;

        Ok(Self { client, settings })
    }

    fn api_key(&self) -> Result<String> {
        match std::env::var(&self.settings.api_key_var) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(anyhow!(
                "{} not set in environment.",
                self.settings.api_key_var
            )),
        }
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };
        let field = |name: &str| usage.get(name).and_then(|v| v.as_i64()).map(|v| v as i32);

        let input_tokens = field("prompt_tokens");
        let output_tokens = field("completion_tokens");
        let total_tokens = field("total_tokens").or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key()?)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow!("Request failed: {}: {}", status, body))
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<(Message, Usage)> {
        let mut payload = json!({
            "model": self.settings.model,
            "messages": messages_to_openai_spec(messages),
        });

        if !tools.is_empty() {
            payload["tools"] = json!(tools_to_openai_spec(tools)?);
        }
        if let Some(temp) = self.settings.temperature {
            payload["temperature"] = json!(temp);
        }
        if let Some(tokens) = self.settings.max_tokens {
            payload["max_tokens"] = json!(tokens);
        }

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("Model API error: {}", error));
        }

        let message = openai_response_to_message(&response)?;
        let usage = Self::get_usage(&response);
        tracing::debug!(
            model = %self.settings.model,
            input_tokens = ?usage.input_tokens,
            output_tokens = ?usage.output_tokens,
            "completion received"
        );

        Ok((message, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer, api_key_var: &str) -> ProviderSettings {
        ProviderSettings {
            base_url: format!("{}/v1beta/openai", server.uri()),
            model: "gemini-2.0-flash".to_string(),
            api_key_var: api_key_var.to_string(),
            temperature: Some(0.7),
            ..Default::default()
        }
    }

    async fn setup_mock_server(response_body: Value) -> (MockServer, OpenAiCompatibleProvider) {
        std::env::set_var("DAO_TEST_MODEL_KEY", "test_api_key");
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/openai/chat/completions"))
            .and(header("Authorization", "Bearer test_api_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let provider =
            OpenAiCompatibleProvider::new(settings(&mock_server, "DAO_TEST_MODEL_KEY"))
                .unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    #[serial]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello! How can I help with your DAO today?",
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let (server, provider) = setup_mock_server(response_body).await;

        let messages = vec![
            Message::system().with_text("You are a DAO agent."),
            Message::user().with_text("Hello?"),
        ];
        let (message, usage) = provider.complete(&messages, &[]).await?;

        assert_eq!(message.text(), "Hello! How can I help with your DAO today?");
        assert_eq!(usage, Usage::new(Some(12), Some(15), Some(27)));

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body)?;
        assert_eq!(body["model"], "gemini-2.0-flash");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body.get("tools").is_none());
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_complete_tool_request() -> Result<()> {
        let response_body = json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "web_search",
                            "arguments": "{\"query\":\"hedera governance\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let (server, provider) = setup_mock_server(response_body).await;

        let tool = Tool::new(
            "web_search",
            "Performs a web search for a given query.",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        );
        let messages = vec![Message::user().with_text("What is Hedera governance?")];
        let (message, usage) = provider.complete(&messages, &[tool]).await?;

        let requests = message.tool_requests();
        let tool_call = requests[0].tool_call.as_ref().unwrap();
        assert_eq!(tool_call.name, "web_search");
        assert_eq!(tool_call.arguments, json!({"query": "hedera governance"}));
        assert_eq!(usage, Usage::default());

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body)?;
        assert_eq!(body["tools"][0]["function"]["name"], "web_search");
        assert_eq!(body["temperature"], json!(0.7f32));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_api_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider =
            OpenAiCompatibleProvider::new(settings(&server, "DAO_TEST_UNSET_MODEL_KEY"))
                .unwrap();
        let err = provider
            .complete(&[Message::user().with_text("hi")], &[])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "DAO_TEST_UNSET_MODEL_KEY not set in environment."
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_server_error() {
        std::env::set_var("DAO_TEST_MODEL_KEY_500", "key");
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider =
            OpenAiCompatibleProvider::new(settings(&server, "DAO_TEST_MODEL_KEY_500"))
                .unwrap();
        let err = provider
            .complete(&[Message::user().with_text("hi")], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Server error"));
    }
}
