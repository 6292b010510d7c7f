//! Remote HTTP APIs as tool backends.

use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

/// A reqwest client with a fixed timeout, returning response bodies untouched
#[derive(Debug, Clone)]
pub struct HttpToolExecutor {
    client: Client,
}

impl HttpToolExecutor {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send the request and return the raw body. Non-2xx statuses are errors.
    pub async fn send(&self, request: RequestBuilder) -> anyhow::Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = %status, "tool backend returned an error status");
            anyhow::bail!("HTTP {}: {}", status, body);
        }
        Ok(body)
    }

    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> anyhow::Result<String> {
        let mut request = self.request(Method::POST, url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_json_returns_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("X-Test", "yes"))
            .and(body_json(json!({"a": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_string("  {\"raw\": true}\n"))
            .expect(1)
            .mount(&server)
            .await;

        let executor = HttpToolExecutor::new(Duration::from_secs(5)).unwrap();
        let body = executor
            .post_json(
                &format!("{}/echo", server.uri()),
                &[("X-Test", "yes")],
                &json!({"a": 1}),
            )
            .await
            .unwrap();
        assert_eq!(body, "  {\"raw\": true}\n");
    }

    #[tokio::test]
    async fn test_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let executor = HttpToolExecutor::new(Duration::from_secs(5)).unwrap();
        let err = executor
            .send(executor.request(Method::GET, &server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("down"));
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let executor = HttpToolExecutor::new(Duration::from_millis(100)).unwrap();
        let result = executor
            .send(executor.request(Method::GET, &server.uri()))
            .await;
        assert!(result.is_err());
    }
}
