//! Tools described by a static JSON document and served by a remote REST API.
//!
//! The descriptor file is an array of
//! `{"name", "description", "inputSchema", "method", "path"}` objects, read once at startup.
//! `{param}` segments in `path` are filled from the call arguments; whatever arguments remain
//! are sent as query parameters for `GET` and as a JSON body otherwise.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use super::http::HttpToolExecutor;
use super::{ToolDescriptor, ToolHandler};
use crate::config::RemoteToolSettings;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
}

fn default_method() -> String {
    "GET".to_string()
}

pub fn load_specs(path: &Path) -> anyhow::Result<Vec<RemoteToolSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read remote tool descriptors from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid remote tool descriptors in {}", path.display()))
}

/// Fill `{param}` placeholders from `arguments`, returning the path and the unused arguments
fn substitute_path(template: &str, arguments: &Value) -> Result<(String, Map<String, Value>), String> {
    let mut remaining = arguments.as_object().cloned().unwrap_or_default();
    let mut path = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        let value = remaining
            .remove(name)
            .ok_or_else(|| format!("missing path parameter '{}'", name))?;

        path.push_str(&rest[..start]);
        path.push_str(&urlencoding::encode(&value_to_param(&value)));
        rest = &rest[start + len + 1..];
    }
    path.push_str(rest);

    Ok((path, remaining))
}

fn value_to_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct RemoteApiTool {
    name: String,
    method: Method,
    path: String,
    base_url: String,
    executor: HttpToolExecutor,
}

impl RemoteApiTool {
    async fn execute(&self, arguments: &Value) -> anyhow::Result<String> {
        let (path, remaining) =
            substitute_path(&self.path, arguments).map_err(anyhow::Error::msg)?;
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);

        let mut request = self.executor.request(self.method.clone(), &url);
        if !remaining.is_empty() {
            request = if self.method == Method::GET {
                let query: Vec<(String, String)> = remaining
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_param(v)))
                    .collect();
                request.query(&query)
            } else {
                request.json(&remaining)
            };
        }

        self.executor.send(request).await
    }
}

#[async_trait]
impl ToolHandler for RemoteApiTool {
    async fn call(&self, arguments: Value) -> String {
        tracing::info!(tool = %self.name, method = %self.method, "Calling remote API tool");
        match self.execute(&arguments).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(tool = %self.name, "Remote API tool failed: {}", e);
                format!("{} failed: {}", self.name, e)
            }
        }
    }
}

pub fn remote_tools(
    specs: Vec<RemoteToolSpec>,
    settings: &RemoteToolSettings,
) -> anyhow::Result<Vec<ToolDescriptor>> {
    let executor = HttpToolExecutor::new(settings.timeout())?;

    specs
        .into_iter()
        .map(|spec| {
            let method = Method::from_bytes(spec.method.to_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method for tool {}", spec.name))?;
            let handler = RemoteApiTool {
                name: spec.name.clone(),
                method,
                path: spec.path,
                base_url: settings.base_url.clone(),
                executor: executor.clone(),
            };
            Ok(ToolDescriptor::new(
                Tool::new(spec.name, spec.description, spec.input_schema),
                handler,
            ))
        })
        .collect()
}

/// Load the configured descriptor file, if any
pub fn remote_tools_from_settings(
    settings: &RemoteToolSettings,
) -> anyhow::Result<Vec<ToolDescriptor>> {
    match &settings.descriptor_path {
        Some(path) => {
            let specs = load_specs(path)?;
            tracing::info!(count = specs.len(), path = %path.display(), "Loaded remote API tools");
            remote_tools(specs, settings)
        }
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DESCRIPTORS: &str = r#"[
        {
            "name": "get_account",
            "description": "Return the account with the given id",
            "inputSchema": {
                "type": "object",
                "required": ["idOrAliasOrEvmAddress"],
                "properties": {
                    "idOrAliasOrEvmAddress": {"type": "string"},
                    "limit": {"type": "integer"}
                }
            },
            "method": "GET",
            "path": "/api/v1/accounts/{idOrAliasOrEvmAddress}"
        },
        {
            "name": "call_contract",
            "description": "Simulate a contract call",
            "inputSchema": {"type": "object", "properties": {"data": {"type": "string"}}},
            "method": "post",
            "path": "/api/v1/contracts/call"
        }
    ]"#;

    fn write_descriptors() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DESCRIPTORS.as_bytes()).unwrap();
        file
    }

    async fn registry(server: &MockServer) -> ToolRegistry {
        let file = write_descriptors();
        let settings = RemoteToolSettings {
            descriptor_path: Some(file.path().to_path_buf()),
            base_url: server.uri(),
            ..Default::default()
        };
        ToolRegistry::with_tools(remote_tools_from_settings(&settings).unwrap()).unwrap()
    }

    #[test]
    fn test_load_specs() {
        let file = write_descriptors();
        let specs = load_specs(file.path()).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "get_account");
        assert_eq!(specs[1].method, "post");
    }

    #[test]
    fn test_load_specs_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_specs(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_substitute_path() {
        let (path, rest) = substitute_path(
            "/api/v1/accounts/{id}/nfts",
            &json!({"id": "0.0.1234/x", "limit": 2}),
        )
        .unwrap();
        assert_eq!(path, "/api/v1/accounts/0.0.1234%2Fx/nfts");
        assert_eq!(Value::Object(rest), json!({"limit": 2}));

        let err = substitute_path("/api/v1/tokens/{tokenId}", &json!({})).unwrap_err();
        assert_eq!(err, "missing path parameter 'tokenId'");
    }

    #[tokio::test]
    async fn test_get_tool_uses_path_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/0.0.5005"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"account":"0.0.5005"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let output = registry(&server)
            .await
            .invoke(
                "get_account",
                json!({"idOrAliasOrEvmAddress": "0.0.5005", "limit": 5}),
            )
            .await
            .unwrap();
        assert_eq!(output, r#"{"account":"0.0.5005"}"#);
    }

    #[tokio::test]
    async fn test_post_tool_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/contracts/call"))
            .and(body_json(json!({"data": "0x1234"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("0x"))
            .expect(1)
            .mount(&server)
            .await;

        let output = registry(&server)
            .await
            .invoke("call_contract", json!({"data": "0x1234"}))
            .await
            .unwrap();
        assert_eq!(output, "0x");
    }

    #[tokio::test]
    async fn test_failure_is_reported_with_tool_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
            .mount(&server)
            .await;

        let output = registry(&server)
            .await
            .invoke("get_account", json!({"idOrAliasOrEvmAddress": "0.0.1"}))
            .await
            .unwrap();
        assert!(output.starts_with("get_account failed: "));
        assert!(output.contains("404"));
    }

    #[test]
    fn test_bundled_mirror_node_descriptors() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("mirror-node-tools.json");
        let specs = load_specs(&path).unwrap();
        let tools = remote_tools(specs, &RemoteToolSettings::default()).unwrap();

        let registry = ToolRegistry::with_tools(tools).unwrap();
        assert_eq!(registry.len(), 5);
        assert!(registry.tools().iter().any(|tool| tool.name == "get_token"));
    }

    #[test]
    fn test_no_descriptor_path_means_no_tools() {
        let tools = remote_tools_from_settings(&RemoteToolSettings::default()).unwrap();
        assert!(tools.is_empty());
    }
}
