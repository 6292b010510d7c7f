//! Tools the agent can call, and the backends that run them.
//!
//! Every tool is a [`ToolDescriptor`]: the model-facing [`Tool`] metadata plus a
//! [`ToolHandler`] that turns validated arguments into result text. Handlers never fail;
//! a missing credential or a broken backend is reported as text for the model to read.
pub mod dao;
pub mod http;
pub mod process;
pub mod registry;
pub mod remote;
pub mod search;
pub mod validation;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::config::Settings;
use crate::models::tool::Tool;
use process::ProcessRunner;

pub use registry::ToolRegistry;

/// The operation behind a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. Arguments have already been checked against the tool's input schema.
    async fn call(&self, arguments: Value) -> String;
}

/// A tool as registered with the [`ToolRegistry`]
#[derive(Clone)]
pub struct ToolDescriptor {
    pub tool: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new<H>(tool: Tool, handler: H) -> Self
    where
        H: ToolHandler + 'static,
    {
        Self {
            tool,
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.tool.name
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("tool", &self.tool)
            .finish_non_exhaustive()
    }
}

/// Read a credential from the environment at call time.
///
/// Returns `Err` with the standard failure text when the variable is absent or empty.
pub(crate) fn require_env(operation: &str, var: &str) -> Result<String, String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("{} failed: {} not set in environment.", operation, var)),
    }
}

/// Every tool the agent ships with, in the order the model sees them
pub fn default_tools(
    settings: &Settings,
    runner: Arc<dyn ProcessRunner>,
) -> anyhow::Result<Vec<ToolDescriptor>> {
    let mut tools = dao::dao_tools(&settings.chain, runner);
    tools.push(search::web_search_tool(&settings.search)?);
    tools.extend(remote::remote_tools_from_settings(&settings.remote_tools)?);
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use process::TokioProcessRunner;
    use serial_test::serial;

    #[test]
    fn test_default_tools() {
        let tools = default_tools(&Settings::default(), Arc::new(TokioProcessRunner)).unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["create_proposal", "get_all_proposals", "vote_on_proposal", "web_search"]
        );
        assert!(ToolRegistry::with_tools(tools).is_ok());
    }

    #[test]
    #[serial]
    fn test_require_env() {
        std::env::set_var("DAO_TEST_REQUIRED", "value");
        assert_eq!(
            require_env("Vote", "DAO_TEST_REQUIRED").unwrap(),
            "value"
        );
        std::env::set_var("DAO_TEST_REQUIRED_EMPTY", "");
        assert_eq!(
            require_env("Vote", "DAO_TEST_REQUIRED_EMPTY").unwrap_err(),
            "Vote failed: DAO_TEST_REQUIRED_EMPTY not set in environment."
        );
    }
}
