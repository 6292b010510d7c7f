use serde_json::Value;
use std::collections::HashMap;

use super::validation::validate_arguments;
use super::ToolDescriptor;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

/// The set of tools available to the agent.
///
/// Filled once at startup and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a static list, failing on the first duplicate name
    pub fn with_tools<I>(descriptors: I) -> AgentResult<Self>
    where
        I: IntoIterator<Item = ToolDescriptor>,
    {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> AgentResult<()> {
        let name = descriptor.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateToolName(name));
        }
        self.index.insert(name, self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Model-facing metadata for every tool, in registration order
    pub fn tools(&self) -> Vec<Tool> {
        self.descriptors.iter().map(|d| d.tool.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Validate the arguments and run the named tool, returning its output untouched
    pub async fn invoke(&self, name: &str, arguments: Value) -> AgentResult<String> {
        let descriptor = self
            .index
            .get(name)
            .map(|&i| &self.descriptors[i])
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        validate_arguments(&arguments, &descriptor.tool.input_schema)
            .map_err(AgentError::InvalidParameters)?;

        tracing::debug!(tool = name, "invoking tool");
        Ok(descriptor.handler.call(arguments).await)
    }
}
