use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AgentSettings, Settings};
use crate::conversation::{ConversationStore, ConversationThread};
use crate::models::message::{Message, ToolRequest};
use crate::prompt_template::system_preamble;
use crate::providers::base::Provider;
use crate::providers::openai::OpenAiCompatibleProvider;
use crate::providers::utils::INVALID_TOOL_CALL_NAME;
use crate::tools::process::TokioProcessRunner;
use crate::tools::{default_tools, ToolRegistry};

const FALLBACK_PREAMBLE: &str = "You are a DAO governance agent.";
const CANCELLED_TOOL_CALL: &str = "Cancelled before completion";

/// Drives the conversation between the model and the tools for one thread at a time.
///
/// Each call to [`AgentLoop::reply`] is one turn: the model is asked for the next message,
/// any tool calls it makes are run concurrently and their results appended in request order,
/// and the model is asked again until it answers in plain text or the iteration cap is hit.
/// Every turn ends with an assistant message in the thread.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    settings: AgentSettings,
    completion_timeout: Duration,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        settings: AgentSettings,
        completion_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            registry,
            settings,
            completion_timeout,
        }
    }

    /// Assemble the agent described by `settings`: the OpenAI-compatible provider and the
    /// DAO, search and remote API tools
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let provider = OpenAiCompatibleProvider::new(settings.provider.clone())?;
        let registry = ToolRegistry::with_tools(default_tools(
            settings,
            Arc::new(TokioProcessRunner),
        )?)?;
        tracing::info!(
            tools = registry.len(),
            model = %settings.provider.model,
            "Agent ready"
        );

        Ok(Self::new(
            Arc::new(provider),
            Arc::new(registry),
            settings.agent.clone(),
            settings.provider.timeout(),
        ))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run a turn on `thread_id`, waiting for any turn already running on it
    pub async fn reply_in(&self, store: &ConversationStore, thread_id: &str, user_prompt: &str) -> String {
        let thread = store.get_or_create(thread_id).await;
        let mut thread = thread.lock().await;
        self.reply(&mut thread, user_prompt).await
    }

    /// Run one turn on a thread the caller has locked, returning the final assistant text
    pub async fn reply(&self, thread: &mut ConversationThread, user_prompt: &str) -> String {
        if thread.append_system_once(&self.preamble()) {
            tracing::debug!(thread_id = thread.thread_id(), "added system preamble");
        }
        let closed = thread.close_pending_tool_requests(CANCELLED_TOOL_CALL);
        if closed > 0 {
            tracing::warn!(
                thread_id = thread.thread_id(),
                closed,
                "previous turn was cancelled with tool calls outstanding"
            );
        }
        thread.append(Message::user().with_text(user_prompt));

        let tools = self.registry.tools();
        for iteration in 0..self.settings.max_iterations {
            tracing::debug!(thread_id = thread.thread_id(), iteration, "requesting completion");

            let completion =
                tokio::time::timeout(self.completion_timeout, self.provider.complete(thread.messages(), &tools))
                    .await
                    .unwrap_or_else(|_| {
                        Err(anyhow::anyhow!(
                            "the request timed out after {:?}",
                            self.completion_timeout
                        ))
                    });

            let response = match completion {
                Ok((response, _usage)) => response,
                Err(e) => {
                    tracing::error!(thread_id = thread.thread_id(), "completion failed: {}", e);
                    return finish(
                        thread,
                        format!("I could not get a response from the language model: {}", e),
                    );
                }
            };

            let tool_requests: Vec<ToolRequest> =
                response.tool_requests().into_iter().cloned().collect();
            thread.append(response.clone());

            if tool_requests.is_empty() {
                return response.text();
            }

            // Run the calls in parallel but record the results in the order they were requested
            let futures: Vec<_> = tool_requests
                .iter()
                .map(|request| self.dispatch_tool_call(request))
                .collect();
            let outputs = join_all(futures).await;

            for (request, (name, output, is_error)) in tool_requests.iter().zip(outputs) {
                thread.append(Message::tool().with_tool_result(
                    request.id.clone(),
                    name,
                    output,
                    is_error,
                ));
            }
        }

        tracing::warn!(
            thread_id = thread.thread_id(),
            max_iterations = self.settings.max_iterations,
            "iteration cap reached"
        );
        finish(
            thread,
            format!(
                "I was unable to complete this request within {} steps.",
                self.settings.max_iterations
            ),
        )
    }

    /// Run one requested tool, turning every failure into result text for the model
    async fn dispatch_tool_call(&self, request: &ToolRequest) -> (String, String, bool) {
        let call = match &request.tool_call {
            Ok(call) => call,
            Err(e) => return (INVALID_TOOL_CALL_NAME.to_string(), format!("Error: {}", e), true),
        };

        match self.registry.invoke(&call.name, call.arguments.clone()).await {
            Ok(output) => (call.name.clone(), output, false),
            Err(e) => {
                tracing::warn!(tool = %call.name, "tool call rejected: {}", e);
                (call.name.clone(), format!("Error: {}", e), true)
            }
        }
    }

    fn preamble(&self) -> String {
        let account_id = std::env::var(&self.settings.account_id_var)
            .ok()
            .filter(|id| !id.is_empty());

        system_preamble(&self.registry.tools(), account_id.as_deref()).unwrap_or_else(|e| {
            tracing::error!("failed to render system preamble: {}", e);
            FALLBACK_PREAMBLE.to_string()
        })
    }
}

fn finish(thread: &mut ConversationThread, text: String) -> String {
    thread.append(Message::assistant().with_text(text.clone()));
    text
}
