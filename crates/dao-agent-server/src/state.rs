use dao_agent::{AgentLoop, ConversationStore};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentLoop>,
    pub store: Arc<ConversationStore>,
    pub default_thread_id: String,
}

impl AppState {
    pub fn new(agent: AgentLoop, default_thread_id: impl Into<String>) -> Self {
        Self {
            agent: Arc::new(agent),
            store: Arc::new(ConversationStore::new()),
            default_thread_id: default_thread_id.into(),
        }
    }
}
