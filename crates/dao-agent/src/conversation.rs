use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::message::Message;
use crate::models::role::Role;
use crate::providers::utils::INVALID_TOOL_CALL_NAME;

/// One conversation's history. Messages are only ever appended.
#[derive(Debug, Clone)]
pub struct ConversationThread {
    thread_id: String,
    messages: Vec<Message>,
}

impl ConversationThread {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Open the thread with a system message. Returns false, changing nothing, once
    /// the thread has any history.
    pub fn append_system_once(&mut self, text: &str) -> bool {
        if !self.messages.is_empty() {
            return false;
        }
        self.messages.push(Message::system().with_text(text));
        true
    }

    /// Answer tool requests left without results by a turn that was dropped mid-flight.
    ///
    /// Only the tail of the history can hold such requests: the last assistant message that
    /// asked for tools, followed by nothing but tool results. Each unanswered request gets an
    /// error result carrying `note`. Returns how many results were added.
    pub fn close_pending_tool_requests(&mut self, note: &str) -> usize {
        let tail = self
            .messages
            .iter()
            .rev()
            .take_while(|message| message.role == Role::Tool)
            .count();
        let Some(request_index) = self.messages.len().checked_sub(tail + 1) else {
            return 0;
        };
        let request = &self.messages[request_index];
        if request.role != Role::Assistant {
            return 0;
        }

        let answered: Vec<&str> = self.messages[request_index + 1..]
            .iter()
            .flat_map(|message| message.content.iter())
            .filter_map(|content| content.as_tool_result())
            .map(|result| result.id.as_str())
            .collect();
        let pending: Vec<Message> = request
            .tool_requests()
            .into_iter()
            .filter(|request| !answered.contains(&request.id.as_str()))
            .map(|request| {
                let name = match &request.tool_call {
                    Ok(call) => call.name.as_str(),
                    Err(_) => INVALID_TOOL_CALL_NAME,
                };
                Message::tool().with_tool_result(request.id.clone(), name, note, true)
            })
            .collect();

        let added = pending.len();
        self.messages.extend(pending);
        added
    }

    pub fn has_system_message(&self) -> bool {
        self.messages
            .first()
            .is_some_and(|message| message.role == Role::System)
    }
}

pub type SharedThread = Arc<Mutex<ConversationThread>>;

/// All conversations held by this process, keyed by thread id.
///
/// Each thread sits behind its own async mutex. A turn keeps that lock for as long as it
/// runs, so turns on one thread queue up while different threads proceed in parallel.
#[derive(Debug, Default)]
pub struct ConversationStore {
    threads: Mutex<HashMap<String, SharedThread>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared handle for `thread_id`, creating an empty thread on first use
    pub async fn get_or_create(&self, thread_id: &str) -> SharedThread {
        let mut threads = self.threads.lock().await;
        threads
            .entry(thread_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(thread_id, "creating conversation thread");
                Arc::new(Mutex::new(ConversationThread::new(thread_id)))
            })
            .clone()
    }

    pub async fn get(&self, thread_id: &str) -> Option<SharedThread> {
        self.threads.lock().await.get(thread_id).cloned()
    }

    pub async fn append_system_once(&self, thread_id: &str, text: &str) -> bool {
        let thread = self.get_or_create(thread_id).await;
        let mut thread = thread.lock().await;
        thread.append_system_once(text)
    }

    pub async fn append(&self, thread_id: &str, message: Message) {
        let thread = self.get_or_create(thread_id).await;
        thread.lock().await.append(message);
    }

    /// A copy of the thread's history; empty for threads never created
    pub async fn snapshot(&self, thread_id: &str) -> Vec<Message> {
        match self.get(thread_id).await {
            Some(thread) => thread.lock().await.messages().to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn len(&self) -> usize {
        self.threads.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.threads.lock().await.is_empty()
    }
}
