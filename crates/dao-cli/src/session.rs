use anyhow::Result;

use crate::prompt::{InputType, Prompt};
use dao_agent::models::message::Message;
use dao_agent::models::role::Role;
use dao_agent::{AgentLoop, ConversationStore};

pub struct Session<'a> {
    agent: AgentLoop,
    store: ConversationStore,
    thread_id: String,
    prompt: Box<dyn Prompt + 'a>,
}

impl<'a> Session<'a> {
    pub fn new(agent: AgentLoop, prompt: Box<dyn Prompt + 'a>, thread_id: impl Into<String>) -> Self {
        Session {
            agent,
            store: ConversationStore::new(),
            thread_id: thread_id.into(),
            prompt,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.prompt.render(&raw_message(&format!(
            "Starting session on thread {} with {} tools.",
            self.thread_id,
            self.agent.registry().len()
        )));
        self.prompt.agent_ready();

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Message => {
                    if let Some(content) = &input.content {
                        self.prompt.show_busy();
                        self.agent_process_message(content).await;
                    }
                }
                InputType::History => {
                    let history = self.store.snapshot(&self.thread_id).await;
                    self.prompt.render_history(&history);
                }
                InputType::Exit => break,
                InputType::AskAgain => continue,
            }
        }

        self.prompt.close();
        Ok(())
    }

    pub async fn headless_start(&mut self, initial_message: &str) -> Result<()> {
        self.agent_process_message(initial_message).await;
        self.prompt.close();
        Ok(())
    }

    async fn agent_process_message(&mut self, content: &str) {
        let seen = self.store.snapshot(&self.thread_id).await.len();
        tracing::debug!(thread_id = %self.thread_id, "starting turn");

        tokio::select! {
            _ = self.agent.reply_in(&self.store, &self.thread_id, content) => {
                self.prompt.hide_busy();
            }
            _ = tokio::signal::ctrl_c() => {
                self.prompt.hide_busy();
                // Whatever the turn already recorded stays in the thread
                self.prompt.render(&raw_message("Interrupt: the request was cancelled."));
                return;
            }
        }

        // Show what this turn added after the user's message: tool traffic and the answer
        let history = self.store.snapshot(&self.thread_id).await;
        for message in history
            .iter()
            .skip(seen)
            .filter(|m| !matches!(m.role, Role::System | Role::User))
        {
            self.prompt.render(message);
        }
    }
}

fn raw_message(content: &str) -> Message {
    Message::assistant().with_text(content)
}
