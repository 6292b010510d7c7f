pub mod agent;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod tools;

pub use agent::AgentLoop;
pub use conversation::{ConversationStore, ConversationThread};
