mod prompt;
mod session;

use anyhow::Result;
use clap::Parser;
use dao_agent::config::Settings;
use dao_agent::AgentLoop;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::prompt::rustyline::RustylinePrompt;
use crate::session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Conversation thread to use
    #[arg(short, long)]
    thread: Option<String>,

    /// Send a single request, print the answer and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Model to use instead of the configured one
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the variables may come from the real environment
    dotenv::dotenv().ok();

    // Keep the console for the conversation; logs only surface when asked for
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::new()?;
    if let Some(model) = cli.model {
        settings.provider.model = model;
    }
    let thread_id = cli
        .thread
        .unwrap_or_else(|| settings.agent.default_thread_id.clone());

    let agent = AgentLoop::from_settings(&settings)?;
    let mut session = Session::new(agent, Box::new(RustylinePrompt::new()?), thread_id);

    match cli.prompt {
        Some(prompt) => session.headless_start(&prompt).await,
        None => session.start().await,
    }
}
