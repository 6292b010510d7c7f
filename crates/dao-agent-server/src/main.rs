mod configuration;
mod routes;
mod state;

use dao_agent::config::Settings;
use dao_agent::AgentLoop;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::configuration::ServerSettings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the variables may come from the real environment
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dao_agent=info,dao_agent_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::new()?;
    let server = ServerSettings::new()?;

    let agent = AgentLoop::from_settings(&settings)?;
    let state = AppState::new(agent, settings.agent.default_thread_id.clone());
    let app = routes::configure(state);

    let listener = tokio::net::TcpListener::bind(server.socket_addr()?).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
