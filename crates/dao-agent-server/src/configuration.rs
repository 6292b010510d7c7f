use config::Config;
use dao_agent::config::{environment, ConfigError};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerSettings {
    /// Read the `server` section from `DAO_AGENT_SERVER__*` variables
    pub fn new() -> Result<Self, ConfigError> {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Root {
            server: ServerSettings,
        }

        let config = Config::builder().add_source(environment()).build()?;
        let root: Root = config.try_deserialize()?;
        Ok(root.server)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|e| ConfigError::InvalidEnvVar {
            env_var: dao_agent::config::to_env_var("server.host"),
            message: format!("{}: {}", self.host, e),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
