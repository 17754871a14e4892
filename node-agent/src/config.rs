//! Configuration for the node agent.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use uuid::Uuid;

/// Main configuration structure for the node agent.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    /// Relay link config; absent means the agent only serves its direct
    /// HTTP endpoint.
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NodeConfig {
    /// Stable node identifier; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    /// Capability tags advertised to the gateway.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Concurrent-request capacity hint.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL with a ws:// or wss:// scheme.
    pub control_url: String,
    /// Enrollment token minted by the gateway admin surface.
    pub token: String,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Ollama-style runtime base URL.
    #[serde(default = "default_runtime_url")]
    pub base_url: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_runtime_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// Default values
fn default_capacity() -> u32 {
    1
}
fn default_reconnect_delay() -> u64 {
    5
}
fn default_runtime_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8091
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (NODE__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("NODE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// The effective node id, generating a stable-enough one when the
    /// operator did not pick one.
    pub fn node_id(&self) -> String {
        if let Some(id) = self.node.id.as_deref() {
            let id = id.trim();
            if !id.is_empty() {
                return id.to_string();
            }
        }
        default_node_id()
    }
}

/// Derive a node id from the host name plus a short random suffix.
pub fn default_node_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    match std::env::var("HOSTNAME") {
        Ok(host) if !host.trim().is_empty() => {
            format!("node-{}-{}", host.trim(), &suffix[..6])
        }
        _ => format!("node-{}", &suffix[..6]),
    }
}
