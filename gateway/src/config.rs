use std::env;

/// Gateway configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 11435)
    pub port: u16,
    /// Comma-separated API keys for the front door
    pub api_keys: String,
    /// Secret for signing enrollment tokens
    pub enrollment_secret: String,
    /// Enrollment token time-to-live in seconds (default: 3600)
    pub enrollment_ttl_secs: u64,
    /// Whether the relay WebSocket endpoint is exposed (default: true)
    pub relay_enabled: bool,
    /// Register a colocated node agent at startup (default: true)
    pub local_node_enabled: bool,
    /// Node id for the colocated agent (default: local)
    pub local_node_id: String,
    /// Base URL of the colocated agent (default: http://127.0.0.1:8091)
    pub local_node_endpoint: String,
    /// Comma-separated tags for the colocated agent
    pub local_node_tags: String,
    /// Default chat model when a request omits one
    pub default_model: String,
    /// Default embeddings model when a request omits one
    pub default_embed_model: String,
    /// Per-request dispatch deadline in seconds (default: 120)
    pub request_timeout_secs: u64,
    /// Log level (default: info)
    pub log_level: String,
    /// CORS allowed origins (comma-separated, default: *)
    pub cors_origins: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "11435".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("PORT"))?,
            api_keys: env::var("API_KEYS").unwrap_or_else(|_| "dev-key-change-me".to_string()),
            enrollment_secret: env::var("ENROLLMENT_SECRET")
                .unwrap_or_else(|_| "dev-enroll-change-me".to_string()),
            enrollment_ttl_secs: env::var("ENROLLMENT_TTL_SECONDS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("ENROLLMENT_TTL_SECONDS"))?,
            relay_enabled: env::var("RELAY_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            local_node_enabled: env::var("LOCAL_NODE_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            local_node_id: env::var("LOCAL_NODE_ID").unwrap_or_else(|_| "local".to_string()),
            local_node_endpoint: env::var("LOCAL_NODE_ENDPOINT")
                .unwrap_or_else(|_| "http://127.0.0.1:8091".to_string()),
            local_node_tags: env::var("LOCAL_NODE_TAGS").unwrap_or_else(|_| "local".to_string()),
            default_model: env::var("DEFAULT_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            default_embed_model: env::var("DEFAULT_EMBED_MODEL")
                .unwrap_or_else(|_| "nomic-embed-text".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("REQUEST_TIMEOUT_SECONDS"))?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            cors_origins: env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        })
    }

    /// The accepted API keys, split and trimmed.
    pub fn api_key_list(&self) -> Vec<String> {
        split_csv(&self.api_keys)
    }

    /// Tags applied to the colocated node record.
    pub fn local_node_tag_list(&self) -> Vec<String> {
        split_csv(&self.local_node_tags)
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid number in environment variable: {0}")]
    InvalidNumber(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_list_splits_and_trims() {
        let mut config = test_config();
        config.api_keys = "key-a, key-b,,key-c ".to_string();
        assert_eq!(config.api_key_list(), vec!["key-a", "key-b", "key-c"]);
    }

    fn test_config() -> Config {
        Config {
            host: "0.0.0.0".to_string(),
            port: 11435,
            api_keys: String::new(),
            enrollment_secret: "secret".to_string(),
            enrollment_ttl_secs: 3600,
            relay_enabled: true,
            local_node_enabled: false,
            local_node_id: "local".to_string(),
            local_node_endpoint: "http://127.0.0.1:8091".to_string(),
            local_node_tags: "local".to_string(),
            default_model: "llama3.2".to_string(),
            default_embed_model: "nomic-embed-text".to_string(),
            request_timeout_secs: 120,
            log_level: "info".to_string(),
            cors_origins: "*".to_string(),
        }
    }
}
