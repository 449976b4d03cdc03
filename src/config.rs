use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::mcp::capabilities::{CapabilityFlags, ServerIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Mock,
    Ollama,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: Option<String>,
    pub bind_addr: String,
    pub bind_port: u16,
    pub identity: ServerIdentity,
    pub capabilities: CapabilityFlags,
    pub ai_provider: AiProvider,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub collaborator_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("{0} must be true or false")]
    InvalidFlag(&'static str),
    #[error("AI_PROVIDER must be one of: mock, ollama")]
    InvalidAiProvider,
    #[error("COLLABORATOR_TIMEOUT_SECS must be an integer between 1 and 300")]
    InvalidTimeout,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn flag_var(name: &'static str) -> Result<bool, ConfigError> {
    match non_empty_var(name).map(|value| value.to_ascii_lowercase()) {
        None => Ok(true),
        Some(value) => match value.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag(name)),
        },
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = non_empty_var("MCP_API_TOKEN");

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let bind_port = env::var("BIND_PORT")
            .ok()
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let defaults = ServerIdentity::default();
        let identity = ServerIdentity {
            name: non_empty_var("MCP_SERVER_NAME").unwrap_or(defaults.name),
            version: non_empty_var("MCP_SERVER_VERSION").unwrap_or(defaults.version),
            description: non_empty_var("MCP_SERVER_DESCRIPTION").unwrap_or(defaults.description),
            homepage: non_empty_var("MCP_SERVER_HOMEPAGE"),
        };

        let capabilities = CapabilityFlags {
            tools: flag_var("MCP_TOOLS_ENABLED")?,
            resources: flag_var("MCP_RESOURCES_ENABLED")?,
            prompts: flag_var("MCP_PROMPTS_ENABLED")?,
        };

        let ai_provider = match non_empty_var("AI_PROVIDER")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("mock") => AiProvider::Mock,
            Some("ollama") => AiProvider::Ollama,
            Some(_) => return Err(ConfigError::InvalidAiProvider),
        };

        let timeout_secs = non_empty_var("COLLABORATOR_TIMEOUT_SECS")
            .map(|value| value.parse::<u64>().map_err(|_| ConfigError::InvalidTimeout))
            .transpose()?
            .unwrap_or(30);
        if !(1..=300).contains(&timeout_secs) {
            return Err(ConfigError::InvalidTimeout);
        }

        let config = Self {
            api_token,
            bind_addr,
            bind_port,
            identity,
            capabilities,
            ai_provider,
            ollama_base_url: non_empty_var("OLLAMA_BASE_URL")
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            ollama_model: non_empty_var("OLLAMA_MODEL").unwrap_or_else(|| "llama2".to_string()),
            collaborator_timeout: Duration::from_secs(timeout_secs),
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 14] = [
        "MCP_API_TOKEN",
        "BIND_ADDR",
        "BIND_PORT",
        "MCP_SERVER_NAME",
        "MCP_SERVER_VERSION",
        "MCP_SERVER_DESCRIPTION",
        "MCP_SERVER_HOMEPAGE",
        "MCP_TOOLS_ENABLED",
        "MCP_RESOURCES_ENABLED",
        "MCP_PROMPTS_ENABLED",
        "AI_PROVIDER",
        "OLLAMA_BASE_URL",
        "OLLAMA_MODEL",
        "COLLABORATOR_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn parse_defaults() {
        clear_env();

        let config = Config::from_env().expect("config should parse");
        assert_eq!(config.api_token, None);
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.identity.name, "qa-automation-hub");
        assert_eq!(config.capabilities, CapabilityFlags::default());
        assert_eq!(config.ai_provider, AiProvider::Mock);
        assert_eq!(config.ollama_model, "llama2");
        assert_eq!(config.collaborator_timeout, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn reads_identity_flags_and_provider() {
        clear_env();
        env::set_var("MCP_API_TOKEN", " abc ");
        env::set_var("MCP_SERVER_NAME", "qa-lab");
        env::set_var("MCP_PROMPTS_ENABLED", "false");
        env::set_var("AI_PROVIDER", "Ollama");
        env::set_var("COLLABORATOR_TIMEOUT_SECS", "5");

        let config = Config::from_env().expect("config should parse");
        assert_eq!(config.api_token.as_deref(), Some("abc"));
        assert_eq!(config.identity.name, "qa-lab");
        assert!(config.capabilities.tools);
        assert!(!config.capabilities.prompts);
        assert_eq!(config.ai_provider, AiProvider::Ollama);
        assert_eq!(config.collaborator_timeout, Duration::from_secs(5));
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_values_fail() {
        clear_env();
        env::set_var("AI_PROVIDER", "gpt");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidAiProvider)
        ));

        clear_env();
        env::set_var("COLLABORATOR_TIMEOUT_SECS", "0");
        assert!(matches!(Config::from_env(), Err(ConfigError::InvalidTimeout)));

        clear_env();
        env::set_var("MCP_TOOLS_ENABLED", "maybe");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidFlag("MCP_TOOLS_ENABLED"))
        ));

        clear_env();
        env::set_var("BIND_PORT", "99999");
        assert!(matches!(Config::from_env(), Err(ConfigError::InvalidPort)));
        clear_env();
    }
}
