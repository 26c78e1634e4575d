//! Orchestrator configuration: TOML file first, then environment overrides.

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::services::{backends::AgentDescriptor, routing::RoutingRules};

pub const CONFIG_PATH_ENV: &str = "ORCHESTRATOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "orchestrator.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    pub base_url: String,
    pub agents: Vec<AgentDescriptor>,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4000".to_string(),
            agents: vec![
                AgentDescriptor::new(
                    "business-intelligence",
                    "Market, competitor and audience research",
                    &["research", "analysis", "market-intelligence"],
                ),
                AgentDescriptor::new(
                    "competitor-analysis",
                    "Competitive positioning teardown",
                    &["analysis", "competitors"],
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub job_queue_url: String,
    /// Remote memory service. When unset the graph memory lives in-process.
    pub memory_url: Option<String>,
    pub poll_interval_ms: u64,
    pub memory_ttl_secs: u64,
    pub memory_capacity: u64,
    pub agents: Vec<AgentDescriptor>,
}

impl GraphConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn memory_ttl(&self) -> Duration {
        Duration::from_secs(self.memory_ttl_secs)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            job_queue_url: "http://127.0.0.1:4100".to_string(),
            memory_url: None,
            poll_interval_ms: 500,
            memory_ttl_secs: 3600,
            memory_capacity: 10_000,
            agents: vec![
                AgentDescriptor::new(
                    "orchestrator",
                    "Plans multi-step work and delegates to graph agents",
                    &["orchestration", "planning"],
                ),
                AgentDescriptor::new(
                    "marketing-execution",
                    "Runs campaigns from brief to launch",
                    &["campaigns", "advertising", "launch"],
                ),
                AgentDescriptor::new(
                    "content-creator",
                    "Produces copy and creative assets",
                    &["content", "copywriting"],
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Records expire this long after their last update. Unset keeps them
    /// for the life of the process.
    pub ttl_secs: Option<u64>,
    pub max_entries: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: None,
            max_entries: 100_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub legacy: LegacyConfig,
    pub graph: GraphConfig,
    pub routing: RoutingRules,
    pub executions: ExecutionConfig,
}

impl OrchestratorConfig {
    /// Parse a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `ORCHESTRATOR_CONFIG` (or `orchestrator.toml`) and apply the
    /// process environment on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some((key, value)) = lookup("BACKEND_PORT")
            .map(|v| ("BACKEND_PORT", v))
            .or_else(|| lookup("PORT").map(|v| ("PORT", v)))
        {
            self.server.port = parse_env(key, &value)?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = lookup("LEGACY_AGENTS_URL") {
            self.legacy.base_url = url;
        }
        if let Some(url) = lookup("JOB_QUEUE_URL") {
            self.graph.job_queue_url = url;
        }
        if let Some(url) = lookup("MEMORY_SERVICE_URL") {
            self.graph.memory_url = Some(url);
        }
        if let Some(value) = lookup("EXECUTION_TTL_SECS") {
            self.executions.ttl_secs = Some(parse_env("EXECUTION_TTL_SECS", &value)?);
        }

        if self.auth.jwt_secret == AuthConfig::default().jwt_secret {
            warn!("JWT_SECRET is not set; using the built-in development secret");
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = OrchestratorConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert_eq!(config.routing.orchestrator_agent, "orchestrator");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[graph]
poll_interval_ms = 50

[[graph.agents]]
name = "orchestrator"
description = "planner"
"#
        )
        .unwrap();

        let config = OrchestratorConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.graph.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.graph.agents.len(), 1);
        assert!(config.graph.agents[0].capabilities.is_empty());
        assert_eq!(config.legacy, LegacyConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        assert!(matches!(
            OrchestratorConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = OrchestratorConfig::default();
        config
            .apply_overrides(lookup(&[
                ("HOST", "0.0.0.0"),
                ("PORT", "8080"),
                ("JWT_SECRET", "s3cret"),
                ("MEMORY_SERVICE_URL", "http://memory:7000"),
                ("EXECUTION_TTL_SECS", "600"),
            ]))
            .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.graph.memory_url.as_deref(), Some("http://memory:7000"));
        assert_eq!(config.executions.ttl_secs, Some(600));
    }

    #[test]
    fn test_backend_port_wins_over_port() {
        let mut config = OrchestratorConfig::default();
        config
            .apply_overrides(lookup(&[("BACKEND_PORT", "4001"), ("PORT", "8080")]))
            .unwrap();
        assert_eq!(config.server.port, 4001);
    }

    #[test]
    fn test_bad_port_is_an_error() {
        let mut config = OrchestratorConfig::default();
        let err = config
            .apply_overrides(lookup(&[("PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref key, .. } if key == "PORT"));
    }
}
