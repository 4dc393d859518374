use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

/// Agent-wide configuration: lease TTL (spec §6) plus the store endpoint
/// and identity overrides a real deployment needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Lease TTL in seconds; keep-alive fires every `ttl_secs`, the
    /// presence lease itself is granted for `ttl_secs + 2`.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,

    /// Coordination store endpoints (etcd cluster member URLs).
    #[serde(default = "default_store_endpoints")]
    pub store_endpoints: Vec<String>,

    /// Key namespace prefix, so multiple fleets can share one store.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Explicit node id override; when absent the agent discovers its
    /// local IP address at startup.
    #[serde(default)]
    pub node_id: Option<String>,
}

fn default_ttl_secs() -> i64 {
    10
}

fn default_store_endpoints() -> Vec<String> {
    vec!["http://127.0.0.1:2379".to_string()]
}

fn default_namespace() -> String {
    "/cronagent".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            store_endpoints: default_store_endpoints(),
            namespace: default_namespace(),
            node_id: None,
        }
    }
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AgentConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_ttl() {
        let config = AgentConfig::default();
        assert_eq!(config.ttl_secs, 10);
        assert!(!config.store_endpoints.is_empty());
    }

    #[test]
    fn load_or_default_falls_back_when_missing() {
        let paths = Paths::with_base(std::env::temp_dir().join("cronagent-test-missing-config"));
        let config = AgentConfig::load_or_default(&paths).unwrap();
        assert_eq!(config.namespace, "/cronagent");
    }
}
