//! Engine configuration, read from an optional TOML file.
//!
//! ```toml
//! ontology_namespace = "http://www.smarthealth-tracker.com/ontologie#"
//! node_namespace = "http://example.org/"
//! history_capacity = 500
//! knowledge_path = "my-knowledge.toml"
//! ```
//!
//! Every key is optional; missing keys take the [`Default`] values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compile::{DEFAULT_NODE_NAMESPACE, DEFAULT_ONTOLOGY_NAMESPACE, Namespaces};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Namespace behind the `ont:` prefix.
    pub ontology_namespace: String,
    /// Namespace behind the `ex:` prefix (habit and user nodes).
    pub node_namespace: String,
    /// Ring-buffer size for the command history. `None` keeps everything.
    pub history_capacity: Option<usize>,
    /// Knowledge document to load instead of the bundled one.
    pub knowledge_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ontology_namespace: DEFAULT_ONTOLOGY_NAMESPACE.to_string(),
            node_namespace: DEFAULT_NODE_NAMESPACE.to_string(),
            history_capacity: None,
            knowledge_path: None,
        }
    }
}

impl EngineConfig {
    /// Read and validate a config file.
    ///
    /// A relative `knowledge_path` is resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(dir) = path.parent() {
            config.knowledge_path = config
                .knowledge_path
                .map(|kb| if kb.is_relative() { dir.join(kb) } else { kb });
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, ns) in [
            ("ontology_namespace", &self.ontology_namespace),
            ("node_namespace", &self.node_namespace),
        ] {
            let absolute = ns.contains(':');
            let terminated = ns.ends_with('#') || ns.ends_with('/');
            let clean = !ns.chars().any(|c| c.is_whitespace() || "<>\"{}|^`\\".contains(c));
            if !(absolute && terminated && clean) {
                return Err(ConfigError::Invalid {
                    message: format!("{field} \"{ns}\" is not a usable namespace IRI"),
                });
            }
        }
        if self.history_capacity == Some(0) {
            return Err(ConfigError::Invalid {
                message: "history_capacity must be at least 1 when set".into(),
            });
        }
        Ok(())
    }

    pub fn namespaces(&self) -> Namespaces {
        Namespaces::new(&self.ontology_namespace, &self.node_namespace)
    }
}
