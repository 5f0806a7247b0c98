//! Connection configuration handling for model-sync

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Load connection configuration from a JSON file
pub fn load_from_file(path: &Path) -> Result<ConnectionConfig> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

    let config: ConnectionConfig = serde_json::from_str(&config_str)
        .map_err(|e| Error::Config(format!("Failed to parse config file {}: {}", path.display(), e)))?;

    if config.module_schema_mapping.is_empty() {
        return Err(Error::Config(
            "moduleSchemaMapping must contain at least one module".to_string(),
        ));
    }

    Ok(config)
}

/// Database connection configuration. Keys are validated exactly; unknown
/// keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    /// Default database. Individual modules connect to the schema mapped
    /// for them in `module_schema_mapping`.
    pub database: String,
    pub port: u16,
    /// TLS bundle, or null for plain connections.
    pub ssl: Option<SslConfig>,
    /// Ordered module-to-schema assignments. Every `entity.module` in the
    /// data model must resolve here.
    pub module_schema_mapping: Vec<ModuleSchema>,
}

/// Paths to the TLS material used when connecting with certificate
/// verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SslConfig {
    pub ca: String,
    pub key: String,
    pub cert: String,
}

/// One module-to-schema assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ModuleSchema {
    pub module_name: String,
    pub schema_name: String,
}

impl ConnectionConfig {
    /// Schema name assigned to a module, if the module is configured
    pub fn schema_for_module(&self, module: &str) -> Option<&str> {
        self.module_schema_mapping
            .iter()
            .find(|m| m.module_name == module)
            .map(|m| m.schema_name.as_str())
    }

    /// All configured module names, in mapping order
    pub fn module_names(&self) -> Vec<&str> {
        self.module_schema_mapping
            .iter()
            .map(|m| m.module_name.as_str())
            .collect()
    }
}
