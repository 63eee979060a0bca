//! Application configuration file

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::error::ConfigError;
use crate::source::RpcConfig;
use crate::view::ViewSchema;

/// Everything a front end needs to open table views.
///
/// Every section is optional: without `rpc` the caller works offline from a
/// fixture, and the `students` view falls back to its built-in schema.
///
/// # Example
///
/// ```
/// use schooldesk_lib::config::AppConfig;
///
/// let config = AppConfig::from_json(r#"{
///     "cache": { "records_ttl": 60 },
///     "views": { "teachers": { "table": "teachers", "date_field": "hired_on" } }
/// }"#).unwrap();
///
/// assert_eq!(config.view("teachers").unwrap().date_field, "hired_on");
/// assert_eq!(config.view("students").unwrap().table, "students");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rpc: Option<RpcConfig>,
    pub cache: CacheConfig,
    /// View schemas by table name.
    pub views: HashMap<String, ViewSchema>,
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The schema for a table.
    pub fn view(&self, table: &str) -> Result<ViewSchema, ConfigError> {
        match self.views.get(table) {
            Some(schema) => Ok(schema.clone()),
            None if table == "students" => Ok(ViewSchema::students()),
            None => Err(ConfigError::UnknownView(table.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_empty_config() {
        let config = AppConfig::from_json("{}").unwrap();
        assert!(config.rpc.is_none());
        assert_eq!(config.cache.records_ttl, Duration::from_secs(300));
        assert!(matches!(
            config.view("payments"),
            Err(ConfigError::UnknownView(t)) if t == "payments"
        ));
    }

    #[test]
    fn test_rpc_section() {
        let config = AppConfig::from_json(
            r#"{"rpc": {"base_url": "https://school.example.co", "api_key": "anon", "page_size": 200}}"#,
        )
        .unwrap();
        let rpc = config.rpc.unwrap();
        assert_eq!(rpc.page_size, 200);
        assert_eq!(rpc.id_field, "id");
        assert!(rpc.references.contains_key("programs"));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AppConfig::load("/nonexistent/schooldesk.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
