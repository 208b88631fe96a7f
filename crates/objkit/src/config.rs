//! Engine configuration (objkit.toml)
//!
//! Only the permission policy is configurable. Every section is optional;
//! a missing file section means "no restriction at that level".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::permissions::ReflectionPermission;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectConfig {
    /// Permission policy
    #[serde(default)]
    pub permissions: PermissionConfig,
}

/// `[permissions]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionConfig {
    /// Global default (`"ALL"` when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<String>,

    /// Package name or pattern to permissions
    #[serde(default)]
    pub packages: BTreeMap<String, String>,

    /// Fully-qualified type name to permissions
    #[serde(default)]
    pub types: BTreeMap<String, String>,
}

impl ReflectConfig {
    /// Parse configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ReflectConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every permission value parses
    pub fn validate(&self) -> Result<(), ConfigError> {
        let section = &self.permissions;
        let entries = section
            .global
            .iter()
            .map(|value| ("global", value))
            .chain(section.packages.iter().map(|(k, v)| (k.as_str(), v)))
            .chain(section.types.iter().map(|(k, v)| (k.as_str(), v)));

        for (key, value) in entries {
            if ReflectionPermission::from_combined_str(value).is_none() {
                return Err(ConfigError::InvalidPermission {
                    key: key.to_string(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[permissions]
global = "PUBLIC_ONLY"

[permissions.packages]
"com.example" = "ALL"
"plugins.*" = "PUBLIC_MEMBERS"

[permissions.types]
"com.example.Secret" = "PUBLIC_MEMBERS|INSTANTIATE"
"#;

        let config = ReflectConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.permissions.global.as_deref(), Some("PUBLIC_ONLY"));
        assert_eq!(config.permissions.packages.len(), 2);
        assert_eq!(
            config.permissions.types.get("com.example.Secret").map(String::as_str),
            Some("PUBLIC_MEMBERS|INSTANTIATE")
        );
    }

    #[test]
    fn test_empty_config() {
        let config = ReflectConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReflectConfig::default());
    }

    #[test]
    fn test_invalid_permission_value() {
        let toml = r#"
[permissions.types]
"app.Vault" = "READ_EVERYTHING"
"#;

        let err = ReflectConfig::from_toml_str(toml).unwrap_err();
        match err {
            ConfigError::InvalidPermission { key, value } => {
                assert_eq!(key, "app.Vault");
                assert_eq!(value, "READ_EVERYTHING");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_toml() {
        let err = ReflectConfig::from_toml_str("[permissions\nglobal = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
