//! Reflection Security & Permissions
//!
//! Controls which reflective operations are allowed per type. Permissions
//! resolve from the most specific level to the least:
//!
//! 1. exact type name
//! 2. package (exact package first, then wildcard rules in insertion order)
//! 3. global default
//!
//! Package rules use `.`-separated names: `"plugins.*"` matches every
//! package below `plugins`, `"plugins.**"` also matches `plugins` itself,
//! and `"**"` matches everything.
//!
//! ```toml
//! [permissions]
//! global = "ALL"
//!
//! [permissions.packages]
//! "com.example" = "ALL"
//! "plugins.*" = "PUBLIC_ONLY"
//! ```

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;

use crate::config::ReflectConfig;
use crate::error::{ConfigError, ReflectError, ReflectResult};

bitflags! {
    /// Reflection permission flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ReflectionPermission: u8 {
        /// Enumerate and look up public members (inherited included)
        const PUBLIC_MEMBERS = 0x01;
        /// Enumerate and look up declared members of any visibility
        const DECLARED_MEMBERS = 0x02;
        /// Temporarily elevate accessibility of exactly-public members
        const SUPPRESS_ACCESS_CHECKS = 0x04;
        /// Create instances through constructors
        const INSTANTIATE = 0x08;

        /// PUBLIC_MEMBERS | INSTANTIATE
        const PUBLIC_ONLY = 0x09;
        /// Everything
        const ALL = 0x0F;
    }
}

impl ReflectionPermission {
    /// No reflection allowed
    pub const NONE: Self = Self::empty();

    /// Parse a single flag name, hex (`0x0F`) or decimal value
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NONE" => Some(Self::NONE),
            "PUBLIC_MEMBERS" => Some(Self::PUBLIC_MEMBERS),
            "DECLARED_MEMBERS" => Some(Self::DECLARED_MEMBERS),
            "SUPPRESS_ACCESS_CHECKS" => Some(Self::SUPPRESS_ACCESS_CHECKS),
            "INSTANTIATE" => Some(Self::INSTANTIATE),
            "PUBLIC_ONLY" => Some(Self::PUBLIC_ONLY),
            "ALL" => Some(Self::ALL),
            _ => {
                let bits = if let Some(hex) = s.strip_prefix("0x") {
                    u8::from_str_radix(hex, 16).ok()
                } else {
                    s.parse::<u8>().ok()
                };
                bits.and_then(Self::from_bits)
            }
        }
    }

    /// Parse pipe-separated flags (e.g. `"PUBLIC_MEMBERS|INSTANTIATE"`)
    pub fn from_combined_str(s: &str) -> Option<Self> {
        s.split('|')
            .map(|part| Self::parse_name(part.trim()))
            .try_fold(Self::NONE, |acc, perm| perm.map(|perm| acc | perm))
    }
}

impl Default for ReflectionPermission {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::fmt::Display for ReflectionPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        if *self == Self::ALL {
            return f.write_str("ALL");
        }
        bitflags::parser::to_writer(self, f)
    }
}

/// Package permission pattern (supports wildcards)
#[derive(Debug, Clone)]
pub struct PackagePermissionRule {
    /// Pattern (e.g. `"plugins.*"`, `"**"`)
    pub pattern: String,
    /// Permissions for matching packages
    pub permissions: ReflectionPermission,
}

impl PackagePermissionRule {
    /// Check if a package name matches this pattern
    pub fn matches(&self, package: &str) -> bool {
        if self.pattern == "**" || self.pattern == "*" {
            return true;
        }

        if let Some(prefix) = self.pattern.strip_suffix(".**") {
            package == prefix || is_below(package, prefix)
        } else if let Some(prefix) = self.pattern.strip_suffix(".*") {
            is_below(package, prefix)
        } else {
            self.pattern == package
        }
    }
}

fn is_below(package: &str, prefix: &str) -> bool {
    package
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('.'))
}

/// Store for reflection permissions
#[derive(Debug, Default)]
pub struct PermissionStore {
    /// Global default permissions
    global_default: ReflectionPermission,

    /// Type-level permissions: type name -> permissions
    type_permissions: HashMap<String, ReflectionPermission>,

    /// Package-level permissions: package name -> permissions
    package_permissions: HashMap<String, ReflectionPermission>,

    /// Package permission rules (for wildcard patterns)
    package_rules: Vec<PackagePermissionRule>,

    /// Types whose permissions can no longer change
    sealed_types: HashSet<String>,
}

impl PermissionStore {
    /// Create a new permission store with default (ALL) permissions
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded configuration
    pub fn from_config(config: &ReflectConfig) -> Result<Self, ConfigError> {
        let mut store = Self::new();
        let section = &config.permissions;

        if let Some(global) = &section.global {
            store.global_default = parse_entry("global", global)?;
        }
        for (package, value) in &section.packages {
            let perms = parse_entry(package, value)?;
            if package.contains('*') {
                store.add_package_rule(PackagePermissionRule {
                    pattern: package.clone(),
                    permissions: perms,
                });
            } else {
                store.set_package(package, perms);
            }
        }
        for (type_name, value) in &section.types {
            let perms = parse_entry(type_name, value)?;
            store.type_permissions.insert(type_name.clone(), perms);
        }
        Ok(store)
    }

    /// Check if any permissions are configured (for fast-path optimization)
    pub fn has_any_restrictions(&self) -> bool {
        self.global_default != ReflectionPermission::ALL
            || !self.type_permissions.is_empty()
            || !self.package_permissions.is_empty()
            || !self.package_rules.is_empty()
    }

    // ===== Global Permissions =====

    /// Set global default permissions
    pub fn set_global(&mut self, permissions: ReflectionPermission) {
        self.global_default = permissions;
    }

    /// Get global default permissions
    pub fn global(&self) -> ReflectionPermission {
        self.global_default
    }

    // ===== Type Permissions =====

    /// Set type-level permissions
    pub fn set_type(&mut self, type_name: &str, permissions: ReflectionPermission) -> ReflectResult<()> {
        self.ensure_unsealed(type_name)?;
        self.type_permissions.insert(type_name.to_string(), permissions);
        Ok(())
    }

    /// Get type-level permissions (not resolved)
    pub fn get_type(&self, type_name: &str) -> Option<ReflectionPermission> {
        self.type_permissions.get(type_name).copied()
    }

    /// Clear type-level permissions
    pub fn clear_type(&mut self, type_name: &str) -> ReflectResult<()> {
        self.ensure_unsealed(type_name)?;
        self.type_permissions.remove(type_name);
        Ok(())
    }

    /// Seal type permissions
    pub fn seal_type(&mut self, type_name: &str) {
        self.sealed_types.insert(type_name.to_string());
    }

    /// Check if type permissions are sealed
    pub fn is_type_sealed(&self, type_name: &str) -> bool {
        self.sealed_types.contains(type_name)
    }

    fn ensure_unsealed(&self, type_name: &str) -> ReflectResult<()> {
        if self.is_type_sealed(type_name) {
            return Err(ReflectError::AccessDenied {
                type_name: type_name.to_string(),
                action: "modify sealed permissions".to_string(),
            });
        }
        Ok(())
    }

    // ===== Package Permissions =====

    /// Set package-level permissions
    pub fn set_package(&mut self, package: &str, permissions: ReflectionPermission) {
        self.package_permissions.insert(package.to_string(), permissions);
    }

    /// Get package permissions with pattern matching
    pub fn get_package_resolved(&self, package: &str) -> Option<ReflectionPermission> {
        if let Some(perms) = self.package_permissions.get(package) {
            return Some(*perms);
        }

        // first matching rule wins
        self.package_rules
            .iter()
            .find(|rule| rule.matches(package))
            .map(|rule| rule.permissions)
    }

    /// Add a package permission rule
    pub fn add_package_rule(&mut self, rule: PackagePermissionRule) {
        self.package_rules.push(rule);
    }

    // ===== Permission Resolution =====

    /// Resolve permissions for a type, checking all levels
    pub fn resolve(&self, type_name: &str) -> ReflectionPermission {
        if let Some(perms) = self.get_type(type_name) {
            return perms;
        }

        let package = type_name.rsplit_once('.').map_or("", |(package, _)| package);
        if let Some(perms) = self.get_package_resolved(package) {
            return perms;
        }

        self.global_default
    }

    /// Check if a specific permission is allowed
    pub fn check(&self, type_name: &str, required: ReflectionPermission) -> bool {
        self.resolve(type_name).contains(required)
    }

    /// Fail with `AccessDenied` unless the permission is allowed
    pub fn require(
        &self,
        type_name: &str,
        required: ReflectionPermission,
        action: &str,
    ) -> ReflectResult<()> {
        if self.check(type_name, required) {
            return Ok(());
        }
        tracing::debug!(type_name, %required, action, "reflection permission denied");
        Err(ReflectError::AccessDenied {
            type_name: type_name.to_string(),
            action: action.to_string(),
        })
    }
}

fn parse_entry(key: &str, value: &str) -> Result<ReflectionPermission, ConfigError> {
    ReflectionPermission::from_combined_str(value).ok_or_else(|| ConfigError::InvalidPermission {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_flags() {
        assert_eq!(ReflectionPermission::NONE.bits(), 0x00);
        assert_eq!(ReflectionPermission::ALL.bits(), 0x0F);
        assert!(ReflectionPermission::PUBLIC_ONLY.contains(ReflectionPermission::INSTANTIATE));
        assert!(!ReflectionPermission::PUBLIC_ONLY.contains(ReflectionPermission::DECLARED_MEMBERS));
    }

    #[test]
    fn test_permission_parse_name() {
        assert_eq!(ReflectionPermission::parse_name("ALL"), Some(ReflectionPermission::ALL));
        assert_eq!(ReflectionPermission::parse_name("all"), Some(ReflectionPermission::ALL));
        assert_eq!(ReflectionPermission::parse_name("0x0F"), Some(ReflectionPermission::ALL));
        assert_eq!(ReflectionPermission::parse_name("1"), Some(ReflectionPermission::PUBLIC_MEMBERS));
        assert_eq!(ReflectionPermission::parse_name("0xFF"), None);
        assert_eq!(ReflectionPermission::parse_name("READ"), None);
    }

    #[test]
    fn test_permission_combined_str() {
        let perms = ReflectionPermission::from_combined_str("PUBLIC_MEMBERS | INSTANTIATE").unwrap();
        assert_eq!(perms, ReflectionPermission::PUBLIC_ONLY);
        assert!(ReflectionPermission::from_combined_str("PUBLIC_MEMBERS|BOGUS").is_none());
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(ReflectionPermission::ALL.to_string(), "ALL");
        assert_eq!(ReflectionPermission::NONE.to_string(), "NONE");
        assert_eq!(ReflectionPermission::INSTANTIATE.to_string(), "INSTANTIATE");
    }

    #[test]
    fn test_package_rule_matching() {
        let rule = PackagePermissionRule {
            pattern: "plugins.*".to_string(),
            permissions: ReflectionPermission::NONE,
        };
        assert!(rule.matches("plugins.audio"));
        assert!(rule.matches("plugins.audio.codecs"));
        assert!(!rule.matches("plugins"));
        assert!(!rule.matches("pluginsx.audio"));

        let deep = PackagePermissionRule {
            pattern: "plugins.**".to_string(),
            permissions: ReflectionPermission::NONE,
        };
        assert!(deep.matches("plugins"));
        assert!(deep.matches("plugins.audio"));

        let any = PackagePermissionRule {
            pattern: "**".to_string(),
            permissions: ReflectionPermission::NONE,
        };
        assert!(any.matches(""));
    }

    #[test]
    fn test_resolution_order() {
        let mut store = PermissionStore::new();
        store.set_global(ReflectionPermission::PUBLIC_ONLY);
        store.add_package_rule(PackagePermissionRule {
            pattern: "app.*".to_string(),
            permissions: ReflectionPermission::PUBLIC_MEMBERS,
        });
        store.set_package("app.core", ReflectionPermission::ALL);
        store.set_type("app.core.Vault", ReflectionPermission::NONE).unwrap();

        assert_eq!(store.resolve("app.core.Vault"), ReflectionPermission::NONE);
        assert_eq!(store.resolve("app.core.Widget"), ReflectionPermission::ALL);
        assert_eq!(store.resolve("app.ui.Button"), ReflectionPermission::PUBLIC_MEMBERS);
        assert_eq!(store.resolve("other.Thing"), ReflectionPermission::PUBLIC_ONLY);
        assert_eq!(store.resolve("Thing"), ReflectionPermission::PUBLIC_ONLY);
        assert!(store.has_any_restrictions());
    }

    #[test]
    fn test_require_denies() {
        let mut store = PermissionStore::new();
        store.set_type("app.Vault", ReflectionPermission::PUBLIC_MEMBERS).unwrap();

        assert!(store.require("app.Vault", ReflectionPermission::PUBLIC_MEMBERS, "enumerate").is_ok());
        let err = store
            .require("app.Vault", ReflectionPermission::INSTANTIATE, "instantiate")
            .unwrap_err();
        assert!(matches!(err, ReflectError::AccessDenied { ref action, .. } if action == "instantiate"));
    }

    #[test]
    fn test_sealed_type_permissions() {
        let mut store = PermissionStore::new();
        store.set_type("app.Vault", ReflectionPermission::NONE).unwrap();
        store.seal_type("app.Vault");

        assert!(store.set_type("app.Vault", ReflectionPermission::ALL).is_err());
        assert!(store.clear_type("app.Vault").is_err());
        assert_eq!(store.get_type("app.Vault"), Some(ReflectionPermission::NONE));
    }
}
