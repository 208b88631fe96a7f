//! Integration tests for the permission policy loaded from TOML

mod common;

use std::io::Write;

use common::register_all;
use objkit::{
    ConfigError, LookupScope, ReflectError, ReflectionPermission, Reflector, Strategy, Value,
};
use tempfile::NamedTempFile;

fn reflector_from(toml: &str) -> Reflector {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    let mut reflector = Reflector::from_config_file(file.path()).unwrap();
    register_all(&mut reflector);
    reflector
}

#[test]
fn test_type_rule_overrides_package_rule() {
    let reflector = reflector_from(
        r#"
[permissions]
global = "ALL"

[permissions.packages]
"zoo" = "PUBLIC_MEMBERS"

[permissions.types]
"zoo.Pair" = "ALL"
"#,
    );

    assert_eq!(
        reflector.permissions().resolve("zoo.Dog"),
        ReflectionPermission::PUBLIC_MEMBERS
    );
    assert_eq!(reflector.permissions().resolve("zoo.Pair"), ReflectionPermission::ALL);
    assert_eq!(reflector.permissions().resolve("Integer"), ReflectionPermission::ALL);

    let err = reflector
        .instantiate_by_name("zoo.Dog", &[Value::string("rex")], Strategy::Auto)
        .unwrap_err();
    match err {
        ReflectError::AccessDenied { type_name, .. } => assert_eq!(type_name, "zoo.Dog"),
        other => panic!("unexpected error: {other}"),
    }

    reflector
        .instantiate_by_name("zoo.Pair", &[Value::string("x"), Value::Int(1)], Strategy::Auto)
        .unwrap();
}

#[test]
fn test_enumeration_denied() {
    let reflector = reflector_from(
        r#"
[permissions.types]
"zoo.Hidden" = "PUBLIC_ONLY"
"#,
    );
    let hidden = reflector.resolve_type("zoo.Hidden").unwrap();

    let err = reflector
        .find_all_fields(&hidden, LookupScope::Declared)
        .unwrap_err();
    assert!(matches!(err, ReflectError::AccessDenied { .. }));
    assert!(reflector.find_declared_field(&hidden, "pin").is_err());

    // public enumeration is still allowed, but nothing can be elevated
    let secret = reflector.find_field(&hidden, "secret").unwrap();
    let seen = reflector.with_elevated_access(&secret, None, |member, _| {
        objkit::Member::is_accessible(member)
    });
    assert!(!seen);
}

#[test]
fn test_package_pattern() {
    let reflector = reflector_from(
        r#"
[permissions]
global = "NONE"

[permissions.packages]
"zoo.*" = "ALL"
"zoo" = "PUBLIC_MEMBERS | INSTANTIATE"
"#,
    );

    assert_eq!(
        reflector.permissions().resolve("zoo.Dog"),
        ReflectionPermission::PUBLIC_MEMBERS | ReflectionPermission::INSTANTIATE
    );
    assert_eq!(reflector.permissions().resolve("zoo.pens.Pen"), ReflectionPermission::ALL);
    assert_eq!(reflector.permissions().resolve("String"), ReflectionPermission::NONE);
}

#[test]
fn test_invalid_permission_value() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[permissions]\nglobal = \"EVERYTHING\"\n").unwrap();

    let err = Reflector::from_config_file(file.path()).unwrap_err();
    match err {
        ReflectError::Config(ConfigError::InvalidPermission { key, value }) => {
            assert_eq!(key, "global");
            assert_eq!(value, "EVERYTHING");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Reflector::from_config_file(dir.path().join("objkit.toml")).unwrap_err();
    assert!(matches!(err, ReflectError::Config(ConfigError::Io(_))));
}

#[test]
fn test_malformed_toml() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[permissions\nglobal = ").unwrap();

    let err = Reflector::from_config_file(file.path()).unwrap_err();
    assert!(matches!(err, ReflectError::Config(ConfigError::Parse(_))));
}
