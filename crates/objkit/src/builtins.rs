//! Builtin types
//!
//! Every registry starts with the eight primitives, `Object`, `String` and
//! the eight boxed wrappers, registered in that order so their ids are
//! fixed. Each boxed wrapper and `String` has a public single-`String`
//! constructor, which is what string coercion relies on.

use crate::coerce::boxed_equivalent;
use crate::definition::{ConstructorDefinition, MethodDefinition, TypeDefinition};
use crate::descriptor::{Modifiers, PrimitiveKind, TypeId};
use crate::error::BoxError;
use crate::value::Value;

/// Root of the class hierarchy
pub const OBJECT: &str = "Object";

/// Builtin string type
pub const STRING: &str = "String";

pub(crate) const OBJECT_TYPE: TypeId = TypeId(8);
pub(crate) const STRING_TYPE: TypeId = TypeId(9);
const BOXED_BASE: usize = 10;

pub(crate) fn primitive_type(kind: PrimitiveKind) -> TypeId {
    TypeId(kind as usize)
}

pub(crate) fn boxed_type(kind: PrimitiveKind) -> TypeId {
    TypeId(BOXED_BASE + kind as usize)
}

/// Fixed id of a builtin type name. Builtins may refer to each other
/// before all of them are registered, so their names resolve through here.
pub(crate) fn builtin_id(name: &str) -> Option<TypeId> {
    match name {
        OBJECT => Some(OBJECT_TYPE),
        STRING => Some(STRING_TYPE),
        _ => PrimitiveKind::ALL.into_iter().find_map(|kind| {
            if kind.name() == name {
                Some(primitive_type(kind))
            } else if boxed_equivalent(kind) == name {
                Some(boxed_type(kind))
            } else {
                None
            }
        }),
    }
}

/// Raised by the `Character(String)` constructor
#[derive(Debug, thiserror::Error)]
#[error("expected exactly one character, got {0:?}")]
pub struct InvalidCharacter(pub String);

/// Builtin definitions in id order
pub(crate) fn definitions() -> Vec<TypeDefinition> {
    let mut defs: Vec<TypeDefinition> = PrimitiveKind::ALL
        .into_iter()
        .map(TypeDefinition::primitive)
        .collect();

    defs.push(object_definition());
    defs.push(string_definition());
    defs.extend(PrimitiveKind::ALL.into_iter().map(boxed_definition));
    defs
}

fn object_definition() -> TypeDefinition {
    TypeDefinition::class(OBJECT)
        .constructor(ConstructorDefinition::init(&[], |_, _| Ok(())))
        .method(
            MethodDefinition::new("toString", &[], |receiver, _| {
                Ok(Value::Str(receiver.map(display).unwrap_or_default()))
            })
            .returns(STRING),
        )
        .method(
            MethodDefinition::new("equals", &[OBJECT], |receiver, args| {
                Ok(Value::Bool(receiver.is_some_and(|r| Some(r) == args.first())))
            })
            .returns("boolean"),
        )
}

fn string_definition() -> TypeDefinition {
    TypeDefinition::class(STRING)
        .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .constructor(ConstructorDefinition::factory(&[], |_| Ok(Value::string(""))))
        .constructor(ConstructorDefinition::factory(&[STRING], |args| {
            match args {
                [Value::Str(s)] => Ok(Value::string(s.as_str())),
                _ => Err("String(String) expects one string".into()),
            }
        }))
        .method(
            MethodDefinition::new("length", &[], |receiver, _| match receiver {
                Some(Value::Str(s)) => Ok(Value::Int(s.chars().count() as i32)),
                _ => Err("length() needs a string receiver".into()),
            })
            .returns("int"),
        )
}

fn boxed_definition(kind: PrimitiveKind) -> TypeDefinition {
    TypeDefinition::class(boxed_equivalent(kind))
        .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .constructor(ConstructorDefinition::factory(&[kind.name()], |args| {
            Ok(args.first().cloned().unwrap_or_default())
        }))
        .constructor(ConstructorDefinition::factory(&[STRING], move |args| match args {
            [Value::Str(s)] => parse_primitive(kind, s),
            _ => Err(format!("{}(String) expects one string", boxed_equivalent(kind)).into()),
        }))
}

/// Parse a string the way the boxed wrapper's string constructor does
pub(crate) fn parse_primitive(kind: PrimitiveKind, s: &str) -> Result<Value, BoxError> {
    let value = match kind {
        PrimitiveKind::Boolean => Value::Bool(s.eq_ignore_ascii_case("true")),
        PrimitiveKind::Byte => Value::Byte(s.parse()?),
        PrimitiveKind::Char => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(Box::new(InvalidCharacter(s.to_string()))),
            }
        }
        PrimitiveKind::Short => Value::Short(s.parse()?),
        PrimitiveKind::Int => Value::Int(s.parse()?),
        PrimitiveKind::Long => Value::Long(s.parse()?),
        PrimitiveKind::Float => Value::Float(s.parse()?),
        PrimitiveKind::Double => Value::Double(s.parse()?),
    };
    Ok(value)
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Byte(b) => b.to_string(),
        Value::Char(c) => c.to_string(),
        Value::Short(s) => s.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Long(l) => l.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Double(x) => x.to_string(),
        Value::Str(s) => s.clone(),
        Value::Enum(e) => e.name().to_string(),
        Value::Object(obj) => obj.read().type_descriptor().name().to_string(),
        Value::Proxy(_) => "proxy".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitive() {
        assert_eq!(parse_primitive(PrimitiveKind::Int, "42").unwrap(), Value::Int(42));
        assert_eq!(parse_primitive(PrimitiveKind::Long, "-7").unwrap(), Value::Long(-7));
        assert_eq!(parse_primitive(PrimitiveKind::Boolean, "TRUE").unwrap(), Value::Bool(true));
        assert_eq!(parse_primitive(PrimitiveKind::Boolean, "nope").unwrap(), Value::Bool(false));
        assert_eq!(parse_primitive(PrimitiveKind::Char, "x").unwrap(), Value::Char('x'));
        assert_eq!(parse_primitive(PrimitiveKind::Double, "2.5").unwrap(), Value::Double(2.5));

        assert!(parse_primitive(PrimitiveKind::Int, "4x2").is_err());
        assert!(parse_primitive(PrimitiveKind::Byte, "300").is_err());
        assert!(parse_primitive(PrimitiveKind::Char, "xy").is_err());
    }

    #[test]
    fn test_definition_order_matches_fixed_ids() {
        let defs = definitions();
        assert_eq!(defs.len(), 18);
        assert_eq!(defs[OBJECT_TYPE.index()].name, OBJECT);
        assert_eq!(defs[STRING_TYPE.index()].name, STRING);
        for kind in PrimitiveKind::ALL {
            assert_eq!(defs[primitive_type(kind).index()].name, kind.name());
            assert_eq!(defs[boxed_type(kind).index()].name, boxed_equivalent(kind));
        }
    }

    #[test]
    fn test_builtin_ids() {
        assert_eq!(builtin_id(OBJECT), Some(OBJECT_TYPE));
        assert_eq!(builtin_id(STRING), Some(STRING_TYPE));
        assert_eq!(builtin_id("int"), Some(primitive_type(PrimitiveKind::Int)));
        assert_eq!(builtin_id("Integer"), Some(boxed_type(PrimitiveKind::Int)));
        assert_eq!(builtin_id("zoo.Dog"), None);
    }
}
