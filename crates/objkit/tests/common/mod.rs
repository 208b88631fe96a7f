//! Shared fixture types for the integration tests
//!
//! A small zoo: an interface, an abstract base class with a subclass, an
//! enum, two constructor-overloaded classes, a class with no string
//! constructor and a non-public class whose public members are only
//! reachable through elevation.

#![allow(dead_code)]

use objkit::{
    BoxError, ConstructorDefinition, FieldDefinition, MethodDefinition, Modifiers, Reflector,
    TypeDefinition, Value,
};

/// Raised by `zoo.Kennel.open()`
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("kennel {0} is closed")]
pub struct KennelClosed(pub String);

fn field_of(receiver: Option<&Value>, field: &str) -> Value {
    receiver
        .and_then(Value::as_object)
        .and_then(|obj| obj.read().get(field).cloned())
        .unwrap_or_default()
}

fn store(args: &[Value], obj: &objkit::ObjectRef, fields: &[&str]) -> Result<(), BoxError> {
    let mut obj = obj.write();
    for (field, value) in fields.iter().zip(args) {
        obj.set(field, value.clone());
    }
    Ok(())
}

pub fn named() -> TypeDefinition {
    TypeDefinition::interface("zoo.Named")
        .method(MethodDefinition::abstract_method("name", &[]).returns("String"))
}

pub fn animal() -> TypeDefinition {
    TypeDefinition::class("zoo.Animal")
        .modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
        .field(FieldDefinition::new("legs", "int"))
        .constructor(ConstructorDefinition::init(&["int"], |obj, args| {
            store(args, obj, &["legs"])
        }))
        .method(
            MethodDefinition::new("speak", &[], |_, _| Ok(Value::string("...")))
                .returns("String"),
        )
        .method(
            MethodDefinition::new("legs", &[], |receiver, _| Ok(field_of(receiver, "legs")))
                .returns("int"),
        )
}

pub fn dog() -> TypeDefinition {
    TypeDefinition::class("zoo.Dog")
        .extends("zoo.Animal")
        .implements("zoo.Named")
        .field(FieldDefinition::new("name", "String"))
        .field(FieldDefinition::new("color", "zoo.Color"))
        .constructor(ConstructorDefinition::init(&["String"], |obj, args| {
            store(args, obj, &["name"])?;
            obj.write().set("legs", Value::Int(4));
            Ok(())
        }))
        .constructor(ConstructorDefinition::init(&["String", "int"], |obj, args| {
            store(args, obj, &["name", "legs"])
        }))
        .method(
            MethodDefinition::new("speak", &[], |_, _| Ok(Value::string("woof"))).returns("String"),
        )
        .method(
            MethodDefinition::new("name", &[], |receiver, _| Ok(field_of(receiver, "name")))
                .returns("String"),
        )
        .method(
            MethodDefinition::new("rename", &["String"], |receiver, args| {
                if let Some(obj) = receiver.and_then(Value::as_object) {
                    obj.write().set("name", args[0].clone());
                }
                Ok(Value::Null)
            }),
        )
        .method(
            MethodDefinition::new("paint", &["zoo.Color"], |receiver, args| {
                if let Some(obj) = receiver.and_then(Value::as_object) {
                    obj.write().set("color", args[0].clone());
                }
                Ok(Value::Null)
            }),
        )
}

pub fn color() -> TypeDefinition {
    TypeDefinition::enumeration("zoo.Color", &["RED", "GREEN", "BLUE"])
}

/// Two constructors over the same parameter types in opposite order;
/// `shape` records which one ran
pub fn pair() -> TypeDefinition {
    TypeDefinition::class("zoo.Pair")
        .field(FieldDefinition::new("number", "int"))
        .field(FieldDefinition::new("label", "String"))
        .field(FieldDefinition::new("shape", "String"))
        .constructor(ConstructorDefinition::init(&["int", "String"], |obj, args| {
            store(args, obj, &["number", "label"])?;
            obj.write().set("shape", Value::string("int-first"));
            Ok(())
        }))
        .constructor(ConstructorDefinition::init(&["String", "int"], |obj, args| {
            store(args, obj, &["label", "number"])?;
            obj.write().set("shape", Value::string("string-first"));
            Ok(())
        }))
}

pub fn sink() -> TypeDefinition {
    TypeDefinition::interface("zoo.Sink")
        .method(MethodDefinition::abstract_method("write", &["String"]).returns("int"))
}

pub fn logger() -> TypeDefinition {
    TypeDefinition::class("zoo.Logger")
        .field(FieldDefinition::new("sink", "zoo.Sink"))
        .field(FieldDefinition::new("prefix", "String"))
        .field(FieldDefinition::new("level", "int"))
        .constructor(ConstructorDefinition::init(
            &["zoo.Sink", "String", "int"],
            |obj, args| store(args, obj, &["sink", "prefix", "level"]),
        ))
}

pub fn opaque() -> TypeDefinition {
    TypeDefinition::class("zoo.Opaque").constructor(ConstructorDefinition::init(&[], |_, _| Ok(())))
}

/// Constructor and method arguments typed `(int, zoo.Opaque, int)`
pub fn feeder() -> TypeDefinition {
    TypeDefinition::class("zoo.Feeder")
        .constructor(ConstructorDefinition::init(&[], |_, _| Ok(())))
        .method(
            MethodDefinition::new("feed", &["int", "zoo.Opaque", "int"], |_, args| {
                let sum = args[0].as_i32().unwrap_or_default() + args[2].as_i32().unwrap_or_default();
                Ok(Value::Int(sum))
            })
            .returns("int"),
        )
}

pub fn kennel() -> TypeDefinition {
    TypeDefinition::class("zoo.Kennel")
        .field(FieldDefinition::new("id", "String"))
        .field(
            FieldDefinition::new("CAPACITY", "int")
                .modifiers(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL)
                .initial_value(Value::Int(12)),
        )
        .field(FieldDefinition::new("opened", "int").as_static().initial_value(Value::Int(0)))
        .constructor(ConstructorDefinition::init(&["String"], |obj, args| {
            store(args, obj, &["id"])
        }))
        .method(
            MethodDefinition::new("tag", &["String", "int"], |receiver, args| {
                if receiver.is_some() {
                    return Err("static method called with a receiver".into());
                }
                let id = args[0].as_str().unwrap_or_default();
                Ok(Value::string(format!("{}#{}", id, args[1].as_i32().unwrap_or_default())))
            })
            .as_static()
            .returns("String"),
        )
        .method(MethodDefinition::new("open", &[], |receiver, _| {
            let id = field_of(receiver, "id");
            Err(Box::new(KennelClosed(id.as_str().unwrap_or_default().to_string())) as BoxError)
        }))
}

/// Non-public class with exactly-public members
pub fn hidden() -> TypeDefinition {
    TypeDefinition::class("zoo.Hidden")
        .modifiers(Modifiers::empty())
        .field(FieldDefinition::new("secret", "int").initial_value(Value::Int(42)))
        .field(FieldDefinition::new("pin", "int").modifiers(Modifiers::PRIVATE))
        .constructor(ConstructorDefinition::init(&[], |_, _| Ok(())))
        .method(
            MethodDefinition::new("reveal", &[], |receiver, _| Ok(field_of(receiver, "secret")))
                .returns("int"),
        )
        .method(MethodDefinition::new("explode", &[], |_, _| {
            Err(Box::new(KennelClosed("hidden".to_string())) as BoxError)
        }))
}

/// Register every fixture type
pub fn register_all(reflector: &mut Reflector) {
    for def in [
        named(),
        color(),
        animal(),
        dog(),
        pair(),
        sink(),
        logger(),
        opaque(),
        feeder(),
        kennel(),
        hidden(),
    ] {
        reflector.register(def).expect("fixture registers");
    }
}

/// Reflector with every fixture registered
pub fn zoo() -> Reflector {
    let mut reflector = Reflector::new();
    register_all(&mut reflector);
    reflector
}

/// Instantiate `type_name` with the default strategy
pub fn new_instance(reflector: &Reflector, type_name: &str, args: &[Value]) -> Value {
    reflector
        .instantiate_by_name(type_name, args, objkit::Strategy::Auto)
        .expect("fixture instantiates")
}
