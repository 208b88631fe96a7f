//! Type Definitions
//!
//! Builders used to describe a type before it is registered. Parameter,
//! field and supertype references are given by name and resolved by
//! [`TypeRegistry::register`]; a definition may refer to its own name.
//!
//! ```rust,ignore
//! let point = TypeDefinition::class("geo.Point")
//!     .field(FieldDefinition::new("x", "int"))
//!     .field(FieldDefinition::new("y", "int"))
//!     .constructor(ConstructorDefinition::init(&["int", "int"], |obj, args| {
//!         let mut obj = obj.write();
//!         obj.set("x", args[0].clone());
//!         obj.set("y", args[1].clone());
//!         Ok(())
//!     }));
//! registry.register(point)?;
//! ```
//!
//! [`TypeRegistry::register`]: crate::registry::TypeRegistry::register

use std::sync::Arc;

use crate::descriptor::{ConstructorBody, MethodFn, Modifiers, PrimitiveKind, TypeKind};
use crate::error::BoxError;
use crate::value::{ObjectRef, Value};

/// Definition for a field
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,
    /// Declared type name
    pub type_name: String,
    /// Modifier flags
    pub modifiers: Modifiers,
    /// Initial value (instance default or static value)
    pub initial_value: Option<Value>,
}

impl FieldDefinition {
    /// Create a public instance field
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            modifiers: Modifiers::PUBLIC,
            initial_value: None,
        }
    }

    /// Replace the modifier flags
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the initial value
    pub fn initial_value(mut self, value: Value) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Mark as static field
    pub fn as_static(mut self) -> Self {
        self.modifiers |= Modifiers::STATIC;
        self
    }
}

/// Definition for a method
#[derive(Clone)]
pub struct MethodDefinition {
    /// Method name
    pub name: String,
    /// Parameter type names
    pub params: Vec<String>,
    /// Return type name (`None` for void)
    pub return_type: Option<String>,
    /// Modifier flags
    pub modifiers: Modifiers,
    /// Implementation (`None` for abstract methods)
    pub body: Option<MethodFn>,
}

impl MethodDefinition {
    /// Create a public method with a body
    pub fn new<F>(name: impl Into<String>, params: &[&str], body: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            return_type: None,
            modifiers: Modifiers::PUBLIC,
            body: Some(Arc::new(body)),
        }
    }

    /// Create a public abstract method
    pub fn abstract_method(name: impl Into<String>, params: &[&str]) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            return_type: None,
            modifiers: Modifiers::PUBLIC | Modifiers::ABSTRACT,
            body: None,
        }
    }

    /// Set return type
    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = Some(type_name.into());
        self
    }

    /// Replace the modifier flags
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark as static method
    pub fn as_static(mut self) -> Self {
        self.modifiers |= Modifiers::STATIC;
        self
    }
}

/// Definition for a constructor
#[derive(Clone)]
pub struct ConstructorDefinition {
    /// Parameter type names in declaration order
    pub params: Vec<String>,
    /// Modifier flags
    pub modifiers: Modifiers,
    /// Implementation
    pub body: ConstructorBody,
}

impl ConstructorDefinition {
    /// Public constructor that initialises an allocated instance
    pub fn init<F>(params: &[&str], body: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            params: params.iter().map(|p| p.to_string()).collect(),
            modifiers: Modifiers::PUBLIC,
            body: ConstructorBody::Init(Arc::new(body)),
        }
    }

    /// Public constructor that produces the value itself
    pub fn factory<F>(params: &[&str], body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            params: params.iter().map(|p| p.to_string()).collect(),
            modifiers: Modifiers::PUBLIC,
            body: ConstructorBody::Factory(Arc::new(body)),
        }
    }

    /// Replace the modifier flags
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Definition for a whole type
#[derive(Clone)]
pub struct TypeDefinition {
    /// Fully-qualified name
    pub name: String,
    /// Type kind
    pub kind: TypeKind,
    /// Type-level modifiers
    pub modifiers: Modifiers,
    /// Superclass name (classes default to `Object`)
    pub superclass: Option<String>,
    /// Implemented interface names
    pub interfaces: Vec<String>,
    /// Constructors in declaration order
    pub constructors: Vec<ConstructorDefinition>,
    /// Methods in declaration order
    pub methods: Vec<MethodDefinition>,
    /// Fields in declaration order
    pub fields: Vec<FieldDefinition>,
    /// Enum constant names
    pub enum_constants: Vec<String>,
}

impl TypeDefinition {
    fn new(name: impl Into<String>, kind: TypeKind, modifiers: Modifiers) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers,
            superclass: None,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            enum_constants: Vec::new(),
        }
    }

    /// Public class
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class, Modifiers::PUBLIC)
    }

    /// Public interface
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(
            name,
            TypeKind::Interface,
            Modifiers::PUBLIC | Modifiers::ABSTRACT,
        )
    }

    /// Public enumeration with the given constants
    pub fn enumeration(name: impl Into<String>, constants: &[&str]) -> Self {
        let mut def = Self::new(name, TypeKind::Enum, Modifiers::PUBLIC | Modifiers::FINAL);
        def.enum_constants = constants.iter().map(|c| c.to_string()).collect();
        def
    }

    pub(crate) fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(
            kind.name(),
            TypeKind::Primitive(kind),
            Modifiers::PUBLIC | Modifiers::FINAL | Modifiers::ABSTRACT,
        )
    }

    /// Replace the type-level modifiers
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, constructor: ConstructorDefinition) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_definition_flags() {
        let field = FieldDefinition::new("count", "int")
            .as_static()
            .initial_value(Value::Int(3));

        assert_eq!(field.modifiers, Modifiers::PUBLIC | Modifiers::STATIC);
        assert_eq!(field.initial_value, Some(Value::Int(3)));
    }

    #[test]
    fn test_method_definition() {
        let method = MethodDefinition::new("add", &["int", "int"], |_, _| Ok(Value::Null))
            .returns("int")
            .as_static();

        assert_eq!(method.params, vec!["int".to_string(), "int".to_string()]);
        assert_eq!(method.return_type.as_deref(), Some("int"));
        assert!(method.modifiers.is_static());
        assert!(method.body.is_some());

        let abstract_method = MethodDefinition::abstract_method("area", &[]);
        assert!(abstract_method.body.is_none());
        assert!(abstract_method.modifiers.contains(Modifiers::ABSTRACT));
    }

    #[test]
    fn test_type_definition_builder() {
        let def = TypeDefinition::class("geo.Circle")
            .extends("geo.Shape")
            .implements("geo.Drawable")
            .field(FieldDefinition::new("radius", "double"));

        assert_eq!(def.kind, TypeKind::Class);
        assert_eq!(def.superclass.as_deref(), Some("geo.Shape"));
        assert_eq!(def.interfaces, vec!["geo.Drawable".to_string()]);
        assert_eq!(def.fields.len(), 1);

        let colors = TypeDefinition::enumeration("paint.Color", &["RED", "GREEN"]);
        assert_eq!(colors.kind, TypeKind::Enum);
        assert_eq!(colors.enum_constants.len(), 2);
    }
}
