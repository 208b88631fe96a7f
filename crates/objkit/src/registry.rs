//! Type registry
//!
//! The registry owns every [`TypeDescriptor`] and resolves type names to
//! them. Types are indexed by a dense [`TypeId`]; the name map gives O(1)
//! resolution. Descriptors are handed out as `Arc`s, so resolving the same
//! name twice yields the same identity.
//!
//! Registration resolves the names used by a [`TypeDefinition`], checks the
//! hierarchy, lays out instance slots (inherited slots first) and, for
//! enums, synthesizes the constant fields and the `valueOf`/`name` methods.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::builtins::{self, OBJECT_TYPE, STRING, STRING_TYPE};
use crate::coerce::{CoercionError, CoercionFailure};
use crate::definition::{FieldDefinition, MethodDefinition, TypeDefinition};
use crate::descriptor::{
    AccessFlag, ConstructorDescriptor, FieldDescriptor, MethodDescriptor, Modifiers,
    PrimitiveKind, TypeDescriptor, TypeId, TypeKind,
};
use crate::error::{ReflectError, ReflectResult};
use crate::value::{EnumValue, Value};

/// Registry of reflectable types
#[derive(Debug)]
pub struct TypeRegistry {
    /// Types indexed by ID
    types: Vec<Arc<TypeDescriptor>>,
    /// Type name to ID mapping
    name_to_id: FxHashMap<String, TypeId>,
}

impl TypeRegistry {
    /// Create a registry holding the builtin types
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            name_to_id: FxHashMap::default(),
        };
        for def in builtins::definitions() {
            let registered = registry.register(def);
            debug_assert!(registered.is_ok(), "builtin type rejected: {registered:?}");
        }
        registry
    }

    /// Register a type definition and return its id
    pub fn register(&mut self, def: TypeDefinition) -> ReflectResult<TypeId> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(ReflectError::Registration(format!(
                "type {} is already registered",
                def.name
            )));
        }

        let id = TypeId(self.types.len());
        let descriptor = self.build(id, def)?;
        tracing::trace!(type_name = %descriptor.name, id = id.index(), "registered type");

        self.name_to_id.insert(descriptor.name.clone(), id);
        self.types.push(Arc::new(descriptor));
        Ok(id)
    }

    /// Resolve a type by fully-qualified name
    pub fn resolve(&self, name: &str) -> ReflectResult<Arc<TypeDescriptor>> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.types.get(id.index()))
            .cloned()
            .ok_or_else(|| ReflectError::type_not_found(name))
    }

    /// Get a type by id
    pub fn get(&self, id: TypeId) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(id.index())
    }

    /// Id registered under a name
    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Resolve several names to ids, e.g. for a parameter list
    pub fn ids(&self, names: &[&str]) -> ReflectResult<Vec<TypeId>> {
        names
            .iter()
            .map(|name| self.id_of(name).ok_or_else(|| ReflectError::type_not_found(*name)))
            .collect()
    }

    /// Whether a type is registered under the name
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    /// Number of registered types, builtins included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Never true: the builtins are always present
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all types in id order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.iter()
    }

    /// Primitive type id
    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        builtins::primitive_type(kind)
    }

    /// Boxed wrapper type id for a primitive
    pub fn boxed(&self, kind: PrimitiveKind) -> TypeId {
        builtins::boxed_type(kind)
    }

    /// `Object` type id
    pub fn object_type(&self) -> TypeId {
        OBJECT_TYPE
    }

    /// `String` type id
    pub fn string_type(&self) -> TypeId {
        STRING_TYPE
    }

    /// Name of a type id, for diagnostics
    pub fn name_of(&self, id: TypeId) -> &str {
        self.get(id).map_or("<unknown>", |ty| ty.name())
    }

    // ------------------------------------------------------------------------
    // Assignability
    // ------------------------------------------------------------------------

    /// Runtime type of a value. Primitive payloads report their boxed
    /// wrapper; `Null` and proxies have no single runtime type.
    pub fn runtime_type(&self, value: &Value) -> Option<TypeId> {
        match value {
            Value::Null | Value::Proxy(_) => None,
            Value::Str(_) => Some(STRING_TYPE),
            Value::Enum(e) => Some(e.type_id()),
            Value::Object(obj) => Some(obj.type_id()),
            other => other.primitive_kind().map(builtins::boxed_type),
        }
    }

    /// Whether `sub` is `sup` or inherits from it. Every reference type is a
    /// subtype of `Object`; primitives are only subtypes of themselves.
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        let Some(ty) = self.get(sub) else {
            return false;
        };
        if ty.is_primitive() {
            return false;
        }
        if sup == OBJECT_TYPE {
            return true;
        }
        ty.superclass().is_some_and(|parent| self.is_subtype(parent, sup))
            || ty.interfaces().iter().any(|&iface| self.is_subtype(iface, sup))
    }

    /// Whether a non-null value is an instance of `target`
    pub fn is_instance(&self, target: TypeId, value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::Proxy(proxy) => {
                target == OBJECT_TYPE
                    || proxy
                        .interfaces()
                        .iter()
                        .any(|&iface| self.is_subtype(iface, target))
            }
            other => self
                .runtime_type(other)
                .is_some_and(|runtime| self.is_subtype(runtime, target)),
        }
    }

    /// Whether a value can be passed where `declared` is expected: an
    /// instance, a primitive matching its wrapper, or null for references
    pub fn accepts(&self, declared: TypeId, value: &Value) -> bool {
        match self.get(declared).and_then(|ty| ty.primitive_kind()) {
            Some(kind) => value.primitive_kind() == Some(kind),
            None => value.is_null() || self.is_instance(declared, value),
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    fn reference(&self, self_id: TypeId, self_name: &str, name: &str) -> ReflectResult<TypeId> {
        if name == self_name {
            return Ok(self_id);
        }
        self.id_of(name)
            .or_else(|| builtins::builtin_id(name))
            .ok_or_else(|| ReflectError::type_not_found(name))
    }

    fn default_for(&self, ty: TypeId) -> Value {
        self.get(ty)
            .and_then(|ty| ty.primitive_kind())
            .map(PrimitiveKind::default_value)
            .unwrap_or_default()
    }

    fn build(&self, id: TypeId, def: TypeDefinition) -> ReflectResult<TypeDescriptor> {
        let TypeDefinition {
            name,
            kind,
            modifiers,
            superclass,
            interfaces,
            constructors,
            mut methods,
            mut fields,
            enum_constants,
        } = def;

        let superclass = match (kind, superclass) {
            (TypeKind::Primitive(_), _) => None,
            (TypeKind::Interface, Some(parent)) => {
                return Err(ReflectError::Registration(format!(
                    "interface {} cannot extend class {}",
                    name, parent
                )));
            }
            (TypeKind::Interface, None) => None,
            (TypeKind::Class, None) if name == builtins::OBJECT => None,
            (_, None) => Some(OBJECT_TYPE),
            (_, Some(parent)) => Some(self.reference(id, &name, &parent)?),
        };

        let parent = match superclass {
            Some(parent_id) if parent_id == id => {
                return Err(ReflectError::Registration(format!(
                    "type {} cannot extend itself",
                    name
                )));
            }
            Some(parent_id) => {
                let parent = self
                    .get(parent_id)
                    .ok_or_else(|| ReflectError::type_not_found(self.name_of(parent_id)))?;
                if parent.kind() != TypeKind::Class {
                    return Err(ReflectError::Registration(format!(
                        "{} cannot extend {} {}",
                        name,
                        kind_label(parent.kind()),
                        parent.name()
                    )));
                }
                if parent.modifiers().contains(Modifiers::FINAL) {
                    return Err(ReflectError::Registration(format!(
                        "{} cannot extend final class {}",
                        name,
                        parent.name()
                    )));
                }
                Some(Arc::clone(parent))
            }
            None => None,
        };

        let mut interface_ids = Vec::with_capacity(interfaces.len());
        for iface in &interfaces {
            let iface_id = self.reference(id, &name, iface)?;
            match self.get(iface_id) {
                Some(ty) if ty.is_interface() => interface_ids.push(iface_id),
                _ => {
                    return Err(ReflectError::Registration(format!(
                        "{} is not an interface",
                        iface
                    )));
                }
            }
        }

        if kind == TypeKind::Interface && !constructors.is_empty() {
            return Err(ReflectError::Registration(format!(
                "interface {} cannot declare constructors",
                name
            )));
        }

        let type_is_abstract =
            kind == TypeKind::Interface || modifiers.contains(Modifiers::ABSTRACT);

        if kind == TypeKind::Enum {
            let enum_type = name.clone();
            let constants = enum_constants.clone();
            for (ordinal, constant) in enum_constants.iter().enumerate() {
                fields.push(
                    FieldDefinition::new(constant.clone(), name.clone())
                        .modifiers(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL)
                        .initial_value(Value::Enum(EnumValue {
                            type_id: id,
                            ordinal,
                            name: Arc::from(constant.as_str()),
                        })),
                );
            }
            methods.push(
                MethodDefinition::new("valueOf", &[STRING], move |_, args| {
                    let requested = args.first().and_then(Value::as_str).unwrap_or_default();
                    match constants.iter().position(|c| c == requested) {
                        Some(ordinal) => Ok(Value::Enum(EnumValue {
                            type_id: id,
                            ordinal,
                            name: Arc::from(constants[ordinal].as_str()),
                        })),
                        None => Err(Box::new(CoercionError::new(
                            None,
                            enum_type.clone(),
                            requested,
                            CoercionFailure::NoSuchConstant,
                        ))),
                    }
                })
                .returns(name.clone())
                .as_static(),
            );
            methods.push(
                MethodDefinition::new("name", &[], |receiver, _| match receiver {
                    Some(Value::Enum(e)) => Ok(Value::string(e.name())),
                    _ => Err("name() needs an enum receiver".into()),
                })
                .returns(STRING),
            );
        }

        let mut method_descriptors = Vec::with_capacity(methods.len());
        for method in methods {
            if method.body.is_none() && !type_is_abstract {
                return Err(ReflectError::Registration(format!(
                    "{}.{} has no body but {} is not abstract",
                    name, method.name, name
                )));
            }
            let params = method
                .params
                .iter()
                .map(|p| self.reference(id, &name, p))
                .collect::<ReflectResult<Vec<_>>>()?;
            let return_type = method
                .return_type
                .as_deref()
                .map(|r| self.reference(id, &name, r))
                .transpose()?;
            let modifiers = if method.body.is_none() {
                method.modifiers | Modifiers::ABSTRACT
            } else {
                method.modifiers
            };
            method_descriptors.push(MethodDescriptor {
                name: method.name,
                params,
                return_type,
                modifiers,
                declaring: id,
                body: method.body,
                access: AccessFlag::new(),
            });
        }

        let mut constructor_descriptors = Vec::with_capacity(constructors.len());
        for ctor in constructors {
            let params = ctor
                .params
                .iter()
                .map(|p| self.reference(id, &name, p))
                .collect::<ReflectResult<Vec<_>>>()?;
            constructor_descriptors.push(ConstructorDescriptor {
                params,
                modifiers: ctor.modifiers,
                declaring: id,
                body: ctor.body,
                access: AccessFlag::new(),
            });
        }

        let (mut slot_indices, mut slot_defaults) = match &parent {
            Some(parent) => (parent.slot_indices.clone(), parent.slot_defaults.clone()),
            None => (FxHashMap::default(), Vec::new()),
        };
        let mut statics = Vec::new();
        let mut field_descriptors = Vec::with_capacity(fields.len());
        for field in fields {
            let field_type = self.reference(id, &name, &field.type_name)?;
            let initial = field
                .initial_value
                .unwrap_or_else(|| self.default_for(field_type));
            let slot = if field.modifiers.is_static() {
                statics.push(initial);
                statics.len() - 1
            } else {
                slot_defaults.push(initial);
                let slot = slot_defaults.len() - 1;
                slot_indices.insert(field.name.clone(), slot);
                slot
            };
            field_descriptors.push(FieldDescriptor {
                name: field.name,
                field_type,
                modifiers: field.modifiers,
                declaring: id,
                slot,
                access: AccessFlag::new(),
            });
        }

        Ok(TypeDescriptor {
            id,
            name,
            kind,
            modifiers,
            superclass,
            interfaces: interface_ids,
            constructors: constructor_descriptors,
            methods: method_descriptors,
            fields: field_descriptors,
            enum_constants,
            slot_indices,
            slot_defaults,
            statics: RwLock::new(statics),
        })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_label(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Primitive(_) => "primitive",
        TypeKind::Class => "class",
        TypeKind::Interface => "interface",
        TypeKind::Enum => "enum",
    }
}
