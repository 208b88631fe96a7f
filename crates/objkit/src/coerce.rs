//! Value coercion
//!
//! Converts string values into the type a parameter or field expects:
//!
//! - primitive targets are built through their boxed wrapper's public
//!   `(String)` constructor, so `"42"` for an `int` becomes `Int(42)`;
//! - enum targets take the constant whose name equals the string;
//! - any other target is built through its own public `(String)`
//!   constructor.
//!
//! A batch coerces every position independently. A failing position keeps
//! its original value, is logged, and is reported in the
//! [`CoercionReport`]; the other positions are still coerced.

use std::sync::Arc;

use crate::descriptor::{PrimitiveKind, TypeDescriptor, TypeId, TypeKind};
use crate::error::{BoxError, CallFailure, ReflectError};
use crate::handle::{ConstructorHandle, Member};
use crate::invoke::Invoker;
use crate::permissions::PermissionStore;
use crate::registry::TypeRegistry;
use crate::value::{EnumValue, Value};

/// Primitive kinds and the wrapper types their values are built through
pub const BOXED_EQUIVALENTS: [(PrimitiveKind, &str); 8] = [
    (PrimitiveKind::Boolean, "Boolean"),
    (PrimitiveKind::Byte, "Byte"),
    (PrimitiveKind::Char, "Character"),
    (PrimitiveKind::Short, "Short"),
    (PrimitiveKind::Int, "Integer"),
    (PrimitiveKind::Long, "Long"),
    (PrimitiveKind::Float, "Float"),
    (PrimitiveKind::Double, "Double"),
];

/// Wrapper type name for a primitive kind
pub fn boxed_equivalent(kind: PrimitiveKind) -> &'static str {
    BOXED_EQUIVALENTS[kind as usize].1
}

/// Why a single value could not be coerced
#[derive(Debug, thiserror::Error)]
pub enum CoercionFailure {
    /// The target has no `(String)` constructor
    #[error("no (String) constructor")]
    NoStringConstructor,

    /// The `(String)` constructor exists but may not be used
    #[error("(String) constructor is not accessible")]
    InaccessibleConstructor,

    /// The target cannot be instantiated at all
    #[error("target type cannot be instantiated")]
    AbstractTarget,

    /// The `(String)` constructor rejected the value
    #[error("constructor failed: {0}")]
    ConstructorFailed(#[source] BoxError),

    /// No enum constant has that name
    #[error("no constant with that name")]
    NoSuchConstant,
}

/// A value that could not be converted into its target type
#[derive(Debug, thiserror::Error)]
#[error("cannot coerce {value:?} to {target}: {failure}")]
pub struct CoercionError {
    position: Option<usize>,
    target: String,
    value: String,
    #[source]
    failure: CoercionFailure,
}

impl CoercionError {
    /// Create a coercion error
    pub fn new(
        position: Option<usize>,
        target: impl Into<String>,
        value: impl Into<String>,
        failure: CoercionFailure,
    ) -> Self {
        Self {
            position,
            target: target.into(),
            value: value.into(),
            failure,
        }
    }

    fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Argument position, for batch coercion
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Target type name
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The string that was being coerced
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Failure discriminator
    pub fn failure(&self) -> &CoercionFailure {
        &self.failure
    }
}

/// Overall outcome of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionStatus {
    /// Every position that needed coercion was coerced
    Complete,
    /// At least one position kept its original value
    Partial,
}

/// Result of coercing a batch of arguments
#[derive(Debug)]
pub struct CoercionReport {
    values: Vec<Value>,
    failures: Vec<CoercionError>,
}

impl CoercionReport {
    /// Overall outcome
    pub fn status(&self) -> CoercionStatus {
        if self.failures.is_empty() {
            CoercionStatus::Complete
        } else {
            CoercionStatus::Partial
        }
    }

    /// Whether every position was coerced
    pub fn is_complete(&self) -> bool {
        self.status() == CoercionStatus::Complete
    }

    /// Best-effort values, failed positions holding their original value
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Per-position failures, in position order
    pub fn failures(&self) -> &[CoercionError] {
        &self.failures
    }

    /// Positions that could not be coerced
    pub fn failed_positions(&self) -> Vec<usize> {
        self.failures.iter().filter_map(CoercionError::position).collect()
    }

    /// Best-effort values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// The values if the batch is complete, otherwise the first failure
    pub fn into_result(mut self) -> Result<Vec<Value>, CoercionError> {
        if self.failures.is_empty() {
            Ok(self.values)
        } else {
            Err(self.failures.swap_remove(0))
        }
    }
}

/// String-to-type coercion over a registry
#[derive(Clone, Copy)]
pub struct Coercer<'a> {
    registry: &'a TypeRegistry,
    permissions: &'a PermissionStore,
}

impl<'a> Coercer<'a> {
    /// Create a coercer
    pub fn new(registry: &'a TypeRegistry, permissions: &'a PermissionStore) -> Self {
        Self {
            registry,
            permissions,
        }
    }

    /// A string value the target does not already accept
    pub fn needs_coercion(&self, target: TypeId, value: &Value) -> bool {
        matches!(value, Value::Str(_)) && !self.registry.accepts(target, value)
    }

    /// Coerce one string into the target type
    pub fn coerce(&self, target: TypeId, value: &str) -> Result<Value, CoercionError> {
        let Some(ty) = self.registry.get(target) else {
            return Err(CoercionError::new(
                None,
                self.registry.name_of(target),
                value,
                CoercionFailure::NoStringConstructor,
            ));
        };

        match ty.kind() {
            TypeKind::Primitive(kind) => {
                let boxed = self.registry.get(self.registry.boxed(kind)).ok_or_else(|| {
                    CoercionError::new(None, ty.name(), value, CoercionFailure::NoStringConstructor)
                })?;
                self.construct(ty.name(), boxed, value)
            }
            TypeKind::Enum => self.enum_constant(ty, value),
            TypeKind::Class | TypeKind::Interface => self.construct(ty.name(), ty, value),
        }
    }

    /// Enum constant of `ty` whose name equals `name`
    pub fn enum_constant(&self, ty: &TypeDescriptor, name: &str) -> Result<Value, CoercionError> {
        ty.enum_constants()
            .iter()
            .position(|constant| constant == name)
            .map(|ordinal| {
                Value::Enum(EnumValue {
                    type_id: ty.id(),
                    ordinal,
                    name: Arc::from(name),
                })
            })
            .ok_or_else(|| {
                CoercionError::new(None, ty.name(), name, CoercionFailure::NoSuchConstant)
            })
    }

    fn construct(
        &self,
        target: &str,
        ty: &Arc<TypeDescriptor>,
        value: &str,
    ) -> Result<Value, CoercionError> {
        let fail = |failure| CoercionError::new(None, target, value, failure);

        let string = [self.registry.string_type()];
        let index = ty
            .constructors()
            .iter()
            .position(|ctor| ctor.params() == string.as_slice())
            .ok_or_else(|| fail(CoercionFailure::NoStringConstructor))?;
        let ctor = ConstructorHandle::new(Arc::clone(ty), index);
        if !ctor.modifiers().is_public() {
            return Err(fail(CoercionFailure::InaccessibleConstructor));
        }

        Invoker::new(self.registry, self.permissions)
            .invoke_constructor(&ctor, &[Value::string(value)])
            .map_err(|err| {
                fail(match err {
                    ReflectError::Instantiation { .. } => CoercionFailure::AbstractTarget,
                    ReflectError::AccessDenied { .. } => CoercionFailure::InaccessibleConstructor,
                    ReflectError::Invocation {
                        cause: CallFailure::IllegalAccess { .. },
                        ..
                    } => CoercionFailure::InaccessibleConstructor,
                    ReflectError::Invocation {
                        cause: CallFailure::Thrown(thrown),
                        ..
                    } => CoercionFailure::ConstructorFailed(thrown),
                    other => CoercionFailure::ConstructorFailed(Box::new(other)),
                })
            })
    }

    /// Coerce every string argument that its parameter does not accept.
    /// Arguments beyond the parameter list are passed through unchanged.
    pub fn coerce_arguments(&self, params: &[TypeId], args: Vec<Value>) -> CoercionReport {
        let mut values = Vec::with_capacity(args.len());
        let mut failures = Vec::new();

        for (position, arg) in args.into_iter().enumerate() {
            let target = match params.get(position) {
                Some(&target) if self.needs_coercion(target, &arg) => target,
                _ => {
                    values.push(arg);
                    continue;
                }
            };
            let text = arg.as_str().unwrap_or_default();
            match self.coerce(target, text) {
                Ok(coerced) => values.push(coerced),
                Err(err) => {
                    let err = err.at(position);
                    tracing::warn!(
                        position,
                        target = err.target(),
                        value = err.value(),
                        reason = %err.failure(),
                        "argument left uncoerced"
                    );
                    failures.push(err);
                    values.push(arg);
                }
            }
        }

        CoercionReport { values, failures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ConstructorDefinition, TypeDefinition};
    use crate::descriptor::Modifiers;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(TypeDefinition::enumeration("paint.Color", &["RED", "GREEN"]))
            .unwrap();
        registry
            .register(TypeDefinition::class("paint.Opaque"))
            .unwrap();
        registry
            .register(
                TypeDefinition::class("paint.Locked").constructor(
                    ConstructorDefinition::init(&["String"], |_, _| Ok(()))
                        .modifiers(Modifiers::PRIVATE),
                ),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_boxed_equivalents() {
        assert_eq!(boxed_equivalent(PrimitiveKind::Int), "Integer");
        assert_eq!(boxed_equivalent(PrimitiveKind::Char), "Character");
        for (kind, name) in BOXED_EQUIVALENTS {
            assert_eq!(boxed_equivalent(kind), name);
        }
    }

    #[test]
    fn test_coerce_primitives_and_strings() {
        let registry = registry();
        let store = PermissionStore::new();
        let coercer = Coercer::new(&registry, &store);

        let int = registry.primitive(PrimitiveKind::Int);
        assert_eq!(coercer.coerce(int, "42").unwrap(), Value::Int(42));
        let boolean = registry.primitive(PrimitiveKind::Boolean);
        assert_eq!(coercer.coerce(boolean, "true").unwrap(), Value::Bool(true));
        let integer = registry.boxed(PrimitiveKind::Int);
        assert_eq!(coercer.coerce(integer, "-3").unwrap(), Value::Int(-3));

        let err = coercer.coerce(int, "forty").unwrap_err();
        assert!(matches!(err.failure(), CoercionFailure::ConstructorFailed(_)));
        assert_eq!(err.target(), "int");
    }

    #[test]
    fn test_coerce_enum() {
        let registry = registry();
        let store = PermissionStore::new();
        let coercer = Coercer::new(&registry, &store);
        let color = registry.id_of("paint.Color").unwrap();

        let green = coercer.coerce(color, "GREEN").unwrap();
        assert_eq!(green.as_enum().unwrap().ordinal(), 1);

        let err = coercer.coerce(color, "green").unwrap_err();
        assert!(matches!(err.failure(), CoercionFailure::NoSuchConstant));
    }

    #[test]
    fn test_coerce_failure_discriminators() {
        let registry = registry();
        let store = PermissionStore::new();
        let coercer = Coercer::new(&registry, &store);

        let opaque = registry.id_of("paint.Opaque").unwrap();
        let err = coercer.coerce(opaque, "x").unwrap_err();
        assert!(matches!(err.failure(), CoercionFailure::NoStringConstructor));

        let locked = registry.id_of("paint.Locked").unwrap();
        let err = coercer.coerce(locked, "x").unwrap_err();
        assert!(matches!(err.failure(), CoercionFailure::InaccessibleConstructor));
    }

    #[test]
    fn test_needs_coercion() {
        let registry = registry();
        let store = PermissionStore::new();
        let coercer = Coercer::new(&registry, &store);
        let int = registry.primitive(PrimitiveKind::Int);

        assert!(coercer.needs_coercion(int, &Value::string("1")));
        assert!(!coercer.needs_coercion(int, &Value::Int(1)));
        assert!(!coercer.needs_coercion(registry.string_type(), &Value::string("1")));
        assert!(!coercer.needs_coercion(registry.object_type(), &Value::string("1")));
    }

    #[test]
    fn test_batch_keeps_going_after_failure() {
        let registry = registry();
        let store = PermissionStore::new();
        let coercer = Coercer::new(&registry, &store);
        let int = registry.primitive(PrimitiveKind::Int);
        let opaque = registry.id_of("paint.Opaque").unwrap();

        let report = coercer.coerce_arguments(
            &[int, opaque, int],
            vec![Value::string("7"), Value::string("bad"), Value::string("9")],
        );
        assert_eq!(report.status(), CoercionStatus::Partial);
        assert_eq!(report.failed_positions(), vec![1]);
        assert_eq!(
            report.values(),
            &[Value::Int(7), Value::string("bad"), Value::Int(9)]
        );

        let err = report.into_result().unwrap_err();
        assert_eq!(err.position(), Some(1));
    }
}
