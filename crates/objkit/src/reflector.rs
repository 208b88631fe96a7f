//! Reflector
//!
//! The entry point consumers use. A [`Reflector`] owns the type registry
//! and the permission store, and exposes resolution, lookup, invocation,
//! instantiation, field access and coercion as one API. The component
//! views ([`MemberLookup`], [`Invoker`], [`ConstructorSelector`],
//! [`Coercer`]) borrow from it and can be used directly when a caller
//! needs only one of them.
//!
//! ```rust,ignore
//! let mut reflector = Reflector::new();
//! reflector.register(point_definition())?;
//!
//! let point = reflector.resolve_type("geo.Point")?;
//! let origin = reflector.instantiate(&point, &[Value::Int(0), Value::Int(0)], Strategy::Auto)?;
//! let x = reflector.get_field_by_name("geo.Point", "x", Some(&origin))?;
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::access;
use crate::coerce::{Coercer, CoercionError, CoercionReport};
use crate::config::ReflectConfig;
use crate::definition::TypeDefinition;
use crate::descriptor::{TypeDescriptor, TypeId};
use crate::error::{ReflectError, ReflectResult};
use crate::handle::{ConstructorHandle, FieldHandle, Member, MethodHandle};
use crate::invoke::Invoker;
use crate::lookup::{LookupScope, MemberLookup};
use crate::permissions::PermissionStore;
use crate::registry::TypeRegistry;
use crate::select::{ConstructorSelector, Selection, Strategy};
use crate::value::Value;

/// Registry and permission policy with the full reflective API on top
#[derive(Debug, Default)]
pub struct Reflector {
    registry: TypeRegistry,
    permissions: PermissionStore,
}

impl Reflector {
    /// Create a reflector over the builtin types with no restrictions
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reflector with an explicit permission store
    pub fn with_permissions(permissions: PermissionStore) -> Self {
        Self {
            registry: TypeRegistry::new(),
            permissions,
        }
    }

    /// Create a reflector whose permissions come from a parsed config
    pub fn with_config(config: &ReflectConfig) -> ReflectResult<Self> {
        Ok(Self::with_permissions(PermissionStore::from_config(config)?))
    }

    /// Create a reflector from a TOML config file
    pub fn from_config_file(path: impl AsRef<Path>) -> ReflectResult<Self> {
        let config = ReflectConfig::load(path.as_ref())?;
        Self::with_config(&config)
    }

    /// Register a type definition
    pub fn register(&mut self, def: TypeDefinition) -> ReflectResult<TypeId> {
        self.registry.register(def)
    }

    /// The type registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The permission store
    pub fn permissions(&self) -> &PermissionStore {
        &self.permissions
    }

    /// Mutable permission store
    pub fn permissions_mut(&mut self) -> &mut PermissionStore {
        &mut self.permissions
    }

    // ===== Component views =====

    /// Member lookup view
    pub fn lookup(&self) -> MemberLookup<'_> {
        MemberLookup::new(&self.registry, &self.permissions)
    }

    /// Invoker view
    pub fn invoker(&self) -> Invoker<'_> {
        Invoker::new(&self.registry, &self.permissions)
    }

    /// Coercer view
    pub fn coercer(&self) -> Coercer<'_> {
        Coercer::new(&self.registry, &self.permissions)
    }

    /// Constructor selector view
    pub fn selector(&self) -> ConstructorSelector<'_> {
        ConstructorSelector::new(&self.registry, self.lookup())
    }

    // ===== Resolution and lookup =====

    /// Resolve a type by fully-qualified name. The same name always yields
    /// the same `Arc`.
    pub fn resolve_type(&self, name: &str) -> ReflectResult<Arc<TypeDescriptor>> {
        self.registry.resolve(name)
    }

    /// Public method by name and parameter type names, inherited included
    pub fn find_method(
        &self,
        ty: &Arc<TypeDescriptor>,
        name: &str,
        params: &[&str],
    ) -> ReflectResult<MethodHandle> {
        let params = self.registry.ids(params)?;
        self.lookup().find_method(ty, name, &params)
    }

    /// Method declared on the type itself, any visibility
    pub fn find_declared_method(
        &self,
        ty: &Arc<TypeDescriptor>,
        name: &str,
        params: &[&str],
    ) -> ReflectResult<MethodHandle> {
        let params = self.registry.ids(params)?;
        self.lookup().find_declared_method(ty, name, &params)
    }

    /// Every method in the scope
    pub fn find_all_methods(
        &self,
        ty: &Arc<TypeDescriptor>,
        scope: LookupScope,
    ) -> ReflectResult<Vec<MethodHandle>> {
        self.lookup().find_all_methods(ty, scope)
    }

    /// Public field by name, inherited included
    pub fn find_field(&self, ty: &Arc<TypeDescriptor>, name: &str) -> ReflectResult<FieldHandle> {
        self.lookup().find_field(ty, name)
    }

    /// Field declared on the type itself, any visibility
    pub fn find_declared_field(
        &self,
        ty: &Arc<TypeDescriptor>,
        name: &str,
    ) -> ReflectResult<FieldHandle> {
        self.lookup().find_declared_field(ty, name)
    }

    /// Every field in the scope
    pub fn find_all_fields(
        &self,
        ty: &Arc<TypeDescriptor>,
        scope: LookupScope,
    ) -> ReflectResult<Vec<FieldHandle>> {
        self.lookup().find_all_fields(ty, scope)
    }

    // ===== Methods =====

    /// Invoke a resolved method
    pub fn invoke_method(
        &self,
        method: &MethodHandle,
        instance: Option<&Value>,
        args: &[Value],
    ) -> ReflectResult<Value> {
        self.invoker().invoke_method(method, instance, args)
    }

    /// Coerce string arguments against the method's parameters, then
    /// invoke with whatever could be coerced. Positions that failed keep
    /// their original value and usually fail the call's argument check.
    pub fn invoke_method_coerced(
        &self,
        method: &MethodHandle,
        instance: Option<&Value>,
        args: Vec<Value>,
    ) -> ReflectResult<Value> {
        let report = self.coerce_arguments(method.params(), args);
        self.invoke_method(method, instance, report.values())
    }

    /// Invoke a public static method of `ty` chosen by its arguments: an
    /// exact match on the arguments' runtime types first, then the first
    /// static overload that accepts them positionally
    pub fn invoke_static(
        &self,
        ty: &Arc<TypeDescriptor>,
        name: &str,
        args: &[Value],
    ) -> ReflectResult<Value> {
        let overloads: Vec<MethodHandle> = self
            .lookup()
            .methods_named(ty, name)?
            .into_iter()
            .filter(MethodHandle::is_static)
            .collect();

        let runtime: Option<Vec<TypeId>> = args
            .iter()
            .map(|arg| self.registry.runtime_type(arg))
            .collect();
        let exact = runtime.and_then(|runtime| {
            overloads
                .iter()
                .find(|m| m.params() == runtime.as_slice())
        });
        let method = exact.or_else(|| {
            overloads.iter().find(|m| {
                m.params().len() == args.len()
                    && m.params()
                        .iter()
                        .zip(args)
                        .all(|(&param, arg)| self.registry.accepts(param, arg))
            })
        });

        match method {
            Some(method) => self.invoke_method(method, None, args),
            None => {
                let labels: Vec<String> = args.iter().map(Value::type_label).collect();
                Err(ReflectError::member_not_found(
                    ty.name(),
                    format!("{}({})", name, labels.join(", ")),
                ))
            }
        }
    }

    // ===== Constructors =====

    /// Invoke a resolved constructor
    pub fn invoke_constructor(
        &self,
        ctor: &ConstructorHandle,
        args: &[Value],
    ) -> ReflectResult<Value> {
        self.invoker().invoke_constructor(ctor, args)
    }

    /// Pick the public constructor of `ty` the arguments should go to
    pub fn select_constructor(
        &self,
        ty: &Arc<TypeDescriptor>,
        args: &[Value],
        strategy: Strategy,
    ) -> ReflectResult<Selection> {
        self.selector().select(ty, args, strategy)
    }

    /// Select a constructor, arrange the arguments into its declared order
    /// and invoke it
    pub fn instantiate(
        &self,
        ty: &Arc<TypeDescriptor>,
        args: &[Value],
        strategy: Strategy,
    ) -> ReflectResult<Value> {
        let selection = self.select_constructor(ty, args, strategy)?;
        let arranged = selection.arrange(args);
        self.invoke_constructor(selection.constructor(), &arranged)
    }

    /// [`instantiate`](Self::instantiate) by type name
    pub fn instantiate_by_name(
        &self,
        type_name: &str,
        args: &[Value],
        strategy: Strategy,
    ) -> ReflectResult<Value> {
        let ty = self.resolve_type(type_name)?;
        self.instantiate(&ty, args, strategy)
    }

    // ===== Fields =====

    /// Read a field
    pub fn get_field(&self, field: &FieldHandle, instance: Option<&Value>) -> ReflectResult<Value> {
        self.invoker().get_field(field, instance)
    }

    /// Write a field
    pub fn set_field(
        &self,
        field: &FieldHandle,
        instance: Option<&Value>,
        value: Value,
    ) -> ReflectResult<()> {
        self.invoker().set_field(field, instance, value)
    }

    /// Write a field, coercing a string value into the field's type first
    pub fn set_field_coerced(
        &self,
        field: &FieldHandle,
        instance: Option<&Value>,
        value: Value,
    ) -> ReflectResult<()> {
        let coercer = self.coercer();
        let value = match &value {
            Value::Str(text) if coercer.needs_coercion(field.field_type(), &value) => {
                coercer.coerce(field.field_type(), text)?
            }
            _ => value,
        };
        self.set_field(field, instance, value)
    }

    /// Resolve the type, find the public field and read it
    pub fn get_field_by_name(
        &self,
        type_name: &str,
        field: &str,
        instance: Option<&Value>,
    ) -> ReflectResult<Value> {
        let ty = self.resolve_type(type_name)?;
        let field = self.find_field(&ty, field)?;
        self.get_field(&field, instance)
    }

    // ===== Coercion =====

    /// Best-effort batch coercion; see [`Coercer::coerce_arguments`]
    pub fn coerce_arguments(&self, params: &[TypeId], args: Vec<Value>) -> CoercionReport {
        self.coercer().coerce_arguments(params, args)
    }

    /// Coerce one string into the target type
    pub fn coerce_value(&self, target: TypeId, value: &str) -> Result<Value, CoercionError> {
        self.coercer().coerce(target, value)
    }

    /// Enum constant of `ty` named `name`
    pub fn enum_constant(&self, ty: &TypeDescriptor, name: &str) -> ReflectResult<Value> {
        Ok(self.coercer().enum_constant(ty, name)?)
    }

    /// The constant of the field's enum type whose name is the field's
    /// name, obtained through the enum's static `valueOf(String)`
    pub fn enum_instance(&self, field: &FieldHandle) -> ReflectResult<Value> {
        let ty = self
            .registry
            .get(field.field_type())
            .cloned()
            .ok_or_else(|| ReflectError::type_not_found(self.registry.name_of(field.field_type())))?;
        let value_of = self
            .lookup()
            .find_method(&ty, "valueOf", &[self.registry.string_type()])?;
        self.invoke_method(&value_of, None, &[Value::string(field.name())])
    }

    // ===== Access =====

    /// Run `operation` with the member's access checks suppressed when it
    /// qualifies; see [`access::with_elevated_access`]
    pub fn with_elevated_access<M, T, F>(&self, member: &M, instance: Option<&Value>, operation: F) -> T
    where
        M: Member + ?Sized,
        F: FnOnce(&M, Option<&Value>) -> T,
    {
        access::with_elevated_access(&self.permissions, member, instance, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ConstructorDefinition, FieldDefinition, MethodDefinition};
    use crate::descriptor::Modifiers;

    fn reflector() -> Reflector {
        let mut reflector = Reflector::new();
        reflector
            .register(TypeDefinition::enumeration("ui.Mode", &["LIGHT", "DARK"]))
            .unwrap();
        reflector
            .register(
                TypeDefinition::class("ui.Theme")
                    .field(FieldDefinition::new("DARK", "ui.Mode").as_static())
                    .field(FieldDefinition::new("scale", "int"))
                    .constructor(ConstructorDefinition::init(&[], |_, _| Ok(())))
                    .method(
                        MethodDefinition::new("of", &["int"], |_, args| {
                            Ok(Value::Int(args[0].as_i32().unwrap_or_default() * 2))
                        })
                        .as_static()
                        .returns("int"),
                    )
                    .method(
                        MethodDefinition::new("of", &["String"], |_, args| {
                            Ok(Value::string(args[0].as_str().unwrap_or_default().to_uppercase()))
                        })
                        .as_static()
                        .returns("String"),
                    ),
            )
            .unwrap();
        reflector
    }

    #[test]
    fn test_invoke_static_picks_overload() {
        let reflector = reflector();
        let theme = reflector.resolve_type("ui.Theme").unwrap();

        let doubled = reflector.invoke_static(&theme, "of", &[Value::Int(4)]).unwrap();
        assert_eq!(doubled, Value::Int(8));
        let upper = reflector.invoke_static(&theme, "of", &[Value::string("dim")]).unwrap();
        assert_eq!(upper, Value::string("DIM"));

        let err = reflector.invoke_static(&theme, "of", &[Value::Bool(true)]).unwrap_err();
        assert!(matches!(err, ReflectError::MemberNotFound { .. }));
    }

    #[test]
    fn test_enum_instance_from_field_name() {
        let reflector = reflector();
        let theme = reflector.resolve_type("ui.Theme").unwrap();
        let field = reflector.find_field(&theme, "DARK").unwrap();

        let value = reflector.enum_instance(&field).unwrap();
        assert_eq!(value.as_enum().map(|e| e.name()), Some("DARK"));
    }

    #[test]
    fn test_set_field_coerced() {
        let reflector = reflector();
        let theme = reflector.resolve_type("ui.Theme").unwrap();
        let obj = reflector.instantiate(&theme, &[], Strategy::Auto).unwrap();
        let scale = reflector.find_field(&theme, "scale").unwrap();

        reflector
            .set_field_coerced(&scale, Some(&obj), Value::string("3"))
            .unwrap();
        assert_eq!(reflector.get_field(&scale, Some(&obj)).unwrap(), Value::Int(3));

        let err = reflector
            .set_field_coerced(&scale, Some(&obj), Value::string("three"))
            .unwrap_err();
        assert!(matches!(err, ReflectError::Coercion(_)));
    }

    #[test]
    fn test_get_field_by_name_unknown_type() {
        let reflector = reflector();
        let err = reflector
            .get_field_by_name("ui.Missing", "scale", None)
            .unwrap_err();
        assert!(matches!(err, ReflectError::TypeNotFound { .. }));
    }

    #[test]
    fn test_declared_lookup_sees_private_members() {
        let mut reflector = reflector();
        reflector
            .register(
                TypeDefinition::class("ui.Panel")
                    .field(FieldDefinition::new("handle", "long").modifiers(Modifiers::PRIVATE)),
            )
            .unwrap();
        let panel = reflector.resolve_type("ui.Panel").unwrap();

        assert!(reflector.find_field(&panel, "handle").is_err());
        let field = reflector.find_declared_field(&panel, "handle").unwrap();
        assert!(!field.is_reachable());
    }
}
