//! Invoker
//!
//! Calls methods and constructors and reads or writes fields through
//! resolved handles. Every call runs inside the access scope guard, and
//! every failure raised inside the call (argument shape, unreachable
//! member, missing receiver, or an error raised by the callee) is
//! normalised into [`ReflectError::Invocation`] or
//! [`ReflectError::FieldAccess`] with the original failure as its source.

use std::sync::Arc;

use crate::access::with_elevated_access;
use crate::descriptor::{
    ConstructorBody, MethodDescriptor, MethodFn, Modifiers, TypeDescriptor, TypeId,
};
use crate::error::{CallFailure, ReflectError, ReflectResult};
use crate::handle::{ConstructorHandle, FieldHandle, Member, MethodHandle};
use crate::permissions::{PermissionStore, ReflectionPermission};
use crate::registry::TypeRegistry;
use crate::value::{Instance, ObjectRef, Value};

/// Raised when a call reaches a method that has no implementation on the
/// receiver's type
#[derive(Debug, thiserror::Error)]
#[error("no implementation of {0} on the receiver")]
pub struct AbstractMethodError(pub String);

/// Invoker over a registry, subject to a permission store
#[derive(Clone, Copy)]
pub struct Invoker<'a> {
    registry: &'a TypeRegistry,
    permissions: &'a PermissionStore,
}

impl<'a> Invoker<'a> {
    /// Create an invoker
    pub fn new(registry: &'a TypeRegistry, permissions: &'a PermissionStore) -> Self {
        Self {
            registry,
            permissions,
        }
    }

    // ===== Methods =====

    /// Invoke a method. `instance` is ignored for static methods.
    pub fn invoke_method(
        &self,
        method: &MethodHandle,
        instance: Option<&Value>,
        args: &[Value],
    ) -> ReflectResult<Value> {
        with_elevated_access(self.permissions, method, instance, |m, receiver| {
            self.call_method(m, receiver, args)
        })
        .map_err(|cause| {
            let member = method.qualified_name();
            tracing::error!(%member, error = %cause, "method invocation failed");
            ReflectError::Invocation { member, cause }
        })
    }

    fn call_method(
        &self,
        method: &MethodHandle,
        receiver: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, CallFailure> {
        self.ensure_reachable(method)?;
        let descriptor = method.descriptor();
        self.check_args(descriptor.params(), args)?;

        if method.is_static() {
            let body = descriptor
                .body
                .as_ref()
                .ok_or_else(|| abstract_method(method))?;
            return body(None, args).map_err(CallFailure::Thrown);
        }

        let receiver = match receiver {
            None | Some(Value::Null) => return Err(CallFailure::NullInstance),
            Some(receiver) => receiver,
        };
        if !self.registry.is_instance(descriptor.declaring(), receiver) {
            return Err(CallFailure::IllegalArgument(format!(
                "receiver {} is not an instance of {}",
                receiver.type_label(),
                method.declaring_type().name()
            )));
        }

        if let Value::Proxy(proxy) = receiver {
            return proxy
                .dispatch(descriptor.name(), args)
                .map_err(CallFailure::Thrown);
        }

        let body = self
            .dispatch_target(receiver, descriptor)
            .ok_or_else(|| abstract_method(method))?;
        body(Some(receiver), args).map_err(CallFailure::Thrown)
    }

    /// Most-derived implementation of the method for the receiver's type.
    /// Private methods are not overridable and always run their own body.
    fn dispatch_target(&self, receiver: &Value, method: &MethodDescriptor) -> Option<MethodFn> {
        if method.modifiers().contains(Modifiers::PRIVATE) {
            return method.body.clone();
        }

        let mut current = self.registry.runtime_type(receiver);
        while let Some(id) = current {
            let ty = self.registry.get(id)?;
            let found = ty.methods().iter().find(|m| {
                !m.modifiers().is_static()
                    && m.has_body()
                    && m.signature_matches(method.name(), method.params())
            });
            if let Some(found) = found {
                return found.body.clone();
            }
            current = ty.superclass();
        }
        method.body.clone()
    }

    // ===== Constructors =====

    /// Invoke a constructor and return the new value
    pub fn invoke_constructor(
        &self,
        ctor: &ConstructorHandle,
        args: &[Value],
    ) -> ReflectResult<Value> {
        let ty = ctor.declaring_type();
        if let Some(reason) = not_instantiable(ty) {
            return Err(ReflectError::Instantiation {
                type_name: ty.name().to_string(),
                reason: reason.to_string(),
            });
        }
        self.permissions
            .require(ty.name(), ReflectionPermission::INSTANTIATE, "instantiate")?;

        with_elevated_access(self.permissions, ctor, None, |c, _| {
            self.call_constructor(c, args)
        })
        .map_err(|cause| {
            let member = ctor.qualified_name();
            tracing::error!(%member, error = %cause, "constructor invocation failed");
            ReflectError::Invocation { member, cause }
        })
    }

    fn call_constructor(
        &self,
        ctor: &ConstructorHandle,
        args: &[Value],
    ) -> Result<Value, CallFailure> {
        self.ensure_reachable(ctor)?;
        self.check_args(ctor.params(), args)?;

        match &ctor.descriptor().body {
            ConstructorBody::Init(init) => {
                let obj = ObjectRef::new(Instance::new(Arc::clone(ctor.declaring_type())));
                init(&obj, args).map_err(CallFailure::Thrown)?;
                Ok(Value::Object(obj))
            }
            ConstructorBody::Factory(factory) => factory(args).map_err(CallFailure::Thrown),
        }
    }

    // ===== Fields =====

    /// Read a field. `instance` is ignored for static fields.
    pub fn get_field(&self, field: &FieldHandle, instance: Option<&Value>) -> ReflectResult<Value> {
        with_elevated_access(self.permissions, field, instance, |f, receiver| {
            self.read_field(f, receiver)
        })
        .map_err(|cause| field_error(field, cause))
    }

    fn read_field(&self, field: &FieldHandle, receiver: Option<&Value>) -> Result<Value, CallFailure> {
        self.ensure_reachable(field)?;
        if field.is_static() {
            return field
                .declaring_type()
                .read_static(field.slot())
                .ok_or_else(|| missing_slot(field));
        }

        let obj = self.receiver_object(field, receiver)?;
        let value = obj.read().slot(field.slot()).cloned();
        value.ok_or_else(|| missing_slot(field))
    }

    /// Write a field. Final fields are writable only while accessible.
    pub fn set_field(
        &self,
        field: &FieldHandle,
        instance: Option<&Value>,
        value: Value,
    ) -> ReflectResult<()> {
        with_elevated_access(self.permissions, field, instance, |f, receiver| {
            self.write_field(f, receiver, value)
        })
        .map_err(|cause| field_error(field, cause))
    }

    fn write_field(
        &self,
        field: &FieldHandle,
        receiver: Option<&Value>,
        value: Value,
    ) -> Result<(), CallFailure> {
        self.ensure_reachable(field)?;
        if field.modifiers().contains(Modifiers::FINAL) && !field.is_accessible() {
            return Err(CallFailure::IllegalAccess {
                member: field.qualified_name(),
            });
        }
        if !self.registry.accepts(field.field_type(), &value) {
            return Err(CallFailure::IllegalArgument(format!(
                "cannot assign {} to field of type {}",
                value.type_label(),
                self.registry.name_of(field.field_type())
            )));
        }

        let written = if field.is_static() {
            field.declaring_type().write_static(field.slot(), value)
        } else {
            let obj = self.receiver_object(field, receiver)?;
            obj.write().set_slot(field.slot(), value)
        };
        if written {
            Ok(())
        } else {
            Err(missing_slot(field))
        }
    }

    fn receiver_object<'v>(
        &self,
        field: &FieldHandle,
        receiver: Option<&'v Value>,
    ) -> Result<&'v ObjectRef, CallFailure> {
        match receiver {
            None | Some(Value::Null) => Err(CallFailure::NullInstance),
            Some(value @ Value::Object(obj))
                if self.registry.is_instance(field.declaring_type().id(), value) =>
            {
                Ok(obj)
            }
            Some(other) => Err(CallFailure::IllegalArgument(format!(
                "{} has no field {}",
                other.type_label(),
                field.qualified_name()
            ))),
        }
    }

    // ===== Checks =====

    fn ensure_reachable<M: Member>(&self, member: &M) -> Result<(), CallFailure> {
        if member.is_reachable() {
            Ok(())
        } else {
            Err(CallFailure::IllegalAccess {
                member: member.qualified_name(),
            })
        }
    }

    fn check_args(&self, params: &[TypeId], args: &[Value]) -> Result<(), CallFailure> {
        if params.len() != args.len() {
            return Err(CallFailure::IllegalArgument(format!(
                "wrong number of arguments: expected {}, got {}",
                params.len(),
                args.len()
            )));
        }
        for (position, (&param, arg)) in params.iter().zip(args).enumerate() {
            if !self.registry.accepts(param, arg) {
                return Err(CallFailure::IllegalArgument(format!(
                    "argument {} type mismatch: expected {}, got {}",
                    position,
                    self.registry.name_of(param),
                    arg.type_label()
                )));
            }
        }
        Ok(())
    }
}

fn not_instantiable(ty: &TypeDescriptor) -> Option<&'static str> {
    if ty.is_primitive() {
        Some("primitive types have no instances")
    } else if ty.is_interface() {
        Some("type is an interface")
    } else if ty.is_enum() {
        Some("enum constants cannot be constructed")
    } else if ty.is_abstract() {
        Some("type is abstract")
    } else {
        None
    }
}

fn abstract_method(method: &MethodHandle) -> CallFailure {
    CallFailure::Thrown(Box::new(AbstractMethodError(method.qualified_name())))
}

fn missing_slot(field: &FieldHandle) -> CallFailure {
    CallFailure::IllegalArgument(format!("no storage for {}", field.qualified_name()))
}

fn field_error(field: &FieldHandle, cause: CallFailure) -> ReflectError {
    let name = field.qualified_name();
    tracing::error!(field = %name, error = %cause, "field access failed");
    ReflectError::FieldAccess { field: name, cause }
}
