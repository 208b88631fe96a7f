//! Runtime values
//!
//! [`Value`] is the dynamic value passed to and returned from reflective
//! calls. Primitive payloads are stored inline; their runtime type is the
//! boxed wrapper (an `Int` is an `Integer`). Objects are shared, lockable
//! instances of a registered class, and proxies are dynamically built
//! values that implement a set of interfaces by dispatching every call to
//! a handler.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::descriptor::{PrimitiveKind, TypeDescriptor, TypeId};
use crate::error::BoxError;

// ============================================================================
// Value
// ============================================================================

/// Dynamic runtime value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 8-bit integer
    Byte(i8),
    /// Character
    Char(char),
    /// 16-bit integer
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// String
    Str(String),
    /// Enum constant
    Enum(EnumValue),
    /// Class instance
    Object(ObjectRef),
    /// Dynamically built interface implementation
    Proxy(ProxyRef),
}

impl Value {
    /// Build a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Check if this is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a proxy
    pub fn is_proxy(&self) -> bool {
        matches!(self, Value::Proxy(_))
    }

    /// Primitive kind of an inline primitive payload
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::Bool(_) => Some(PrimitiveKind::Boolean),
            Value::Byte(_) => Some(PrimitiveKind::Byte),
            Value::Char(_) => Some(PrimitiveKind::Char),
            Value::Short(_) => Some(PrimitiveKind::Short),
            Value::Int(_) => Some(PrimitiveKind::Int),
            Value::Long(_) => Some(PrimitiveKind::Long),
            Value::Float(_) => Some(PrimitiveKind::Float),
            Value::Double(_) => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i32
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as enum constant
    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Get as object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get as proxy
    pub fn as_proxy(&self) -> Option<&ProxyRef> {
        match self {
            Value::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Short description of the runtime shape, for diagnostics
    pub fn type_label(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Str(_) => "String".to_string(),
            Value::Enum(e) => format!("enum#{}", e.type_id.index()),
            Value::Object(obj) => obj.read().type_descriptor().name().to_string(),
            Value::Proxy(_) => "proxy".to_string(),
            other => other
                .primitive_kind()
                .map(|kind| kind.name().to_string())
                .unwrap_or_default(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Proxy(a), Value::Proxy(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Byte(b) => write!(f, "Byte({})", b),
            Value::Char(c) => write!(f, "Char({:?})", c),
            Value::Short(s) => write!(f, "Short({})", s),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Long(l) => write!(f, "Long({})", l),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Double(x) => write!(f, "Double({})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Enum(e) => write!(f, "Enum({})", e.name),
            Value::Object(obj) => write!(f, "Object({})", obj.read().type_descriptor().name()),
            Value::Proxy(p) => write!(f, "Proxy({:?})", p.interfaces()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

// ============================================================================
// Enum constants
// ============================================================================

/// A constant of a registered enum type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub(crate) type_id: TypeId,
    pub(crate) ordinal: usize,
    pub(crate) name: Arc<str>,
}

impl EnumValue {
    /// Enum type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Declaration index
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Constant name
    pub fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Objects
// ============================================================================

/// Field storage of a class instance
pub struct Instance {
    ty: Arc<TypeDescriptor>,
    slots: Vec<Value>,
}

impl Instance {
    /// Allocate an instance with every slot at its default value
    pub fn new(ty: Arc<TypeDescriptor>) -> Self {
        let slots = ty.slot_defaults.clone();
        Self { ty, slots }
    }

    /// Concrete type of the instance
    pub fn type_descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.ty
    }

    /// Read a field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.ty.slot_of(field).and_then(|slot| self.slots.get(slot))
    }

    /// Write a field by name. Returns false if the type has no such field.
    pub fn set(&mut self, field: &str, value: Value) -> bool {
        match self.ty.slot_of(field).and_then(|slot| self.slots.get_mut(slot)) {
            Some(target) => {
                *target = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn slot(&self, slot: usize) -> Option<&Value> {
        self.slots.get(slot)
    }

    pub(crate) fn set_slot(&mut self, slot: usize, value: Value) -> bool {
        match self.slots.get_mut(slot) {
            Some(target) => {
                *target = value;
                true
            }
            None => false,
        }
    }
}

/// Shared handle to a class instance
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Instance>>);

impl ObjectRef {
    /// Wrap an instance
    pub fn new(instance: Instance) -> Self {
        Self(Arc::new(RwLock::new(instance)))
    }

    /// Lock for reading
    pub fn read(&self) -> RwLockReadGuard<'_, Instance> {
        self.0.read()
    }

    /// Lock for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, Instance> {
        self.0.write()
    }

    /// Concrete type id of the instance
    pub fn type_id(&self) -> TypeId {
        self.0.read().ty.id()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.read().type_descriptor().name())
    }
}

// ============================================================================
// Proxies
// ============================================================================

/// Proxy call handler: method name and arguments
pub type ProxyHandler = Arc<dyn Fn(&str, &[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// Dynamically built implementation of a set of interfaces
pub struct Proxy {
    interfaces: Vec<TypeId>,
    handler: ProxyHandler,
}

impl Proxy {
    /// Build a proxy value over the given interfaces
    pub fn new<F>(interfaces: Vec<TypeId>, handler: F) -> Value
    where
        F: Fn(&str, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Value::Proxy(ProxyRef(Arc::new(Proxy {
            interfaces,
            handler: Arc::new(handler),
        })))
    }
}

/// Shared handle to a proxy
#[derive(Clone)]
pub struct ProxyRef(Arc<Proxy>);

impl ProxyRef {
    /// Interfaces the proxy implements
    pub fn interfaces(&self) -> &[TypeId] {
        &self.0.interfaces
    }

    /// Dispatch a call to the handler
    pub fn dispatch(&self, method: &str, args: &[Value]) -> Result<Value, BoxError> {
        (self.0.handler)(method, args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ProxyRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_kinds() {
        assert_eq!(Value::Int(1).primitive_kind(), Some(PrimitiveKind::Int));
        assert_eq!(Value::Char('a').primitive_kind(), Some(PrimitiveKind::Char));
        assert_eq!(Value::string("x").primitive_kind(), None);
        assert_eq!(Value::Null.primitive_kind(), None);
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::from(42), Value::Int(42));
        assert_ne!(Value::Int(42), Value::Long(42));
        assert_eq!(Value::from("a"), Value::string("a"));
    }

    #[test]
    fn test_proxy_dispatch_and_identity() {
        let proxy = Proxy::new(vec![TypeId(3)], |method, args| {
            Ok(Value::string(format!("{}/{}", method, args.len())))
        });
        let copy = proxy.clone();
        assert_eq!(proxy, copy);

        let handle = proxy.as_proxy().unwrap();
        assert_eq!(handle.interfaces(), &[TypeId(3)]);
        assert_eq!(handle.dispatch("run", &[Value::Null]).unwrap(), Value::string("run/1"));

        let other = Proxy::new(vec![TypeId(3)], |_, _| Ok(Value::Null));
        assert_ne!(proxy, other);
    }
}
