//! Type and Member Descriptors
//!
//! Descriptors are the registry's record of a reflectable type: its name,
//! kind, modifiers, hierarchy, and the constructors, methods and fields it
//! declares. Descriptors are built once by [`TypeRegistry::register`] and
//! are immutable afterwards, apart from each member's accessibility flag
//! and the type's static field storage.
//!
//! [`TypeRegistry::register`]: crate::registry::TypeRegistry::register

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::BoxError;
use crate::value::{ObjectRef, Value};

// ============================================================================
// Identifiers and kinds
// ============================================================================

/// Dense index of a type in its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    /// Registry index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Primitive type kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `char`
    Char,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl PrimitiveKind {
    /// Every primitive kind, in registration order
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Type name of the primitive
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Zero value used for uninitialised slots of this type
    pub fn default_value(self) -> Value {
        match self {
            PrimitiveKind::Boolean => Value::Bool(false),
            PrimitiveKind::Byte => Value::Byte(0),
            PrimitiveKind::Char => Value::Char('\0'),
            PrimitiveKind::Short => Value::Short(0),
            PrimitiveKind::Int => Value::Int(0),
            PrimitiveKind::Long => Value::Long(0),
            PrimitiveKind::Float => Value::Float(0.0),
            PrimitiveKind::Double => Value::Double(0.0),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Primitive value type
    Primitive(PrimitiveKind),
    /// Class type
    Class,
    /// Interface type
    Interface,
    /// Enumeration type
    Enum,
}

bitflags! {
    /// Modifier flags for types and members
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u16 {
        /// Public visibility
        const PUBLIC = 0x0001;
        /// Private visibility
        const PRIVATE = 0x0002;
        /// Protected visibility
        const PROTECTED = 0x0004;
        /// Static member
        const STATIC = 0x0008;
        /// Final type or member
        const FINAL = 0x0010;
        /// Abstract type or method
        const ABSTRACT = 0x0400;
    }
}

impl Modifiers {
    /// Public and nothing else
    pub fn is_exactly_public(self) -> bool {
        self == Modifiers::PUBLIC
    }

    /// Public visibility, possibly with other modifiers
    pub fn is_public(self) -> bool {
        self.contains(Modifiers::PUBLIC)
    }

    /// Static member
    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }
}

// ============================================================================
// Accessibility
// ============================================================================

/// Accessibility state of a single member.
///
/// The flag is process-wide state shared by every handle to the member. It
/// combines the grant set through `set_accessible` with a count of open
/// elevation scopes; each scope adds and removes exactly one, so scopes on
/// different threads never undo each other and no lock is held while the
/// elevated operation runs.
pub struct AccessFlag {
    granted: AtomicBool,
    elevations: AtomicUsize,
}

impl AccessFlag {
    /// Create a flag in the non-accessible state
    pub fn new() -> Self {
        Self {
            granted: AtomicBool::new(false),
            elevations: AtomicUsize::new(0),
        }
    }

    /// Current accessibility
    pub fn get(&self) -> bool {
        self.granted.load(Ordering::SeqCst) || self.elevations.load(Ordering::SeqCst) > 0
    }

    /// Overwrite the explicit grant. Open elevation scopes are unaffected.
    pub fn set(&self, accessible: bool) {
        self.granted.store(accessible, Ordering::SeqCst);
    }

    pub(crate) fn elevate(&self) {
        self.elevations.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        self.elevations.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of open elevation scopes
    pub fn elevations(&self) -> usize {
        self.elevations.load(Ordering::SeqCst)
    }
}

impl Default for AccessFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AccessFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessFlag")
            .field("granted", &self.granted.load(Ordering::SeqCst))
            .field("elevations", &self.elevations())
            .finish()
    }
}

// ============================================================================
// Native bodies
// ============================================================================

/// Method body: receiver (absent for static methods) and positional arguments
pub type MethodFn = Arc<dyn Fn(Option<&Value>, &[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// Constructor body that initialises a freshly allocated instance
pub type InitFn = Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<(), BoxError> + Send + Sync>;

/// Constructor body that produces the constructed value itself
pub type FactoryFn = Arc<dyn Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// How a constructor produces its value
#[derive(Clone)]
pub enum ConstructorBody {
    /// Initialise an allocated instance of the declaring type
    Init(InitFn),
    /// Produce the value directly (strings, boxed primitives)
    Factory(FactoryFn),
}

// ============================================================================
// Member descriptors
// ============================================================================

/// Method metadata and body
pub struct MethodDescriptor {
    pub(crate) name: String,
    pub(crate) params: Vec<TypeId>,
    pub(crate) return_type: Option<TypeId>,
    pub(crate) modifiers: Modifiers,
    pub(crate) declaring: TypeId,
    pub(crate) body: Option<MethodFn>,
    pub(crate) access: AccessFlag,
}

impl MethodDescriptor {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn params(&self) -> &[TypeId] {
        &self.params
    }

    /// Declared return type (`None` for void)
    pub fn return_type(&self) -> Option<TypeId> {
        self.return_type
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Declaring type
    pub fn declaring(&self) -> TypeId {
        self.declaring
    }

    /// Whether the method has a body (abstract methods do not)
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn signature_matches(&self, name: &str, params: &[TypeId]) -> bool {
        self.name == name && self.params == params
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("modifiers", &self.modifiers)
            .field("declaring", &self.declaring)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// Field metadata
#[derive(Debug)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) field_type: TypeId,
    pub(crate) modifiers: Modifiers,
    pub(crate) declaring: TypeId,
    /// Instance slot, or index into the declaring type's statics
    pub(crate) slot: usize,
    pub(crate) access: AccessFlag,
}

impl FieldDescriptor {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type
    pub fn field_type(&self) -> TypeId {
        self.field_type
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Declaring type
    pub fn declaring(&self) -> TypeId {
        self.declaring
    }
}

/// Constructor metadata and body
pub struct ConstructorDescriptor {
    pub(crate) params: Vec<TypeId>,
    pub(crate) modifiers: Modifiers,
    pub(crate) declaring: TypeId,
    pub(crate) body: ConstructorBody,
    pub(crate) access: AccessFlag,
}

impl ConstructorDescriptor {
    /// Declared parameter types, in declaration order
    pub fn params(&self) -> &[TypeId] {
        &self.params
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Declaring type
    pub fn declaring(&self) -> TypeId {
        self.declaring
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("params", &self.params)
            .field("modifiers", &self.modifiers)
            .field("declaring", &self.declaring)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Type descriptor
// ============================================================================

/// A registered type (the Type Identity handed out by the registry)
pub struct TypeDescriptor {
    pub(crate) id: TypeId,
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) modifiers: Modifiers,
    pub(crate) superclass: Option<TypeId>,
    pub(crate) interfaces: Vec<TypeId>,
    pub(crate) constructors: Vec<ConstructorDescriptor>,
    pub(crate) methods: Vec<MethodDescriptor>,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) enum_constants: Vec<String>,
    /// Instance field name to slot, inherited slots included
    pub(crate) slot_indices: FxHashMap<String, usize>,
    /// Initial value per instance slot
    pub(crate) slot_defaults: Vec<Value>,
    pub(crate) statics: RwLock<Vec<Value>>,
}

impl TypeDescriptor {
    /// Registry id
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package prefix (empty for builtins)
    pub fn package(&self) -> &str {
        self.name.rsplit_once('.').map_or("", |(package, _)| package)
    }

    /// Type kind
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Type-level modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether this is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_))
    }

    /// Primitive kind, for primitive types
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether this is an enumeration
    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    /// Whether this is an interface
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Interfaces and abstract classes cannot be instantiated
    pub fn is_abstract(&self) -> bool {
        self.is_interface() || self.modifiers.contains(Modifiers::ABSTRACT)
    }

    /// Whether the type itself is public
    pub fn is_public(&self) -> bool {
        self.modifiers.is_public()
    }

    /// Direct superclass
    pub fn superclass(&self) -> Option<TypeId> {
        self.superclass
    }

    /// Directly implemented (or extended, for interfaces) interfaces
    pub fn interfaces(&self) -> &[TypeId] {
        &self.interfaces
    }

    /// Declared constructors in declaration order
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// Declared methods in declaration order
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Enum constant names in ordinal order
    pub fn enum_constants(&self) -> &[String] {
        &self.enum_constants
    }

    /// Instance slot for a field name, inherited fields included
    pub fn slot_of(&self, field: &str) -> Option<usize> {
        self.slot_indices.get(field).copied()
    }

    pub(crate) fn read_static(&self, slot: usize) -> Option<Value> {
        self.statics.read().get(slot).cloned()
    }

    pub(crate) fn write_static(&self, slot: usize, value: Value) -> bool {
        match self.statics.write().get_mut(slot) {
            Some(target) => {
                *target = value;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("modifiers", &self.modifiers)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("constructors", &self.constructors.len())
            .field("methods", &self.methods.len())
            .field("fields", &self.fields.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
