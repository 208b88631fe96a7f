//! Member handles
//!
//! A handle is a resolved reference to one method, field or constructor of
//! a type: the declaring type plus the member's index in it. Handles are
//! created fresh by every lookup and are cheap to clone; the member's
//! accessibility flag lives in the descriptor, so every handle to the same
//! member observes the same state.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::{
    AccessFlag, ConstructorDescriptor, FieldDescriptor, MethodDescriptor, Modifiers,
    TypeDescriptor, TypeId,
};

/// Behaviour shared by method, field and constructor handles
pub trait Member {
    /// Member name (`<init>` for constructors)
    fn name(&self) -> &str;

    /// Modifier flags
    fn modifiers(&self) -> Modifiers;

    /// Type that declares the member
    fn declaring_type(&self) -> &Arc<TypeDescriptor>;

    /// Accessibility flag of the member
    fn access_flag(&self) -> &AccessFlag;

    /// `Type.member` form used in errors and logs
    fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_type().name(), self.name())
    }

    /// Whether access checks are currently suppressed for the member
    fn is_accessible(&self) -> bool {
        self.access_flag().get()
    }

    /// Suppress (or restore) access checks for the member
    fn set_accessible(&self, accessible: bool) {
        self.access_flag().set(accessible)
    }

    /// Whether the member can be used right now: either accessible, or
    /// public on a public type
    fn is_reachable(&self) -> bool {
        self.is_accessible()
            || (self.modifiers().is_public() && self.declaring_type().is_public())
    }
}

/// Resolved method reference
#[derive(Clone)]
pub struct MethodHandle {
    declaring: Arc<TypeDescriptor>,
    index: usize,
}

impl MethodHandle {
    pub(crate) fn new(declaring: Arc<TypeDescriptor>, index: usize) -> Self {
        Self { declaring, index }
    }

    /// Method descriptor
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.declaring.methods[self.index]
    }

    /// Declared parameter types
    pub fn params(&self) -> &[TypeId] {
        self.descriptor().params()
    }

    /// Declared return type (`None` for void)
    pub fn return_type(&self) -> Option<TypeId> {
        self.descriptor().return_type()
    }

    /// Whether the method is static
    pub fn is_static(&self) -> bool {
        self.descriptor().modifiers().is_static()
    }

    /// Whether two handles refer to the same declared method
    pub fn same_member(&self, other: &MethodHandle) -> bool {
        Arc::ptr_eq(&self.declaring, &other.declaring) && self.index == other.index
    }
}

impl Member for MethodHandle {
    fn name(&self) -> &str {
        self.descriptor().name()
    }

    fn modifiers(&self) -> Modifiers {
        self.descriptor().modifiers()
    }

    fn declaring_type(&self) -> &Arc<TypeDescriptor> {
        &self.declaring
    }

    fn access_flag(&self) -> &AccessFlag {
        &self.descriptor().access
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodHandle({}/{})", self.qualified_name(), self.params().len())
    }
}

/// Resolved field reference
#[derive(Clone)]
pub struct FieldHandle {
    declaring: Arc<TypeDescriptor>,
    index: usize,
}

impl FieldHandle {
    pub(crate) fn new(declaring: Arc<TypeDescriptor>, index: usize) -> Self {
        Self { declaring, index }
    }

    /// Field descriptor
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.declaring.fields[self.index]
    }

    /// Declared value type
    pub fn field_type(&self) -> TypeId {
        self.descriptor().field_type()
    }

    /// Whether the field is static
    pub fn is_static(&self) -> bool {
        self.descriptor().modifiers().is_static()
    }

    pub(crate) fn slot(&self) -> usize {
        self.descriptor().slot
    }
}

impl Member for FieldHandle {
    fn name(&self) -> &str {
        self.descriptor().name()
    }

    fn modifiers(&self) -> Modifiers {
        self.descriptor().modifiers()
    }

    fn declaring_type(&self) -> &Arc<TypeDescriptor> {
        &self.declaring
    }

    fn access_flag(&self) -> &AccessFlag {
        &self.descriptor().access
    }
}

impl fmt::Debug for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldHandle({})", self.qualified_name())
    }
}

/// Resolved constructor reference (a constructor candidate)
#[derive(Clone)]
pub struct ConstructorHandle {
    declaring: Arc<TypeDescriptor>,
    index: usize,
}

impl ConstructorHandle {
    pub(crate) fn new(declaring: Arc<TypeDescriptor>, index: usize) -> Self {
        Self { declaring, index }
    }

    /// Constructor descriptor
    pub fn descriptor(&self) -> &ConstructorDescriptor {
        &self.declaring.constructors[self.index]
    }

    /// Declared parameter types, in declaration order
    pub fn params(&self) -> &[TypeId] {
        self.descriptor().params()
    }

    /// Position among the type's constructors
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Member for ConstructorHandle {
    fn name(&self) -> &str {
        "<init>"
    }

    fn modifiers(&self) -> Modifiers {
        self.descriptor().modifiers()
    }

    fn declaring_type(&self) -> &Arc<TypeDescriptor> {
        &self.declaring
    }

    fn access_flag(&self) -> &AccessFlag {
        &self.descriptor().access
    }
}

impl fmt::Debug for ConstructorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstructorHandle({}{:?})", self.qualified_name(), self.params())
    }
}
