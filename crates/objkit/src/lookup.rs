//! Member lookup
//!
//! Public-surface queries see every public member of the type and its
//! supertypes (the type first, then its superclass chain, then every
//! implemented interface). Declared-surface queries see members of any
//! visibility, but only those the type itself declares. Nothing is
//! cached: every call walks the descriptors again and returns fresh
//! handles.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::descriptor::{TypeDescriptor, TypeId};
use crate::error::{ReflectError, ReflectResult};
use crate::handle::{ConstructorHandle, FieldHandle, MethodHandle};
use crate::permissions::{PermissionStore, ReflectionPermission};
use crate::registry::TypeRegistry;

/// Which members a query can see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupScope {
    /// Public members, inherited ones included
    #[default]
    Public,
    /// Members declared directly on the type, any visibility
    Declared,
}

impl LookupScope {
    fn permission(self) -> ReflectionPermission {
        match self {
            LookupScope::Public => ReflectionPermission::PUBLIC_MEMBERS,
            LookupScope::Declared => ReflectionPermission::DECLARED_MEMBERS,
        }
    }

    fn action(self) -> &'static str {
        match self {
            LookupScope::Public => "enumerate public members",
            LookupScope::Declared => "enumerate declared members",
        }
    }
}

/// Member lookup over a registry, subject to a permission store
#[derive(Clone, Copy)]
pub struct MemberLookup<'a> {
    registry: &'a TypeRegistry,
    permissions: &'a PermissionStore,
}

impl<'a> MemberLookup<'a> {
    /// Create a lookup
    pub fn new(registry: &'a TypeRegistry, permissions: &'a PermissionStore) -> Self {
        Self {
            registry,
            permissions,
        }
    }

    fn allow(&self, ty: &TypeDescriptor, scope: LookupScope) -> ReflectResult<()> {
        self.permissions
            .require(ty.name(), scope.permission(), scope.action())
    }

    /// The type followed by its superclass chain, then every interface
    /// reachable from any of them, each type once
    pub fn hierarchy(&self, ty: &Arc<TypeDescriptor>) -> Vec<Arc<TypeDescriptor>> {
        let mut chain = Vec::new();
        let mut current = Some(Arc::clone(ty));
        while let Some(next) = current {
            current = next
                .superclass()
                .and_then(|id| self.registry.get(id))
                .cloned();
            chain.push(next);
        }

        let mut seen: FxHashSet<TypeId> = chain.iter().map(|t| t.id()).collect();
        let mut pending: VecDeque<TypeId> = chain
            .iter()
            .flat_map(|t| t.interfaces().iter().copied())
            .collect();
        while let Some(id) = pending.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(iface) = self.registry.get(id) {
                pending.extend(iface.interfaces().iter().copied());
                chain.push(Arc::clone(iface));
            }
        }
        chain
    }

    fn signature(&self, name: &str, params: &[TypeId]) -> String {
        let params: Vec<&str> = params.iter().map(|&p| self.registry.name_of(p)).collect();
        format!("{}({})", name, params.join(", "))
    }

    // ===== Methods =====

    /// Public method with exactly these parameter types, inherited included
    pub fn find_method(
        &self,
        ty: &Arc<TypeDescriptor>,
        name: &str,
        params: &[TypeId],
    ) -> ReflectResult<MethodHandle> {
        self.allow(ty, LookupScope::Public)?;
        self.hierarchy(ty)
            .into_iter()
            .find_map(|owner| {
                owner
                    .methods()
                    .iter()
                    .position(|m| m.modifiers().is_public() && m.signature_matches(name, params))
                    .map(|index| MethodHandle::new(owner, index))
            })
            .ok_or_else(|| ReflectError::member_not_found(ty.name(), self.signature(name, params)))
    }

    /// Method declared on the type itself, any visibility
    pub fn find_declared_method(
        &self,
        ty: &Arc<TypeDescriptor>,
        name: &str,
        params: &[TypeId],
    ) -> ReflectResult<MethodHandle> {
        self.allow(ty, LookupScope::Declared)?;
        ty.methods()
            .iter()
            .position(|m| m.signature_matches(name, params))
            .map(|index| MethodHandle::new(Arc::clone(ty), index))
            .ok_or_else(|| ReflectError::member_not_found(ty.name(), self.signature(name, params)))
    }

    /// Every method visible in the scope. On the public surface an
    /// overridden method appears once, as its most-derived declaration.
    pub fn find_all_methods(
        &self,
        ty: &Arc<TypeDescriptor>,
        scope: LookupScope,
    ) -> ReflectResult<Vec<MethodHandle>> {
        self.allow(ty, scope)?;
        let handles = match scope {
            LookupScope::Declared => (0..ty.methods().len())
                .map(|index| MethodHandle::new(Arc::clone(ty), index))
                .collect(),
            LookupScope::Public => {
                let mut handles: Vec<MethodHandle> = Vec::new();
                for owner in self.hierarchy(ty) {
                    for (index, method) in owner.methods().iter().enumerate() {
                        if !method.modifiers().is_public() {
                            continue;
                        }
                        let overridden = handles
                            .iter()
                            .any(|h| h.descriptor().signature_matches(method.name(), method.params()));
                        if !overridden {
                            handles.push(MethodHandle::new(Arc::clone(&owner), index));
                        }
                    }
                }
                handles
            }
        };
        Ok(handles)
    }

    /// Public methods with the given name, inherited included
    pub fn methods_named(
        &self,
        ty: &Arc<TypeDescriptor>,
        name: &str,
    ) -> ReflectResult<Vec<MethodHandle>> {
        Ok(self
            .find_all_methods(ty, LookupScope::Public)?
            .into_iter()
            .filter(|h| h.descriptor().name() == name)
            .collect())
    }

    // ===== Fields =====

    /// Public field by name, inherited included
    pub fn find_field(&self, ty: &Arc<TypeDescriptor>, name: &str) -> ReflectResult<FieldHandle> {
        self.allow(ty, LookupScope::Public)?;
        self.hierarchy(ty)
            .into_iter()
            .find_map(|owner| {
                owner
                    .fields()
                    .iter()
                    .position(|f| f.modifiers().is_public() && f.name() == name)
                    .map(|index| FieldHandle::new(owner, index))
            })
            .ok_or_else(|| ReflectError::member_not_found(ty.name(), name))
    }

    /// Field declared on the type itself, any visibility
    pub fn find_declared_field(
        &self,
        ty: &Arc<TypeDescriptor>,
        name: &str,
    ) -> ReflectResult<FieldHandle> {
        self.allow(ty, LookupScope::Declared)?;
        ty.fields()
            .iter()
            .position(|f| f.name() == name)
            .map(|index| FieldHandle::new(Arc::clone(ty), index))
            .ok_or_else(|| ReflectError::member_not_found(ty.name(), name))
    }

    /// Every field visible in the scope
    pub fn find_all_fields(
        &self,
        ty: &Arc<TypeDescriptor>,
        scope: LookupScope,
    ) -> ReflectResult<Vec<FieldHandle>> {
        self.allow(ty, scope)?;
        let handles = match scope {
            LookupScope::Declared => (0..ty.fields().len())
                .map(|index| FieldHandle::new(Arc::clone(ty), index))
                .collect(),
            LookupScope::Public => self
                .hierarchy(ty)
                .into_iter()
                .flat_map(|owner| {
                    (0..owner.fields().len())
                        .filter(|&index| owner.fields()[index].modifiers().is_public())
                        .map(|index| FieldHandle::new(Arc::clone(&owner), index))
                        .collect::<Vec<_>>()
                })
                .collect(),
        };
        Ok(handles)
    }

    // ===== Constructors =====

    /// Public constructors of the type, in declaration order
    pub fn public_constructors(
        &self,
        ty: &Arc<TypeDescriptor>,
    ) -> ReflectResult<Vec<ConstructorHandle>> {
        self.allow(ty, LookupScope::Public)?;
        Ok(ty
            .constructors()
            .iter()
            .enumerate()
            .filter(|(_, ctor)| ctor.modifiers().is_public())
            .map(|(index, _)| ConstructorHandle::new(Arc::clone(ty), index))
            .collect())
    }

    /// Public constructor with exactly these parameter types
    pub fn find_constructor(
        &self,
        ty: &Arc<TypeDescriptor>,
        params: &[TypeId],
    ) -> ReflectResult<ConstructorHandle> {
        self.public_constructors(ty)?
            .into_iter()
            .find(|ctor| ctor.params() == params)
            .ok_or_else(|| {
                ReflectError::member_not_found(ty.name(), self.signature("<init>", params))
            })
    }

    /// Constructor with exactly these parameter types, any visibility
    pub fn find_declared_constructor(
        &self,
        ty: &Arc<TypeDescriptor>,
        params: &[TypeId],
    ) -> ReflectResult<ConstructorHandle> {
        self.allow(ty, LookupScope::Declared)?;
        ty.constructors()
            .iter()
            .position(|ctor| ctor.params() == params)
            .map(|index| ConstructorHandle::new(Arc::clone(ty), index))
            .ok_or_else(|| {
                ReflectError::member_not_found(ty.name(), self.signature("<init>", params))
            })
    }
}
