//! Access scope guard
//!
//! Runs an operation on a member with access checks suppressed for the
//! duration of the operation, when that is allowed:
//!
//! - its modifiers are exactly `PUBLIC`,
//! - the permission store grants `SUPPRESS_ACCESS_CHECKS` on the declaring
//!   type.
//!
//! Otherwise the operation runs as-is and fails on its own if the member
//! is unreachable. An elevation is one open scope on the member's
//! [`AccessFlag`]; the scope closes when its token drops (on success, on
//! error and on panic), leaving the member as accessible as it was before.
//! Scopes never hold a lock across the operation, so elevated calls may
//! re-enter the engine on any member from any thread.

use crate::descriptor::AccessFlag;
use crate::handle::Member;
use crate::permissions::{PermissionStore, ReflectionPermission};
use crate::value::Value;

/// One open elevation on a member, closed on drop
struct AccessScope<'a> {
    flag: &'a AccessFlag,
}

impl<'a> AccessScope<'a> {
    fn open(flag: &'a AccessFlag) -> Self {
        flag.elevate();
        Self { flag }
    }
}

impl Drop for AccessScope<'_> {
    fn drop(&mut self) {
        self.flag.release();
        tracing::trace!(open = self.flag.elevations(), "access scope closed");
    }
}

/// Run `operation` with the member's access checks suppressed if the member
/// qualifies for elevation (see the module docs)
pub fn with_elevated_access<M, T, F>(
    permissions: &PermissionStore,
    member: &M,
    instance: Option<&Value>,
    operation: F,
) -> T
where
    M: Member + ?Sized,
    F: FnOnce(&M, Option<&Value>) -> T,
{
    if !member.modifiers().is_exactly_public() {
        if !member.is_accessible() {
            tracing::debug!(member = %member.qualified_name(), "not exactly public, running without elevation");
        }
        return operation(member, instance);
    }
    let declaring = member.declaring_type().name();
    if !permissions.check(declaring, ReflectionPermission::SUPPRESS_ACCESS_CHECKS) {
        tracing::debug!(member = %member.qualified_name(), "elevation denied by policy");
        return operation(member, instance);
    }

    // Always opened: an apparent grant may be another thread's scope.
    let _scope = AccessScope::open(member.access_flag());
    tracing::trace!(member = %member.qualified_name(), "access elevated");
    operation(member, instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FieldDefinition, TypeDefinition};
    use crate::descriptor::Modifiers;
    use crate::handle::FieldHandle;
    use crate::registry::TypeRegistry;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Arc;

    fn fields() -> (FieldHandle, FieldHandle) {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                TypeDefinition::class("vault.Hidden")
                    .modifiers(Modifiers::empty())
                    .field(FieldDefinition::new("open", "int"))
                    .field(FieldDefinition::new("closed", "int").modifiers(Modifiers::PRIVATE)),
            )
            .unwrap();
        let ty = registry.resolve("vault.Hidden").unwrap();
        (FieldHandle::new(Arc::clone(&ty), 0), FieldHandle::new(ty, 1))
    }

    #[test]
    fn test_elevates_and_restores_on_success() {
        let (open, _) = fields();
        let store = PermissionStore::new();
        assert!(!open.is_reachable());

        let seen = with_elevated_access(&store, &open, None, |m, _| m.is_reachable());
        assert!(seen);
        assert!(!open.is_accessible());
    }

    #[test]
    fn test_restores_on_error() {
        let (open, _) = fields();
        let store = PermissionStore::new();

        let result: Result<(), &str> = with_elevated_access(&store, &open, None, |_, _| Err("boom"));
        assert!(result.is_err());
        assert!(!open.is_accessible());
    }

    #[test]
    fn test_restores_on_panic() {
        let (open, _) = fields();
        let store = PermissionStore::new();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            with_elevated_access(&store, &open, None, |_, _| panic!("callee panicked"))
        }));
        assert!(outcome.is_err());
        assert!(!open.is_accessible());
    }

    #[test]
    fn test_private_member_not_elevated() {
        let (_, closed) = fields();
        let store = PermissionStore::new();

        let seen = with_elevated_access(&store, &closed, None, |m, _| m.is_accessible());
        assert!(!seen);
    }

    #[test]
    fn test_already_accessible_left_alone() {
        let (open, _) = fields();
        let store = PermissionStore::new();
        open.set_accessible(true);

        with_elevated_access(&store, &open, None, |m, _| assert!(m.is_accessible()));
        assert!(open.is_accessible());
        open.set_accessible(false);
    }

    #[test]
    fn test_policy_blocks_elevation() {
        let (open, _) = fields();
        let mut store = PermissionStore::new();
        store
            .set_type("vault.Hidden", ReflectionPermission::PUBLIC_MEMBERS)
            .unwrap();

        let seen = with_elevated_access(&store, &open, None, |m, _| m.is_accessible());
        assert!(!seen);
    }

    #[test]
    fn test_nested_scopes_restore_outer_state() {
        let (open, _) = fields();
        let store = PermissionStore::new();

        with_elevated_access(&store, &open, None, |outer, _| {
            with_elevated_access(&store, outer, None, |inner, _| {
                assert_eq!(inner.access_flag().elevations(), 2);
            });
            assert!(outer.is_accessible());
        });
        assert!(!open.is_accessible());
    }

    #[test]
    fn test_grant_changed_inside_scope_survives_close() {
        let (open, _) = fields();
        let store = PermissionStore::new();

        with_elevated_access(&store, &open, None, |m, _| m.set_accessible(true));
        assert!(open.is_accessible());
        assert_eq!(open.access_flag().elevations(), 0);
        open.set_accessible(false);
    }
}
