//! Objkit
//!
//! Dynamic member resolution and invocation over a registry of type
//! descriptors:
//! - **Registry**: builtin and user types, resolved by fully-qualified name (`registry`)
//! - **Lookup**: public and declared members, inherited ones included (`lookup`)
//! - **Access**: scoped access elevation that always restores (`access`)
//! - **Invocation**: methods, constructors and fields with normalised errors (`invoke`)
//! - **Selection**: explicit and heuristic constructor matching (`select`)
//! - **Coercion**: string values into declared types, batch-tolerant (`coerce`)
//!
//! # Example
//!
//! ```rust,ignore
//! use objkit::{ConstructorDefinition, FieldDefinition, Reflector, Strategy, TypeDefinition, Value};
//!
//! let mut reflector = Reflector::new();
//! reflector.register(
//!     TypeDefinition::class("shop.Item")
//!         .field(FieldDefinition::new("name", "String"))
//!         .field(FieldDefinition::new("count", "int"))
//!         .constructor(ConstructorDefinition::init(&["String", "int"], |obj, args| {
//!             let mut obj = obj.write();
//!             obj.set("name", args[0].clone());
//!             obj.set("count", args[1].clone());
//!             Ok(())
//!         })),
//! )?;
//!
//! // Arguments may come in any order the heuristic can pair.
//! let item = reflector.instantiate_by_name(
//!     "shop.Item",
//!     &[Value::Int(3), Value::string("pen")],
//!     Strategy::Heuristic,
//! )?;
//! let count = reflector.get_field_by_name("shop.Item", "count", Some(&item))?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Runtime model
// ============================================================================

pub mod builtins;
pub mod definition;
pub mod descriptor;
pub mod handle;
pub mod registry;
pub mod value;

// ============================================================================
// Engine components
// ============================================================================

pub mod access;
pub mod coerce;
pub mod invoke;
pub mod lookup;
pub mod reflector;
pub mod select;

// ============================================================================
// Ambient
// ============================================================================

pub mod config;
pub mod error;
pub mod permissions;
pub mod tracing_config;

// ============================================================================
// Re-exports
// ============================================================================

pub use access::with_elevated_access;
pub use coerce::{
    boxed_equivalent, Coercer, CoercionError, CoercionFailure, CoercionReport, CoercionStatus,
};
pub use config::{PermissionConfig, ReflectConfig};
pub use definition::{ConstructorDefinition, FieldDefinition, MethodDefinition, TypeDefinition};
pub use descriptor::{
    AccessFlag, ConstructorBody, Modifiers, PrimitiveKind, TypeDescriptor, TypeId, TypeKind,
};
pub use error::{BoxError, CallFailure, ConfigError, ReflectError, ReflectResult};
pub use handle::{ConstructorHandle, FieldHandle, Member, MethodHandle};
pub use invoke::{AbstractMethodError, Invoker};
pub use lookup::{LookupScope, MemberLookup};
pub use permissions::{PackagePermissionRule, PermissionStore, ReflectionPermission};
pub use reflector::Reflector;
pub use registry::TypeRegistry;
pub use select::{ConstructorSelector, Selection, Strategy};
pub use tracing_config::{init_tracing, LogFormat};
pub use value::{EnumValue, Instance, ObjectRef, Proxy, ProxyRef, Value};
