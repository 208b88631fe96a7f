//! Error types for member resolution and invocation
//!
//! Every failure surfaced by the engine is a [`ReflectError`]. Failures that
//! happen *inside* a call (bad arguments, unreachable members, a missing
//! receiver, or an error raised by the callee itself) are carried as a
//! [`CallFailure`] so the original cause stays available through
//! [`std::error::Error::source`].

use crate::coerce::CoercionError;

/// Error raised by native method and constructor bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for engine operations
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Engine error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    /// No type is registered under the name
    #[error("Type not found: {name}")]
    TypeNotFound {
        /// Requested type name
        name: String,
    },

    /// No member matches the name (and signature, for methods)
    #[error("Member not found: {type_name}.{member}")]
    MemberNotFound {
        /// Type the lookup was performed on
        type_name: String,
        /// Member name, with signature where one was requested
        member: String,
    },

    /// The permission store refused the operation
    #[error("Access denied on {type_name}: {action}")]
    AccessDenied {
        /// Type the operation targeted
        type_name: String,
        /// What was refused
        action: String,
    },

    /// A method or constructor call failed
    #[error("Error invoking {member}: {cause}")]
    Invocation {
        /// Qualified member name
        member: String,
        /// Underlying failure
        #[source]
        cause: CallFailure,
    },

    /// The type cannot be instantiated at all
    #[error("Cannot instantiate {type_name}: {reason}")]
    Instantiation {
        /// Type that was asked for an instance
        type_name: String,
        /// Structural reason
        reason: String,
    },

    /// A field read or write failed
    #[error("Error accessing field {field}: {cause}")]
    FieldAccess {
        /// Qualified field name
        field: String,
        /// Underlying failure
        #[source]
        cause: CallFailure,
    },

    /// A string value could not be converted into the declared type
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// A type definition was rejected by the registry
    #[error("Registration error: {0}")]
    Registration(String),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ReflectError {
    pub(crate) fn type_not_found(name: impl Into<String>) -> Self {
        ReflectError::TypeNotFound { name: name.into() }
    }

    pub(crate) fn member_not_found(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        ReflectError::MemberNotFound {
            type_name: type_name.into(),
            member: member.into(),
        }
    }

    /// The call failure behind an invocation or field error, if any
    pub fn call_failure(&self) -> Option<&CallFailure> {
        match self {
            ReflectError::Invocation { cause, .. } | ReflectError::FieldAccess { cause, .. } => {
                Some(cause)
            }
            _ => None,
        }
    }

    /// The error raised by the callee, if the failure came from inside the call
    pub fn thrown(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self.call_failure()? {
            CallFailure::Thrown(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Failure raised while performing a call or field access
#[derive(Debug, thiserror::Error)]
pub enum CallFailure {
    /// Wrong number or shape of arguments, or a receiver of the wrong type
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// The member is not reachable without elevated access
    #[error("{member} is not accessible")]
    IllegalAccess {
        /// Qualified member name
        member: String,
    },

    /// An instance member was used without a receiver
    #[error("no receiver for instance member")]
    NullInstance,

    /// The callee itself failed
    #[error("callee raised: {0}")]
    Thrown(#[source] BoxError),
}

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A permission value could not be parsed
    #[error("Invalid permission value for {key}: {value}")]
    InvalidPermission {
        /// Config key the value belongs to
        key: String,
        /// Offending value
        value: String,
    },
}
