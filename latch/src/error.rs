//! Error types for registration and static layout compilation.
//!
//! Everything here happens at startup and is fatal: a conflict or validation
//! failure indicates an extension-authoring bug that cannot be recovered from.
//! Post-startup lookups never produce these; a missing component is an
//! ordinary `None`.

use std::error::Error;
use std::fmt;

use crate::component::Identifier;

/// Two registrations claimed the same slot with incompatible declarations.
#[derive(Debug, Clone)]
pub enum ConflictError {
    /// An identifier was registered twice with two different value types.
    /// The original registration stays intact.
    KindType {
        id: Identifier,
        existing: &'static str,
        incoming: &'static str,
    },
    /// Two factories were declared for the same holder type and identifier.
    DuplicateFactory {
        holder: &'static str,
        id: Identifier,
        module: String,
        previous: String,
    },
}

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictError::KindType {
                id,
                existing,
                incoming,
            } => write!(
                f,
                "component '{id}' registered twice with two different value types: {existing}, {incoming}"
            ),
            ConflictError::DuplicateFactory {
                holder,
                id,
                module,
                previous,
            } => write!(
                f,
                "duplicate factory declarations for '{id}' on holder type {holder}: '{module}' and '{previous}'"
            ),
        }
    }
}

impl Error for ConflictError {}

/// A declaration that is malformed regardless of what else is registered.
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// The identifier string does not match `([a-z0-9_.-]+:)?[a-z0-9/._-]+`.
    Identifier { raw: String },
    /// A factory declared more than one holder-context argument.
    Signature {
        holder: &'static str,
        id: Identifier,
        module: String,
        arity: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Identifier { raw } => {
                write!(f, "malformed component identifier: '{raw}'")
            }
            ValidationError::Signature {
                holder,
                id,
                module,
                arity,
            } => write!(
                f,
                "factory for '{id}' on holder type {holder} declared by '{module}' takes {arity} \
                 holder-context arguments, expected zero or one"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Failure while freezing a static layout. Aborts system initialization.
#[derive(Debug, Clone)]
pub enum StartupError {
    Conflict(ConflictError),
    Validation(ValidationError),
    /// An identifier was declared to the layout compiler but never registered.
    Unregistered {
        holder: &'static str,
        id: Identifier,
        module: String,
    },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Conflict(e) => e.fmt(f),
            StartupError::Validation(e) => e.fmt(f),
            StartupError::Unregistered { holder, id, module } => write!(
                f,
                "factory for '{id}' on holder type {holder} declared by '{module}' references an \
                 identifier that was never registered"
            ),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StartupError::Conflict(e) => Some(e),
            StartupError::Validation(e) => Some(e),
            StartupError::Unregistered { .. } => None,
        }
    }
}

impl From<ConflictError> for StartupError {
    #[inline]
    fn from(value: ConflictError) -> Self {
        StartupError::Conflict(value)
    }
}

impl From<ValidationError> for StartupError {
    #[inline]
    fn from(value: ValidationError) -> Self {
        StartupError::Validation(value)
    }
}
