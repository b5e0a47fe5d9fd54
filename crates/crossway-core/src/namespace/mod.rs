//! Namespace resolution
//!
//! Dotted names and symbolic constant chains resolve through one
//! [`NamespaceResolver`] into packages or classes. Every outcome, failures
//! included, is cached on the parent [`PackageHandle`].

pub mod import;
pub mod package;
pub mod path;
pub mod resolver;

pub use import::ImportScope;
pub use package::PackageHandle;
pub use path::{decode_camel, encode_camel, guest_class_name, NamespacePath, PathError};
pub use resolver::NamespaceResolver;

use crate::error::{GuestError, GuestResult};
use crate::host::ForeignException;
use crate::proxy::ProxyClass;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Host failure recorded for a name that exists but does not load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    /// Fully-qualified name that failed
    pub name: String,
    /// Host exception
    pub exception: ForeignException,
}

/// Result of resolving one segment
#[derive(Clone)]
pub enum ResolutionOutcome {
    /// A package, possibly implicit
    Package(Arc<PackageHandle>),
    /// A loadable class
    Class(Arc<ProxyClass>),
    /// No such name at this level
    NotFound,
    /// A matching class exists but failed to load or initialise
    LoadError(LoadFailure),
}

impl ResolutionOutcome {
    /// Check for a package
    pub fn is_package(&self) -> bool {
        matches!(self, ResolutionOutcome::Package(_))
    }

    /// Check for a class
    pub fn is_class(&self) -> bool {
        matches!(self, ResolutionOutcome::Class(_))
    }

    /// Check for a negative lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolutionOutcome::NotFound)
    }

    /// Check for a load failure
    pub fn is_load_error(&self) -> bool {
        matches!(self, ResolutionOutcome::LoadError(_))
    }

    /// Package handle, if this is a package
    pub fn as_package(&self) -> Option<&Arc<PackageHandle>> {
        match self {
            ResolutionOutcome::Package(p) => Some(p),
            _ => None,
        }
    }

    /// Class handle, if this is a class
    pub fn as_class(&self) -> Option<&Arc<ProxyClass>> {
        match self {
            ResolutionOutcome::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Raise failures at the guest boundary
    ///
    /// `name` is reported in the `NotFound` error.
    pub fn into_value(self, name: &str) -> GuestResult<Value> {
        match self {
            ResolutionOutcome::Package(p) => Ok(Value::Package(p)),
            ResolutionOutcome::Class(c) => Ok(Value::Class(c)),
            ResolutionOutcome::NotFound => Err(GuestError::NotFound {
                name: name.to_string(),
            }),
            ResolutionOutcome::LoadError(failure) => Err(GuestError::Load {
                name: failure.name,
                cause: failure.exception,
            }),
        }
    }

    /// Short label for logs and the CLI
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionOutcome::Package(_) => "package",
            ResolutionOutcome::Class(_) => "class",
            ResolutionOutcome::NotFound => "not found",
            ResolutionOutcome::LoadError(_) => "load error",
        }
    }
}

impl PartialEq for ResolutionOutcome {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ResolutionOutcome::Package(a), ResolutionOutcome::Package(b)) => Arc::ptr_eq(a, b),
            (ResolutionOutcome::Class(a), ResolutionOutcome::Class(b)) => Arc::ptr_eq(a, b),
            (ResolutionOutcome::NotFound, ResolutionOutcome::NotFound) => true,
            (ResolutionOutcome::LoadError(a), ResolutionOutcome::LoadError(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionOutcome::Package(p) => f.debug_tuple("Package").field(&p.path().to_dotted()).finish(),
            ResolutionOutcome::Class(c) => f.debug_tuple("Class").field(&c.name()).finish(),
            ResolutionOutcome::NotFound => write!(f, "NotFound"),
            ResolutionOutcome::LoadError(failure) => {
                f.debug_tuple("LoadError").field(&failure.exception.to_string()).finish()
            }
        }
    }
}
