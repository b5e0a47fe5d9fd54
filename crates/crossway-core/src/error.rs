//! Guest-facing errors and foreign exception translation

use crate::adapter::Capability;
use crate::host::ForeignException;
use std::fmt;
use thiserror::Error;

/// Guest error class an error is raised as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// No such constant or namespace segment
    Name,
    /// A class exists but failed to load or initialise
    Load,
    /// No such method, or a missing capability
    NoMethod,
    /// Bad argument value
    Argument,
    /// Missing map key
    Key,
    /// Wrong value type
    Type,
    /// Index out of range
    Index,
    /// Iteration past the end
    StopIteration,
    /// Stream failure
    Io,
    /// Any other foreign exception
    Foreign,
}

impl ErrorCategory {
    /// Guest class name for this category
    pub fn guest_class(self) -> &'static str {
        match self {
            ErrorCategory::Name => "NameError",
            ErrorCategory::Load => "LoadError",
            ErrorCategory::NoMethod => "NoMethodError",
            ErrorCategory::Argument => "ArgumentError",
            ErrorCategory::Key => "KeyError",
            ErrorCategory::Type => "TypeError",
            ErrorCategory::Index => "IndexError",
            ErrorCategory::StopIteration => "StopIteration",
            ErrorCategory::Io => "IOError",
            ErrorCategory::Foreign => "NativeException",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.guest_class())
    }
}

/// Errors raised at the guest boundary
#[derive(Debug, Clone, Error)]
pub enum GuestError {
    /// No such name at this level
    #[error("uninitialized constant {name}")]
    NotFound {
        /// Name that was looked up
        name: String,
    },

    /// A matching foreign class exists but failed to load
    #[error("failed to load {name}: {cause}")]
    Load {
        /// Class name that was looked up
        name: String,
        /// Host failure
        cause: ForeignException,
    },

    /// Protocol method invoked on a proxy whose class lacks the capability
    #[error("undefined method '{method}' for {class}: requires the {capability} capability")]
    Adapter {
        /// Receiver's foreign class name
        class: String,
        /// Protocol method name
        method: String,
        /// Capability that supplies the method
        capability: Capability,
    },

    /// No such method
    #[error("undefined method '{method}' for {receiver}")]
    NoMethod {
        /// Receiver description
        receiver: String,
        /// Method name
        method: String,
    },

    /// Foreign exception raised during a delegated call
    #[error("{exception}")]
    Foreign {
        /// Guest category the exception maps to
        category: ErrorCategory,
        /// Original foreign exception
        exception: ForeignException,
    },

    /// Bad argument
    #[error("{0}")]
    Argument(String),

    /// Missing key
    #[error("key not found: {0}")]
    Key(String),

    /// Wrong value type
    #[error("{0}")]
    Type(String),

    /// Index out of range
    #[error("{0}")]
    Index(String),

    /// Stream failure
    #[error("{0}")]
    Io(String),
}

impl GuestError {
    /// Guest category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            GuestError::NotFound { .. } => ErrorCategory::Name,
            GuestError::Load { .. } => ErrorCategory::Load,
            GuestError::Adapter { .. } | GuestError::NoMethod { .. } => ErrorCategory::NoMethod,
            GuestError::Foreign { category, .. } => *category,
            GuestError::Argument(_) => ErrorCategory::Argument,
            GuestError::Key(_) => ErrorCategory::Key,
            GuestError::Type(_) => ErrorCategory::Type,
            GuestError::Index(_) => ErrorCategory::Index,
            GuestError::Io(_) => ErrorCategory::Io,
        }
    }

    /// Check whether a caller may retry after fixing the environment
    ///
    /// Only load failures qualify; the classpath may be repaired and the
    /// cached outcome invalidated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GuestError::Load { .. })
    }

    /// The wrapped foreign exception, if any
    pub fn foreign_exception(&self) -> Option<&ForeignException> {
        match self {
            GuestError::Load { cause, .. } => Some(cause),
            GuestError::Foreign { exception, .. } => Some(exception),
            _ => None,
        }
    }

    /// Shorthand for an arity mismatch
    pub fn arity(method: &str, given: usize, expected: &str) -> Self {
        GuestError::Argument(format!(
            "wrong number of arguments for {} (given {}, expected {})",
            method, given, expected
        ))
    }
}

/// Result type for guest-facing operations
pub type GuestResult<T> = Result<T, GuestError>;

/// Maps foreign exceptions onto guest error categories
///
/// Rules are matched against the exception's foreign ancestry, most specific
/// first; an exception matching no rule keeps [`ErrorCategory::Foreign`].
/// Translation always wraps: the original exception is carried unchanged.
#[derive(Debug, Clone)]
pub struct ErrorTranslator {
    rules: Vec<(String, ErrorCategory)>,
}

impl ErrorTranslator {
    /// Create a translator with no rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a translator with the JDK mapping
    pub fn new() -> Self {
        let mut translator = Self::empty();
        for (class, category) in [
            ("java.lang.IllegalArgumentException", ErrorCategory::Argument),
            ("java.lang.IndexOutOfBoundsException", ErrorCategory::Index),
            ("java.util.NoSuchElementException", ErrorCategory::StopIteration),
            ("java.lang.ClassCastException", ErrorCategory::Type),
            ("java.lang.NullPointerException", ErrorCategory::Type),
            ("java.io.IOException", ErrorCategory::Io),
            ("java.lang.NoSuchMethodError", ErrorCategory::NoMethod),
            ("java.lang.ExceptionInInitializerError", ErrorCategory::Load),
            ("java.lang.NoClassDefFoundError", ErrorCategory::Load),
        ] {
            translator.add_rule(class, category);
        }
        translator
    }

    /// Add a rule; later rules are consulted after earlier ones
    pub fn add_rule(&mut self, foreign_class: &str, category: ErrorCategory) {
        self.rules.push((foreign_class.to_string(), category));
    }

    /// Category for an exception with the given foreign ancestry
    ///
    /// `ancestry` lists the exception class and all its supertypes; when the
    /// exception object is unavailable it may hold just the class name.
    pub fn categorize(&self, ancestry: &[String]) -> ErrorCategory {
        self.rules
            .iter()
            .find(|(class, _)| ancestry.iter().any(|a| a == class))
            .map_or(ErrorCategory::Foreign, |(_, category)| *category)
    }

    /// Wrap a foreign exception raised by a delegated call
    pub fn translate(&self, exception: ForeignException, ancestry: &[String]) -> GuestError {
        let category = if ancestry.is_empty() {
            self.categorize(std::slice::from_ref(&exception.class_name))
        } else {
            self.categorize(ancestry)
        };
        GuestError::Foreign {
            category,
            exception,
        }
    }

    /// Wrap a class loading failure
    pub fn translate_load(&self, name: &str, exception: ForeignException) -> GuestError {
        tracing::warn!(target: "crossway::resolver", class = name, error = %exception, "class failed to load");
        GuestError::Load {
            name: name.to_string(),
            cause: exception,
        }
    }
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ancestry(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_translate_by_ancestry() {
        let translator = ErrorTranslator::new();
        let exception = ForeignException::with_message("java.lang.NumberFormatException", "x");
        let err = translator.translate(
            exception.clone(),
            &ancestry(&[
                "java.lang.NumberFormatException",
                "java.lang.IllegalArgumentException",
                "java.lang.RuntimeException",
            ]),
        );
        assert_eq!(err.category(), ErrorCategory::Argument);
        assert_eq!(err.foreign_exception(), Some(&exception));
        assert_eq!(err.to_string(), "java.lang.NumberFormatException: x");
    }

    #[test]
    fn test_unmapped_stays_foreign() {
        let translator = ErrorTranslator::new();
        let err = translator.translate(
            ForeignException::new("java.lang.IllegalStateException", None),
            &[],
        );
        assert_eq!(err.category(), ErrorCategory::Foreign);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_load_errors_are_retryable() {
        let translator = ErrorTranslator::new();
        let err = translator.translate_load(
            "BadStaticInit",
            ForeignException::with_message("java.lang.ExceptionInInitializerError", "boom"),
        );
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Load);
        assert_eq!(err.category().guest_class(), "LoadError");
    }

    #[test]
    fn test_custom_rule() {
        let mut translator = ErrorTranslator::empty();
        translator.add_rule("com.example.Oops", ErrorCategory::Key);
        assert_eq!(translator.categorize(&ancestry(&["com.example.Oops"])), ErrorCategory::Key);
        assert_eq!(translator.categorize(&ancestry(&["java.lang.Exception"])), ErrorCategory::Foreign);
    }

    #[test]
    fn test_adapter_error_names_capability() {
        let err = GuestError::Adapter {
            class: "com.example.Widget".to_string(),
            method: "each".to_string(),
            capability: Capability::Iterable,
        };
        assert!(err.to_string().contains("Iterable"));
        assert_eq!(err.category(), ErrorCategory::NoMethod);
    }
}
