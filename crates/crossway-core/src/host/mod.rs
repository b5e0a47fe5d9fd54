//! Host runtime capability
//!
//! The bridge never loads classes or runs foreign code itself. Everything it
//! needs from the host runtime goes through the [`HostRuntime`] trait:
//! - class-by-name resolution, distinguishing "absent" from "broken"
//! - reflective metadata (modifiers, annotations, supertypes, members)
//! - object construction and method invocation
//! - implementing a foreign interface with a bridge-side callback
//! - classpath augmentation
//!
//! [`memory::MemoryHost`] is a self-contained implementation with a JDK-like
//! class set, used by the tests and the CLI.

pub mod memory;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Identity of a foreign class inside the host runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForeignClassId(pub u64);

/// Identity of a foreign object inside the host runtime
///
/// The id is a non-owning reference: holding it does not keep the foreign
/// object alive. A host never reuses an id for a different object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// A value as the host runtime sees it
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Host null reference
    Null,
    /// Boolean primitive
    Bool(bool),
    /// Integral primitive (all widths collapse to i64)
    Int(i64),
    /// Floating point primitive
    Double(f64),
    /// Host string
    Str(String),
    /// Reference to a host object
    Object(ObjectId),
}

impl HostValue {
    /// Check if this value is the host null reference
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Get the object id, if this is an object reference
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            HostValue::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Get the integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Int(_) => "long",
            HostValue::Double(_) => "double",
            HostValue::Str(_) => "java.lang.String",
            HostValue::Object(_) => "object",
        }
    }
}

/// An exception raised by the host runtime
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignException {
    /// Fully-qualified class name of the exception
    pub class_name: String,
    /// Host message, absent when the exception was raised without one
    pub message: Option<String>,
    /// Captured stack trace, innermost frame first
    pub stack_trace: Vec<String>,
    /// The exception object itself, when the host exposes it
    pub object: Option<ObjectId>,
}

impl ForeignException {
    /// Create an exception without an exception object
    pub fn new(class_name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message,
            stack_trace: Vec::new(),
            object: None,
        }
    }

    /// Create an exception carrying a message
    pub fn with_message(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(class_name, Some(message.into()))
    }
}

impl fmt::Display for ForeignException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.class_name, message),
            None => write!(f, "{}", self.class_name),
        }
    }
}

/// Result of asking the host for a class by name
#[derive(Debug, Clone, PartialEq)]
pub enum ClassLookup {
    /// The class exists and is initialised
    Found(ForeignClassId),
    /// No class of that name is visible on the classpath
    Missing,
    /// A class of that name exists but failed to load, link or initialise
    Broken(ForeignException),
}

/// Java-style modifier bitset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(pub u32);

impl Modifiers {
    /// `public`
    pub const PUBLIC: u32 = 0x0001;
    /// `private`
    pub const PRIVATE: u32 = 0x0002;
    /// `protected`
    pub const PROTECTED: u32 = 0x0004;
    /// `static`
    pub const STATIC: u32 = 0x0008;
    /// `final`
    pub const FINAL: u32 = 0x0010;
    /// `interface`
    pub const INTERFACE: u32 = 0x0200;
    /// `abstract`
    pub const ABSTRACT: u32 = 0x0400;

    const KEYWORDS: [(&'static str, u32); 7] = [
        ("public", Self::PUBLIC),
        ("private", Self::PRIVATE),
        ("protected", Self::PROTECTED),
        ("static", Self::STATIC),
        ("final", Self::FINAL),
        ("interface", Self::INTERFACE),
        ("abstract", Self::ABSTRACT),
    ];

    /// Build a bitset from modifier keywords, ignoring unknown ones
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        let bits = keywords.iter().fold(0, |acc, kw| {
            acc | Self::KEYWORDS
                .iter()
                .find(|(name, _)| *name == kw.as_ref())
                .map_or(0, |(_, bit)| *bit)
        });
        Modifiers(bits)
    }

    /// Raw bits
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Check whether all bits of `flag` are set
    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Keywords for the set bits, in declaration order
    pub fn keywords(self) -> Vec<&'static str> {
        Self::KEYWORDS
            .iter()
            .filter(|(_, bit)| self.contains(*bit))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keywords().join(" "))
    }
}

/// Reflective description of one foreign method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    /// Method name
    pub name: String,
    /// Method modifiers
    pub modifiers: Modifiers,
    /// Parameter type names
    pub parameter_types: Vec<String>,
    /// Return type name, `None` for void
    pub return_type: Option<String>,
    /// Name of the class that declares the method
    pub declaring_class: String,
}

impl MethodInfo {
    /// Check if this is a static (class-level) method
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }
}

/// Reflective description of a foreign class
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForeignClassInfo {
    /// Fully-qualified dotted name (nested classes use `$`)
    pub name: String,
    /// Class modifiers
    pub modifiers: Modifiers,
    /// Superclass name, `None` for the root class and for interfaces
    pub superclass: Option<String>,
    /// Directly implemented (or extended, for interfaces) interface names
    pub interfaces: Vec<String>,
    /// Annotations present on the class, inherited ones included
    pub annotations: Vec<String>,
    /// Annotations declared directly on the class
    pub declared_annotations: Vec<String>,
    /// Methods declared directly on the class
    pub methods: Vec<MethodInfo>,
}

/// Bridge-side implementation of a foreign interface
///
/// The host calls back into this when foreign code invokes a method on an
/// object created by [`HostRuntime::implement_interface`].
pub trait ForeignCallback: Send + Sync {
    /// Handle a foreign invocation of `method`
    fn call(&self, method: &str, args: &[HostValue]) -> Result<HostValue, ForeignException>;
}

impl<F> ForeignCallback for F
where
    F: Fn(&str, &[HostValue]) -> Result<HostValue, ForeignException> + Send + Sync,
{
    fn call(&self, method: &str, args: &[HostValue]) -> Result<HostValue, ForeignException> {
        self(method, args)
    }
}

/// Outbound interface from the bridge to the host runtime
///
/// Implementations must be safe to call from several guest threads at once.
/// All calls are synchronous.
pub trait HostRuntime: Send + Sync {
    /// Resolve a class by fully-qualified dotted name
    fn load_class(&self, name: &str) -> ClassLookup;

    /// Describe a previously loaded class
    fn describe_class(&self, class: ForeignClassId) -> Result<ForeignClassInfo, ForeignException>;

    /// Check if the host has an explicit package object for `name`
    ///
    /// Hosts with implicit packages may always answer `false`.
    fn package_exists(&self, _name: &str) -> bool {
        false
    }

    /// Get the runtime class of an object
    fn class_of(&self, object: ObjectId) -> Result<ForeignClassId, ForeignException>;

    /// Check foreign-class membership of an object
    fn is_instance(&self, object: ObjectId, class: ForeignClassId) -> bool;

    /// Construct a new instance
    fn new_instance(
        &self,
        class: ForeignClassId,
        args: &[HostValue],
    ) -> Result<HostValue, ForeignException>;

    /// Invoke an instance method
    fn invoke(
        &self,
        target: ObjectId,
        method: &str,
        args: &[HostValue],
    ) -> Result<HostValue, ForeignException>;

    /// Invoke a static method
    fn invoke_static(
        &self,
        class: ForeignClassId,
        method: &str,
        args: &[HostValue],
    ) -> Result<HostValue, ForeignException>;

    /// Create a foreign object implementing `interface` whose methods call back
    /// into the bridge
    fn implement_interface(
        &self,
        interface: ForeignClassId,
        callback: Arc<dyn ForeignCallback>,
    ) -> Result<ObjectId, ForeignException>;

    /// Add a directory or archive to the locations classes are loaded from
    fn add_classpath_entry(&self, location: &Path) -> Result<(), ForeignException>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_from_keywords() {
        let mods = Modifiers::from_keywords(&["public", "final", "bogus"]);
        assert!(mods.contains(Modifiers::PUBLIC));
        assert!(mods.contains(Modifiers::FINAL));
        assert!(!mods.contains(Modifiers::STATIC));
        assert_eq!(mods.to_string(), "public final");
    }

    #[test]
    fn test_foreign_exception_display() {
        let with = ForeignException::with_message("java.lang.IllegalStateException", "boom");
        assert_eq!(with.to_string(), "java.lang.IllegalStateException: boom");

        let without = ForeignException::new("java.lang.NullPointerException", None);
        assert_eq!(without.to_string(), "java.lang.NullPointerException");
    }

    #[test]
    fn test_closure_callback() {
        let cb = |method: &str, args: &[HostValue]| -> Result<HostValue, ForeignException> {
            assert_eq!(method, "compare");
            Ok(HostValue::Int(args.len() as i64))
        };
        let result = ForeignCallback::call(&cb, "compare", &[HostValue::Null, HostValue::Null]);
        assert_eq!(result.unwrap(), HostValue::Int(2));
    }
}
