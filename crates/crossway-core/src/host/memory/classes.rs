//! Class definitions for the in-memory host
//!
//! A [`ClassDef`] is the declarative form of a host class: its place in the
//! type hierarchy, reflective metadata, and the native [`Behavior`] its
//! instances get. Definitions deserialize from host manifests, and
//! [`jdk_classes`] provides the built-in JDK-like set.

use crate::host::{HostValue, MethodInfo, Modifiers};
use serde::Deserialize;

/// Native behavior backing instances of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Only declared methods with literal results
    #[default]
    Plain,
    /// Growable list (`java.util.ArrayList`)
    List,
    /// Insertion-ordered map (`java.util.LinkedHashMap`)
    Map,
    /// Map entry (`getKey`/`getValue`)
    Entry,
    /// Cursor with `hasNext`/`next`
    Iterator,
    /// Cursor with `hasMoreElements`/`nextElement`
    Enumeration,
    /// Whitespace/delimiter tokenizer, an enumeration over tokens
    Tokenizer,
    /// Exception with message and captured trace
    Throwable,
    /// Immutable comparable value (`java.math.BigInteger`)
    Boxed,
    /// Byte source
    InputStream,
    /// Byte sink
    OutputStream,
    /// Char source
    Reader,
    /// Char sink
    Writer,
    /// `java.util.Collections` statics
    Collections,
    /// `java.util.Arrays` statics
    Arrays,
    /// `java.lang.System` statics
    System,
    /// Interface implementation backed by a bridge callback
    Callback,
}

/// Literal result of a declared method
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Boolean result
    Bool(bool),
    /// Integer result
    Int(i64),
    /// Floating point result
    Float(f64),
    /// String result
    Str(String),
}

impl Literal {
    /// Convert to a host value
    pub fn to_host(&self) -> HostValue {
        match self {
            Literal::Bool(b) => HostValue::Bool(*b),
            Literal::Int(i) => HostValue::Int(*i),
            Literal::Float(f) => HostValue::Double(*f),
            Literal::Str(s) => HostValue::Str(s.clone()),
        }
    }
}

fn default_modifiers() -> Vec<String> {
    vec!["public".to_string()]
}

/// Declared method of a host class
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Modifier keywords
    #[serde(default = "default_modifiers")]
    pub modifiers: Vec<String>,
    /// Parameter type names
    #[serde(default)]
    pub params: Vec<String>,
    /// Return type, absent for void
    #[serde(default)]
    pub returns: Option<String>,
    /// Fixed result returned when the method is invoked
    #[serde(default)]
    pub value: Option<Literal>,
}

impl MethodDef {
    /// Public instance method returning `returns`
    pub fn new(name: &str, params: &[&str], returns: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            modifiers: default_modifiers(),
            params: params.iter().map(|p| p.to_string()).collect(),
            returns: returns.map(str::to_string),
            value: None,
        }
    }

    /// Public static method returning `returns`
    pub fn new_static(name: &str, params: &[&str], returns: Option<&str>) -> Self {
        let mut def = Self::new(name, params, returns);
        def.modifiers.push("static".to_string());
        def
    }

    /// Set the literal result
    pub fn returning(mut self, value: Literal) -> Self {
        self.value = Some(value);
        self
    }

    /// Reflective view of this method as declared by `class`
    pub fn info(&self, class: &str) -> MethodInfo {
        MethodInfo {
            name: self.name.clone(),
            modifiers: Modifiers::from_keywords(&self.modifiers),
            parameter_types: self.params.clone(),
            return_type: self.returns.clone(),
            declaring_class: class.to_string(),
        }
    }

    /// Check if the method is static
    pub fn is_static(&self) -> bool {
        self.modifiers.iter().any(|m| m == "static")
    }
}

/// Declarative host class
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassDef {
    /// Fully-qualified dotted name, `$` for nested classes
    pub name: String,
    /// Modifier keywords
    #[serde(default = "default_modifiers")]
    pub modifiers: Vec<String>,
    /// Superclass name; defaults to `java.lang.Object` for classes
    #[serde(default)]
    pub superclass: Option<String>,
    /// Implemented interfaces (extended ones, for interfaces)
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Annotations declared on the class
    #[serde(default)]
    pub annotations: Vec<String>,
    /// Declared methods
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    /// Native behavior of instances
    #[serde(default)]
    pub behavior: Behavior,
    /// Failure raised by the static initializer, if it fails
    #[serde(default)]
    pub init_error: Option<String>,
}

impl ClassDef {
    /// Public class with default settings
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            modifiers: default_modifiers(),
            superclass: None,
            interfaces: Vec::new(),
            annotations: Vec::new(),
            methods: Vec::new(),
            behavior: Behavior::Plain,
            init_error: None,
        }
    }

    /// Public interface extending `parents`
    pub fn interface(name: &str, parents: &[&str]) -> Self {
        Self::new(name)
            .with_modifiers(&["public", "interface", "abstract"])
            .implements(parents)
    }

    /// Replace modifier keywords
    pub fn with_modifiers(mut self, modifiers: &[&str]) -> Self {
        self.modifiers = modifiers.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    /// Add implemented interfaces
    pub fn implements(mut self, interfaces: &[&str]) -> Self {
        self.interfaces
            .extend(interfaces.iter().map(|i| i.to_string()));
        self
    }

    /// Add a declared annotation
    pub fn annotated(mut self, annotation: &str) -> Self {
        self.annotations.push(annotation.to_string());
        self
    }

    /// Add a declared method
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Set the instance behavior
    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Make the static initializer fail with `message`
    pub fn failing_init(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_string());
        self
    }

    /// Modifier bitset
    pub fn modifier_bits(&self) -> Modifiers {
        Modifiers::from_keywords(&self.modifiers)
    }

    /// Check if this definition is an interface
    pub fn is_interface(&self) -> bool {
        self.modifier_bits().contains(Modifiers::INTERFACE)
    }

    /// Check if instances can be constructed directly
    pub fn is_instantiable(&self) -> bool {
        let mods = self.modifier_bits();
        !mods.contains(Modifiers::INTERFACE) && !mods.contains(Modifiers::ABSTRACT)
    }

    /// Effective superclass, applying the implicit `java.lang.Object` root
    pub fn effective_superclass(&self) -> Option<String> {
        if self.superclass.is_some() {
            return self.superclass.clone();
        }
        if self.is_interface() || self.name == OBJECT {
            None
        } else {
            Some(OBJECT.to_string())
        }
    }

    /// Find a declared method by name
    pub fn find_method(&self, name: &str, is_static: bool) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.is_static() == is_static)
    }
}

/// Name of the root class
pub const OBJECT: &str = "java.lang.Object";

/// Class of the snapshot objects returned by `entrySet`/`keySet`
pub const SET_VIEW: &str = "java.util.AbstractMap$SetView";

/// Class of the snapshot objects returned by `values`
pub const VALUES_VIEW: &str = "java.util.AbstractMap$ValuesView";

/// Class of list iterators
pub const LIST_ITERATOR: &str = "java.util.ArrayList$Itr";

/// Class of map entries
pub const MAP_ENTRY: &str = "java.util.AbstractMap$SimpleEntry";

/// Default list class used when marshalling guest arrays
pub const ARRAY_LIST: &str = "java.util.ArrayList";

/// Default map class used when marshalling guest hashes
pub const LINKED_HASH_MAP: &str = "java.util.LinkedHashMap";

fn m(name: &str, params: &[&str], returns: Option<&str>) -> MethodDef {
    MethodDef::new(name, params, returns)
}

fn throwable(name: &str, parent: &str) -> ClassDef {
    ClassDef::new(name).extends(parent).behavior(Behavior::Throwable)
}

/// The built-in JDK-like class set
pub fn jdk_classes() -> Vec<ClassDef> {
    let obj = Some("java.lang.Object");
    let int = Some("int");
    let boolean = Some("boolean");

    vec![
        // Annotation types
        ClassDef::interface("java.lang.annotation.Annotation", &[]),
        ClassDef::interface("java.lang.Deprecated", &["java.lang.annotation.Annotation"]),
        ClassDef::interface(
            "java.lang.FunctionalInterface",
            &["java.lang.annotation.Annotation"],
        ),
        // Core interfaces
        ClassDef::interface("java.io.Serializable", &[]),
        ClassDef::interface("java.lang.Cloneable", &[]),
        ClassDef::interface("java.lang.CharSequence", &[]),
        ClassDef::interface("java.lang.AutoCloseable", &[])
            .method(m("close", &[], None)),
        ClassDef::interface("java.io.Closeable", &["java.lang.AutoCloseable"]),
        ClassDef::interface("java.io.Flushable", &[]),
        ClassDef::interface("java.lang.Readable", &[]),
        ClassDef::interface("java.lang.Appendable", &[]),
        ClassDef::interface("java.nio.channels.Channel", &["java.io.Closeable"])
            .method(m("isOpen", &[], boolean)),
        ClassDef::interface("java.lang.Iterable", &[])
            .method(m("iterator", &[], Some("java.util.Iterator"))),
        ClassDef::interface("java.util.Collection", &["java.lang.Iterable"])
            .method(m("size", &[], int))
            .method(m("add", &["java.lang.Object"], boolean))
            .method(m("addAll", &["java.util.Collection"], boolean))
            .method(m("removeAll", &["java.util.Collection"], boolean))
            .method(m("contains", &["java.lang.Object"], boolean)),
        ClassDef::interface("java.util.List", &["java.util.Collection"])
            .method(m("get", &["int"], obj))
            .method(m("set", &["int", "java.lang.Object"], obj))
            .method(m("indexOf", &["java.lang.Object"], int))
            .method(m("lastIndexOf", &["java.lang.Object"], int))
            .method(m("subList", &["int", "int"], Some("java.util.List"))),
        ClassDef::interface("java.util.Set", &["java.util.Collection"]),
        ClassDef::interface("java.util.RandomAccess", &[]),
        ClassDef::interface("java.util.Map", &[])
            .method(m("get", &["java.lang.Object"], obj))
            .method(m("put", &["java.lang.Object", "java.lang.Object"], obj))
            .method(m("containsKey", &["java.lang.Object"], boolean))
            .method(m("containsValue", &["java.lang.Object"], boolean))
            .method(m("entrySet", &[], Some("java.util.Set"))),
        ClassDef::interface("java.util.Map$Entry", &[])
            .method(m("getKey", &[], obj))
            .method(m("getValue", &[], obj)),
        ClassDef::interface("java.util.Iterator", &[])
            .method(m("hasNext", &[], boolean))
            .method(m("next", &[], obj)),
        ClassDef::interface("java.util.Enumeration", &[])
            .method(m("hasMoreElements", &[], boolean))
            .method(m("nextElement", &[], obj)),
        ClassDef::interface("java.lang.Comparable", &[])
            .method(m("compareTo", &["java.lang.Object"], int)),
        ClassDef::interface("java.util.Comparator", &[])
            .annotated("java.lang.FunctionalInterface")
            .method(m("compare", &["java.lang.Object", "java.lang.Object"], int)),
        ClassDef::interface("java.lang.Runnable", &[])
            .annotated("java.lang.FunctionalInterface")
            .method(m("run", &[], None)),
        // java.lang
        ClassDef::new(OBJECT)
            .method(m("equals", &["java.lang.Object"], boolean))
            .method(m("hashCode", &[], int))
            .method(m("toString", &[], Some("java.lang.String"))),
        ClassDef::new("java.lang.String")
            .with_modifiers(&["public", "final"])
            .implements(&["java.io.Serializable", "java.lang.Comparable", "java.lang.CharSequence"]),
        ClassDef::new("java.lang.Number")
            .with_modifiers(&["public", "abstract"])
            .implements(&["java.io.Serializable"])
            .method(m("intValue", &[], int))
            .method(m("doubleValue", &[], Some("double"))),
        ClassDef::new("java.lang.System")
            .with_modifiers(&["public", "final"])
            .behavior(Behavior::System)
            .method(MethodDef::new_static(
                "getProperty",
                &["java.lang.String"],
                Some("java.lang.String"),
            ))
            .method(
                MethodDef::new_static("lineSeparator", &[], Some("java.lang.String"))
                    .returning(Literal::Str("\n".to_string())),
            ),
        ClassDef::new("java.lang.Throwable")
            .implements(&["java.io.Serializable"])
            .behavior(Behavior::Throwable)
            .method(m("getMessage", &[], Some("java.lang.String")))
            .method(m("getLocalizedMessage", &[], Some("java.lang.String")))
            .method(m("getStackTrace", &[], Some("java.lang.StackTraceElement[]"))),
        throwable("java.lang.Exception", "java.lang.Throwable"),
        throwable("java.lang.RuntimeException", "java.lang.Exception"),
        throwable("java.lang.IllegalArgumentException", "java.lang.RuntimeException"),
        throwable("java.lang.IllegalStateException", "java.lang.RuntimeException"),
        throwable("java.lang.IndexOutOfBoundsException", "java.lang.RuntimeException"),
        throwable("java.lang.ClassCastException", "java.lang.RuntimeException"),
        throwable("java.lang.NullPointerException", "java.lang.RuntimeException"),
        throwable("java.lang.UnsupportedOperationException", "java.lang.RuntimeException"),
        throwable("java.lang.ArithmeticException", "java.lang.RuntimeException"),
        throwable("java.util.NoSuchElementException", "java.lang.RuntimeException"),
        throwable("java.lang.InstantiationException", "java.lang.Exception"),
        throwable("java.io.IOException", "java.lang.Exception"),
        throwable("java.lang.Error", "java.lang.Throwable"),
        throwable("java.lang.LinkageError", "java.lang.Error"),
        throwable("java.lang.ExceptionInInitializerError", "java.lang.LinkageError"),
        throwable("java.lang.NoClassDefFoundError", "java.lang.LinkageError"),
        throwable("java.lang.NoSuchMethodError", "java.lang.LinkageError"),
        // java.math
        ClassDef::new("java.math.BigInteger")
            .extends("java.lang.Number")
            .implements(&["java.lang.Comparable"])
            .behavior(Behavior::Boxed)
            .method(m("compareTo", &["java.math.BigInteger"], int))
            .method(MethodDef::new_static(
                "valueOf",
                &["long"],
                Some("java.math.BigInteger"),
            )),
        // java.util collections
        ClassDef::new("java.util.AbstractCollection")
            .with_modifiers(&["public", "abstract"])
            .implements(&["java.util.Collection"]),
        ClassDef::new("java.util.AbstractList")
            .with_modifiers(&["public", "abstract"])
            .extends("java.util.AbstractCollection")
            .implements(&["java.util.List"]),
        ClassDef::new(ARRAY_LIST)
            .extends("java.util.AbstractList")
            .implements(&[
                "java.util.List",
                "java.util.RandomAccess",
                "java.lang.Cloneable",
                "java.io.Serializable",
            ])
            .behavior(Behavior::List)
            .method(m("add", &["java.lang.Object"], boolean))
            .method(m("get", &["int"], obj))
            .method(m("set", &["int", "java.lang.Object"], obj))
            .method(m("size", &[], int))
            .method(m("clear", &[], None))
            .method(m("ensureCapacity", &["int"], None)),
        ClassDef::new(LIST_ITERATOR)
            .with_modifiers(&["private"])
            .implements(&["java.util.Iterator"])
            .behavior(Behavior::Iterator),
        ClassDef::new("java.util.AbstractMap")
            .with_modifiers(&["public", "abstract"])
            .implements(&["java.util.Map"]),
        ClassDef::new("java.util.HashMap")
            .extends("java.util.AbstractMap")
            .implements(&["java.util.Map", "java.lang.Cloneable", "java.io.Serializable"])
            .behavior(Behavior::Map),
        ClassDef::new(LINKED_HASH_MAP)
            .extends("java.util.HashMap")
            .implements(&["java.util.Map"])
            .behavior(Behavior::Map),
        ClassDef::new(MAP_ENTRY)
            .with_modifiers(&["public", "static"])
            .implements(&["java.util.Map$Entry", "java.io.Serializable"])
            .behavior(Behavior::Entry),
        ClassDef::new(SET_VIEW)
            .with_modifiers(&["private", "final"])
            .extends("java.util.AbstractCollection")
            .implements(&["java.util.Set"])
            .behavior(Behavior::List),
        ClassDef::new(VALUES_VIEW)
            .with_modifiers(&["private", "final"])
            .extends("java.util.AbstractCollection")
            .behavior(Behavior::List),
        ClassDef::new("java.util.StringTokenizer")
            .implements(&["java.util.Enumeration"])
            .behavior(Behavior::Tokenizer)
            .method(m("hasMoreTokens", &[], boolean))
            .method(m("nextToken", &[], Some("java.lang.String")))
            .method(m("countTokens", &[], int)),
        ClassDef::new("java.util.Collections")
            .behavior(Behavior::Collections)
            .method(MethodDef::new_static(
                "sort",
                &["java.util.List", "java.util.Comparator"],
                None,
            )),
        ClassDef::new("java.util.Arrays")
            .behavior(Behavior::Arrays)
            .method(MethodDef::new_static(
                "asList",
                &["java.lang.Object[]"],
                Some("java.util.List"),
            )),
        // java.util.zip gives the package an explicit presence
        ClassDef::new("java.util.zip.ZipFile")
            .implements(&["java.io.Closeable"])
            .method(m("size", &[], int).returning(Literal::Int(0))),
        // java.io
        ClassDef::new("java.io.InputStream")
            .with_modifiers(&["public", "abstract"])
            .implements(&["java.io.Closeable"])
            .method(m("read", &[], int)),
        ClassDef::new("java.io.ByteArrayInputStream")
            .extends("java.io.InputStream")
            .behavior(Behavior::InputStream),
        ClassDef::new("java.io.OutputStream")
            .with_modifiers(&["public", "abstract"])
            .implements(&["java.io.Closeable", "java.io.Flushable"])
            .method(m("write", &["int"], None)),
        ClassDef::new("java.io.ByteArrayOutputStream")
            .extends("java.io.OutputStream")
            .behavior(Behavior::OutputStream)
            .method(m("size", &[], int)),
        ClassDef::new("java.io.Reader")
            .with_modifiers(&["public", "abstract"])
            .implements(&["java.io.Closeable", "java.lang.Readable"])
            .method(m("read", &[], int)),
        ClassDef::new("java.io.StringReader")
            .extends("java.io.Reader")
            .behavior(Behavior::Reader),
        ClassDef::new("java.io.Writer")
            .with_modifiers(&["public", "abstract"])
            .implements(&["java.io.Closeable", "java.io.Flushable", "java.lang.Appendable"])
            .method(m("write", &["int"], None)),
        ClassDef::new("java.io.StringWriter")
            .extends("java.io.Writer")
            .behavior(Behavior::Writer),
    ]
}
