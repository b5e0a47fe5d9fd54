//! Guest values
//!
//! [`Value`] is the bridge's view of a guest-language value. Scalars and
//! containers are plain data; foreign entities appear as handles
//! ([`ProxyObject`], [`ProxyClass`], [`PackageHandle`]) whose identity is the
//! foreign identity.

use crate::adapter::stream::GuestStream;
use crate::error::GuestResult;
use crate::namespace::PackageHandle;
use crate::proxy::{ProxyClass, ProxyObject};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A guest block or proc
#[derive(Clone)]
pub struct Block(Arc<dyn Fn(&[Value]) -> GuestResult<Value> + Send + Sync>);

impl Block {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> GuestResult<Value> + Send + Sync + 'static,
    {
        Block(Arc::new(f))
    }

    /// Call the block
    pub fn call(&self, args: &[Value]) -> GuestResult<Value> {
        (self.0)(args)
    }

    /// Check if two blocks are the same closure
    pub fn ptr_eq(&self, other: &Block) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<Proc>")
    }
}

/// A guest value
#[derive(Debug, Clone)]
pub enum Value {
    /// `nil`
    Nil,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Str(String),
    /// Array
    Array(Vec<Value>),
    /// Insertion-ordered hash
    Hash(Vec<(Value, Value)>),
    /// Foreign instance
    Object(ProxyObject),
    /// Foreign class
    Class(Arc<ProxyClass>),
    /// Foreign package
    Package(Arc<PackageHandle>),
    /// Proc
    Proc(Block),
    /// Guest stream over a foreign stream
    Io(Arc<GuestStream>),
}

impl Value {
    /// Build a string value
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Check for `nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Guest truthiness: everything except `nil` and `false`
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Foreign object payload
    pub fn as_object(&self) -> Option<&ProxyObject> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Foreign class payload
    pub fn as_class(&self) -> Option<&Arc<ProxyClass>> {
        match self {
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Package payload
    pub fn as_package(&self) -> Option<&Arc<PackageHandle>> {
        match self {
            Value::Package(p) => Some(p),
            _ => None,
        }
    }

    /// Array payload
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key in a hash value
    pub fn hash_get(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Hash(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Guest class name of this value
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "NilClass".to_string(),
            Value::Bool(true) => "TrueClass".to_string(),
            Value::Bool(false) => "FalseClass".to_string(),
            Value::Int(_) => "Integer".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Str(_) => "String".to_string(),
            Value::Array(_) => "Array".to_string(),
            Value::Hash(_) => "Hash".to_string(),
            Value::Object(o) => o.class().guest_name().to_string(),
            Value::Class(_) => "Class".to_string(),
            Value::Package(_) => "Module".to_string(),
            Value::Proc(_) => "Proc".to_string(),
            Value::Io(_) => "IO".to_string(),
        }
    }

    /// Ordering between guest scalars
    ///
    /// Numbers compare across integer/float; strings lexicographically. Any
    /// other pairing is incomparable.
    pub fn partial_cmp_scalar(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.iter().any(|(k2, v2)| k == k2 && v == v2))
            }
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            (Value::Package(a), Value::Package(b)) => Arc::ptr_eq(a, b),
            (Value::Proc(a), Value::Proc(b)) => a.ptr_eq(b),
            (Value::Io(a), Value::Io(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Hash(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(o) => write!(f, "#<{}:#{}>", o.class().guest_name(), o.id().0),
            Value::Class(c) => write!(f, "{}", c.guest_name()),
            Value::Package(p) => write!(f, "{}", p.guest_name()),
            Value::Proc(_) => write!(f, "#<Proc>"),
            Value::Io(_) => write!(f, "#<IO>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Int(0).truthy());
        assert!(Value::str("").truthy());
    }

    #[test]
    fn test_numeric_equality_and_order() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_eq!(Value::Int(1).partial_cmp_scalar(&Value::Float(1.5)), Some(Ordering::Less));
        assert_eq!(Value::str("a").partial_cmp_scalar(&Value::Int(1)), None);
    }

    #[test]
    fn test_hash_equality_ignores_order() {
        let a = Value::Hash(vec![(Value::str("a"), Value::Int(1)), (Value::str("b"), Value::Int(2))]);
        let b = Value::Hash(vec![(Value::str("b"), Value::Int(2)), (Value::str("a"), Value::Int(1))]);
        assert_eq!(a, b);
        assert_eq!(a.hash_get(&Value::str("b")), Some(&Value::Int(2)));
    }

    #[test]
    fn test_block_call() {
        let double = Block::new(|args| Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2)));
        assert_eq!(double.call(&[Value::Int(21)]).unwrap(), Value::Int(42));
        assert!(double.ptr_eq(&double.clone()));
    }

    #[test]
    fn test_display() {
        let v = Value::Array(vec![Value::Int(1), Value::str("x"), Value::Nil]);
        assert_eq!(v.to_string(), "[1, \"x\", nil]");
    }
}
