//! Protocol adapters
//!
//! A foreign class's capabilities are fixed when its proxy is built, from the
//! foreign supertype list. Each capability has one [`ProtocolAdapter`] that
//! supplies guest protocol methods (`each`, `[]`, `<=>`, ...) by translating
//! them into foreign call sequences.
//!
//! Dispatch consults capabilities in [`Capability::ALL`] order, so a class
//! that is both a `List` and an `Iterable` gets `first` from the list
//! adapter.

pub mod collection;
pub mod comparable;
pub mod iterable;
pub mod list;
pub mod map;
pub mod runnable;
pub mod stream;
pub mod throwable;

pub use collection::CollectionAdapter;
pub use comparable::{ComparableAdapter, ComparatorAdapter};
pub use iterable::EnumerableAdapter;
pub use list::ListAdapter;
pub use map::{MapAdapter, MapDefault};
pub use runnable::RunnableAdapter;
pub use stream::{GuestStream, StreamAdapter, StreamOptions};
pub use throwable::ThrowableAdapter;

use crate::bridge::Bridge;
use crate::error::{GuestError, GuestResult};
use crate::proxy::ProxyObject;
use crate::value::{Block, Value};
use rustc_hash::FxHashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

/// A protocol a foreign class can take part in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `java.util.Map`
    Map,
    /// `java.util.List`
    List,
    /// `java.util.Collection`
    Collection,
    /// `java.util.Iterator`
    Iterator,
    /// `java.util.Enumeration`
    Enumeration,
    /// `java.lang.Iterable`
    Iterable,
    /// `java.lang.Comparable`
    Comparable,
    /// `java.util.Comparator`
    Comparator,
    /// `java.lang.Throwable`
    Throwable,
    /// Byte and character streams, channels
    Stream,
    /// `java.lang.Runnable`
    Runnable,
}

impl Capability {
    /// Every capability, in dispatch precedence order
    pub const ALL: [Capability; 11] = [
        Capability::Map,
        Capability::List,
        Capability::Collection,
        Capability::Iterator,
        Capability::Enumeration,
        Capability::Iterable,
        Capability::Comparable,
        Capability::Comparator,
        Capability::Throwable,
        Capability::Stream,
        Capability::Runnable,
    ];

    /// Foreign supertypes that grant this capability
    pub fn foreign_interfaces(self) -> &'static [&'static str] {
        match self {
            Capability::Map => &["java.util.Map"],
            Capability::List => &["java.util.List"],
            Capability::Collection => &["java.util.Collection"],
            Capability::Iterator => &["java.util.Iterator"],
            Capability::Enumeration => &["java.util.Enumeration"],
            Capability::Iterable => &["java.lang.Iterable"],
            Capability::Comparable => &["java.lang.Comparable"],
            Capability::Comparator => &["java.util.Comparator"],
            Capability::Throwable => &["java.lang.Throwable"],
            Capability::Stream => &[
                "java.io.InputStream",
                "java.io.OutputStream",
                "java.io.Reader",
                "java.io.Writer",
                "java.nio.channels.Channel",
            ],
            Capability::Runnable => &["java.lang.Runnable"],
        }
    }

    /// Capability name
    pub fn name(self) -> &'static str {
        match self {
            Capability::Map => "Map",
            Capability::List => "List",
            Capability::Collection => "Collection",
            Capability::Iterator => "Iterator",
            Capability::Enumeration => "Enumeration",
            Capability::Iterable => "Iterable",
            Capability::Comparable => "Comparable",
            Capability::Comparator => "Comparator",
            Capability::Throwable => "Throwable",
            Capability::Stream => "Stream",
            Capability::Runnable => "Runnable",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of capabilities, iterated in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u16);

impl CapabilitySet {
    /// Empty set
    pub fn empty() -> Self {
        CapabilitySet(0)
    }

    /// Capabilities granted by a foreign ancestry (the class and every supertype)
    pub fn from_ancestors(ancestors: &[String]) -> Self {
        let mut set = Self::empty();
        for capability in Capability::ALL {
            if capability
                .foreign_interfaces()
                .iter()
                .any(|iface| ancestors.iter().any(|a| a == iface))
            {
                set.insert(capability);
            }
        }
        set
    }

    /// Check membership
    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Add a capability
    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    /// Members in precedence order
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    /// Intersection
    pub fn intersect(self, other: CapabilitySet) -> Self {
        CapabilitySet(self.0 & other.0)
    }

    /// Check if no capability is present
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of capabilities
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(Capability::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Everything a protocol method sees about its call
pub struct CallContext<'a> {
    bridge: &'a Bridge,
    receiver: &'a ProxyObject,
    block: Option<&'a Block>,
}

impl<'a> CallContext<'a> {
    /// Create a call context
    pub fn new(bridge: &'a Bridge, receiver: &'a ProxyObject, block: Option<&'a Block>) -> Self {
        Self {
            bridge,
            receiver,
            block,
        }
    }

    /// The bridge the call goes through
    pub fn bridge(&self) -> &'a Bridge {
        self.bridge
    }

    /// The receiving proxy
    pub fn receiver(&self) -> &'a ProxyObject {
        self.receiver
    }

    /// The receiver as a guest value
    pub fn receiver_value(&self) -> Value {
        Value::Object(self.receiver.clone())
    }

    /// The block passed with the call
    pub fn block(&self) -> Option<&'a Block> {
        self.block
    }

    /// The block passed with the call, or an error naming `method`
    pub fn require_block(&self, method: &str) -> GuestResult<&'a Block> {
        self.block
            .ok_or_else(|| GuestError::Argument(format!("no block given ({})", method)))
    }

    /// Invoke a foreign method on the receiver
    pub fn invoke(&self, method: &str, args: &[Value]) -> GuestResult<Value> {
        self.bridge.invoke_foreign(self.receiver, method, args)
    }

    /// Invoke a foreign method on another object
    pub fn invoke_on(&self, target: &ProxyObject, method: &str, args: &[Value]) -> GuestResult<Value> {
        self.bridge.invoke_foreign(target, method, args)
    }

    /// Invoke a foreign method on the receiver, expecting an object back
    pub fn invoke_object(&self, method: &str, args: &[Value]) -> GuestResult<ProxyObject> {
        expect_object(self.invoke(method, args)?, method)
    }

    /// Invoke a foreign method on the receiver, expecting an integer back
    pub fn invoke_int(&self, method: &str, args: &[Value]) -> GuestResult<i64> {
        let result = self.invoke(method, args)?;
        result.as_int().ok_or_else(|| {
            GuestError::Type(format!("{} returned {}, expected Integer", method, result.type_name()))
        })
    }

    /// Call the block
    pub fn yield_block(&self, method: &str, args: &[Value]) -> GuestResult<Value> {
        self.require_block(method)?.call(args)
    }
}

/// Unwrap a foreign object result
pub(crate) fn expect_object(value: Value, method: &str) -> GuestResult<ProxyObject> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(GuestError::Type(format!(
            "{} returned {}, expected a foreign object",
            method,
            other.type_name()
        ))),
    }
}

/// Drive the elements of an iterable, iterator or enumeration
///
/// Iterables are asked for one fresh iterator; iterators and enumerations are
/// consumed in place. The visitor stops the walk by returning `Break`.
pub(crate) fn each_element(
    cx: &CallContext<'_>,
    target: &ProxyObject,
    mut visit: impl FnMut(Value) -> GuestResult<ControlFlow<()>>,
) -> GuestResult<()> {
    let class = target.class();
    let (cursor, has_next, next) = if class.has_capability(Capability::Iterator) {
        (target.clone(), "hasNext", "next")
    } else if class.has_capability(Capability::Enumeration) {
        (target.clone(), "hasMoreElements", "nextElement")
    } else if class.has_capability(Capability::Iterable) {
        let iterator = expect_object(cx.invoke_on(target, "iterator", &[])?, "iterator")?;
        (iterator, "hasNext", "next")
    } else {
        return Err(GuestError::Adapter {
            class: class.name().to_string(),
            method: "each".to_string(),
            capability: Capability::Iterable,
        });
    };

    while cx.invoke_on(&cursor, has_next, &[])?.truthy() {
        let item = cx.invoke_on(&cursor, next, &[])?;
        if visit(item)?.is_break() {
            break;
        }
    }
    Ok(())
}

/// Collect every element of an iterable
pub(crate) fn collect_elements(cx: &CallContext<'_>, target: &ProxyObject) -> GuestResult<Vec<Value>> {
    let mut items = Vec::new();
    each_element(cx, target, |item| {
        items.push(item);
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(items)
}

/// Copy the receiver into a new foreign object of its own class
///
/// Uses the class's copy constructor; classes without one are copied into
/// `fallback` instead.
pub(crate) fn duplicate(cx: &CallContext<'_>, fallback: &str) -> GuestResult<ProxyObject> {
    let bridge = cx.bridge();
    let receiver = cx.receiver_value();
    let copy = match bridge.new_object(cx.receiver().class(), std::slice::from_ref(&receiver)) {
        Ok(copy) => copy,
        Err(err) => {
            tracing::debug!(
                target: "crossway::adapter",
                class = cx.receiver().class().name(),
                fallback,
                error = %err,
                "no copy constructor"
            );
            let fallback = bridge.lookup_class(fallback)?;
            bridge.new_object(&fallback, &[receiver])?
        }
    };
    expect_object(copy, "dup")
}

/// Guest string form of a value, as `join` and `to_s` render it
pub(crate) fn display_string(bridge: &Bridge, value: &Value) -> GuestResult<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Nil => Ok(String::new()),
        Value::Object(_) => match bridge.call(value, "to_s", &[], None)? {
            Value::Str(s) => Ok(s),
            other => Ok(other.to_string()),
        },
        other => Ok(other.to_string()),
    }
}

/// Integer argument
pub(crate) fn int_arg(value: &Value) -> GuestResult<i64> {
    value.as_int().ok_or_else(|| {
        GuestError::Type(format!("no implicit conversion of {} into Integer", value.type_name()))
    })
}

/// Check argument count
pub(crate) fn check_arity(method: &str, args: &[Value], min: usize, max: usize) -> GuestResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}..{}", min, max)
        };
        return Err(GuestError::arity(method, args.len(), &expected));
    }
    Ok(())
}

/// Translates guest protocol calls for one capability
pub trait ProtocolAdapter: Send + Sync {
    /// Capability this adapter serves
    fn capability(&self) -> Capability;

    /// Guest protocol methods this adapter supplies
    fn methods(&self) -> &'static [&'static str];

    /// Handle a protocol call
    ///
    /// # Arguments
    /// * `cx` - Receiver, block and bridge
    /// * `method` - One of [`ProtocolAdapter::methods`]
    /// * `args` - Guest arguments
    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value>;

    /// Check if this adapter supplies `method`
    fn supplies(&self, method: &str) -> bool {
        self.methods().contains(&method)
    }
}

/// Capability to adapter table
pub struct AdapterRegistry {
    adapters: FxHashMap<Capability, Arc<dyn ProtocolAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            adapters: FxHashMap::default(),
        }
    }

    /// Create a registry with the built-in adapter for every capability
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MapAdapter::new()));
        registry.register(Arc::new(ListAdapter));
        registry.register(Arc::new(CollectionAdapter));
        registry.register(Arc::new(EnumerableAdapter::new(Capability::Iterator)));
        registry.register(Arc::new(EnumerableAdapter::new(Capability::Enumeration)));
        registry.register(Arc::new(EnumerableAdapter::new(Capability::Iterable)));
        registry.register(Arc::new(ComparableAdapter));
        registry.register(Arc::new(ComparatorAdapter));
        registry.register(Arc::new(ThrowableAdapter));
        registry.register(Arc::new(StreamAdapter));
        registry.register(Arc::new(RunnableAdapter));
        registry
    }

    /// Register an adapter, replacing any adapter for the same capability
    pub fn register(&mut self, adapter: Arc<dyn ProtocolAdapter>) -> Option<Arc<dyn ProtocolAdapter>> {
        self.adapters.insert(adapter.capability(), adapter)
    }

    /// Adapter for a capability
    pub fn get(&self, capability: Capability) -> Option<Arc<dyn ProtocolAdapter>> {
        self.adapters.get(&capability).cloned()
    }

    /// Capabilities with a registered adapter
    pub fn capabilities(&self) -> CapabilitySet {
        let mut set = CapabilitySet::empty();
        for capability in self.adapters.keys() {
            set.insert(*capability);
        }
        set
    }

    /// Capabilities of `capabilities` that have an adapter
    pub fn adapters_for(&self, capabilities: CapabilitySet) -> CapabilitySet {
        capabilities.intersect(self.capabilities())
    }

    /// Adapter that handles `method` for a class with `capabilities`
    pub fn find(&self, capabilities: CapabilitySet, method: &str) -> Option<Arc<dyn ProtocolAdapter>> {
        capabilities
            .iter()
            .filter_map(|c| self.adapters.get(&c))
            .find(|adapter| adapter.supplies(method))
            .cloned()
    }

    /// Most general capability whose adapter supplies `method`
    ///
    /// Used to name the missing capability when a receiver lacks `method`:
    /// `each` reports `Iterable` rather than `Map`.
    pub fn owner_of(&self, method: &str) -> Option<Capability> {
        Capability::ALL
            .into_iter()
            .rev()
            .find(|c| self.adapters.get(c).is_some_and(|a| a.supplies(method)))
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
