//! The bridge
//!
//! [`Bridge`] ties the pieces together: one host, one singleton class table,
//! one namespace resolver, the adapter registry and the error translator.
//! It is cheap to clone; clones share every cache.
//!
//! Dispatch of a guest call on a foreign object tries, in order:
//!
//! 1. guest methods defined on the class or an ancestor (reopened classes)
//! 2. the protocol adapters of the class's capabilities
//! 3. the handful of methods every guest object has (`==`, `to_s`, ...)
//! 4. the foreign method of that name
//!
//! A protocol method name the class declares no foreign method for, and
//! whose capability the class lacks, is an adapter error rather than a
//! foreign `NoSuchMethodError`.

use crate::adapter::{AdapterRegistry, CallContext, Capability};
use crate::config::BridgeConfig;
use crate::error::{ErrorTranslator, GuestError, GuestResult};
use crate::host::{ForeignException, HostRuntime, HostValue};
use crate::marshal::{marshal, marshal_args, unmarshal};
use crate::namespace::{NamespacePath, NamespaceResolver, ResolutionOutcome};
use crate::proxy::{ClassTable, ProxyClass, ProxyObject};
use crate::value::{Block, Value};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Weak};

static GLOBAL: OnceCell<Bridge> = OnceCell::new();

/// Methods answered for every foreign object
const OBJECT_METHODS: &[&str] = &[
    "==", "!=", "eql?", "equal?", "to_s", "inspect", "hash", "java_class", "is_a?",
    "kind_of?", "respond_to?",
];

/// Guest entry point to a host runtime
#[derive(Clone)]
pub struct Bridge {
    host: Arc<dyn HostRuntime>,
    config: Arc<BridgeConfig>,
    classes: Arc<ClassTable>,
    resolver: Arc<NamespaceResolver>,
    adapters: Arc<AdapterRegistry>,
    translator: Arc<ErrorTranslator>,
}

impl Bridge {
    /// Create a bridge with the default configuration
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self::assemble(host, BridgeConfig::default())
    }

    /// Create a bridge and append the configured classpath to the host
    ///
    /// # Arguments
    /// * `host` - Host runtime
    /// * `config` - Root module name, shortcuts, classpath and defaults
    ///
    /// # Returns
    /// * `Ok(Bridge)` - Ready bridge
    /// * `Err(GuestError)` - The host rejected a classpath entry
    pub fn with_config(host: Arc<dyn HostRuntime>, config: BridgeConfig) -> GuestResult<Self> {
        let classpath = config.classpath.clone();
        let bridge = Self::assemble(host, config);
        for entry in &classpath {
            bridge.append_classpath(entry)?;
        }
        Ok(bridge)
    }

    fn assemble(host: Arc<dyn HostRuntime>, config: BridgeConfig) -> Self {
        let classes = Arc::new(ClassTable::new(&config.root_module));
        let resolver = Arc::new(NamespaceResolver::new(
            host.clone(),
            classes.clone(),
            &config.root_module,
        ));
        tracing::debug!(target: "crossway::resolver", root = %config.root_module, "bridge created");
        Self {
            host,
            config: Arc::new(config),
            classes,
            resolver,
            adapters: Arc::new(AdapterRegistry::with_defaults()),
            translator: Arc::new(ErrorTranslator::new()),
        }
    }

    /// Replace the adapter registry
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = Arc::new(adapters);
        self
    }

    /// Replace the error translator
    pub fn with_translator(mut self, translator: ErrorTranslator) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    /// Install this bridge as the process-wide instance
    ///
    /// Fails, handing the bridge back, when one is already installed.
    pub fn install(self) -> Result<&'static Bridge, Bridge> {
        GLOBAL.try_insert(self).map_err(|(_, rejected)| rejected)
    }

    /// The process-wide instance, if installed
    pub fn global() -> Option<&'static Bridge> {
        GLOBAL.get()
    }

    /// The host runtime
    pub fn host(&self) -> &Arc<dyn HostRuntime> {
        &self.host
    }

    /// Configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Singleton class table
    pub fn classes(&self) -> &Arc<ClassTable> {
        &self.classes
    }

    /// Namespace resolver
    pub fn resolver(&self) -> &NamespaceResolver {
        &self.resolver
    }

    /// Adapter registry
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Error translator
    pub fn translator(&self) -> &ErrorTranslator {
        &self.translator
    }

    fn downgrade(&self) -> WeakBridge {
        WeakBridge {
            host: Arc::downgrade(&self.host),
            resolver: Arc::downgrade(&self.resolver),
            config: self.config.clone(),
            classes: self.classes.clone(),
            adapters: self.adapters.clone(),
            translator: self.translator.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// Translate the failure of a host call
    pub fn host_call<T>(&self, result: Result<T, ForeignException>) -> GuestResult<T> {
        result.map_err(|exception| self.translate(exception))
    }

    /// Wrap a foreign exception, categorised by its class ancestry
    pub fn translate(&self, exception: ForeignException) -> GuestError {
        let ancestry = self
            .exception_class(&exception)
            .map(|class| class.ancestors().to_vec())
            .unwrap_or_default();
        self.translator.translate(exception, &ancestry)
    }

    fn exception_class(&self, exception: &ForeignException) -> Option<Arc<ProxyClass>> {
        let host = self.host.as_ref();
        exception
            .object
            .and_then(|object| host.class_of(object).ok())
            .and_then(|id| self.classes.intern(host, id).ok())
            .or_else(|| self.classes.load(host, &exception.class_name).ok().flatten())
    }

    /// Check whether a guest `rescue` of `class` catches `error`
    ///
    /// Membership is foreign-class membership of the exception object.
    pub fn rescues(&self, error: &GuestError, class: &ProxyClass) -> bool {
        let Some(exception) = error.foreign_exception() else {
            return false;
        };
        match exception.object {
            Some(object) => self.host.is_instance(object, class.id()),
            None => self
                .exception_class(exception)
                .is_some_and(|actual| class.is_assignable_from(&actual)),
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// The root namespace (`Java`)
    pub fn root(&self) -> Value {
        Value::Package(self.resolver.root().clone())
    }

    /// Resolve a dotted name without raising resolution failures
    pub fn resolve(&self, dotted: &str) -> GuestResult<ResolutionOutcome> {
        self.resolver
            .resolve_str(dotted)
            .map_err(|e| GuestError::Argument(e.to_string()))
    }

    /// Resolve a dotted name to a package or class
    pub fn lookup(&self, dotted: &str) -> GuestResult<Value> {
        self.resolve(dotted)?.into_value(dotted)
    }

    /// Resolve a dotted name that must be a class
    pub fn lookup_class(&self, dotted: &str) -> GuestResult<Arc<ProxyClass>> {
        match self.lookup(dotted)? {
            Value::Class(class) => Ok(class),
            other => Err(GuestError::Type(format!("{} is a {}, not a class", dotted, other.type_name()))),
        }
    }

    /// Resolve a top-level package shortcut (`java`, `javax`, ...)
    pub fn top_level(&self, name: &str) -> GuestResult<Value> {
        if !self.config.is_top_level(name) {
            return Err(GuestError::NotFound {
                name: name.to_string(),
            });
        }
        self.resolver
            .resolve_segment(self.resolver.root(), name, false)
            .into_value(name)
    }

    /// Symbolic constant access, `Parent::Name`
    pub fn constant(&self, parent: &Value, name: &str) -> GuestResult<Value> {
        self.const_get(parent, name, true)
    }

    /// `const_get` on a package or class
    ///
    /// `name` may be a `::`-separated chain. `inherit` applies to classes
    /// only; packages have no supertypes.
    pub fn const_get(&self, parent: &Value, name: &str, inherit: bool) -> GuestResult<Value> {
        let mut current = parent.clone();
        for segment in name.split("::") {
            if segment.is_empty() {
                return Err(GuestError::Argument(format!("wrong constant name {}", name)));
            }
            let (outcome, qualified) = match &current {
                Value::Package(package) => (
                    self.resolver.resolve_constant(package, segment),
                    format!("{}::{}", package.guest_name(), segment),
                ),
                Value::Class(class) => (
                    self.resolver.resolve_nested(class, segment, inherit),
                    format!("{}::{}", class.guest_name(), segment),
                ),
                other => {
                    return Err(GuestError::Type(format!(
                        "{} is not a class/module",
                        other.type_name()
                    )))
                }
            };
            current = outcome.into_value(&qualified)?;
        }
        Ok(current)
    }

    /// Append a location to the host classpath
    ///
    /// Cached `NotFound` markers are dropped so newly reachable names
    /// resolve; cached load failures stay until invalidated.
    pub fn append_classpath(&self, location: &Path) -> GuestResult<usize> {
        self.host_call(self.host.add_classpath_entry(location))?;
        let dropped = self.resolver.forget_not_found();
        tracing::info!(target: "crossway::resolver", location = %location.display(), dropped, "classpath appended");
        Ok(dropped)
    }

    /// Drop the cached outcome for one dotted path
    pub fn invalidate(&self, dotted: &str) -> GuestResult<bool> {
        let path = NamespacePath::parse(dotted).map_err(|e| GuestError::Argument(e.to_string()))?;
        Ok(self.resolver.invalidate(&path))
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Convert a host value for the guest
    pub fn wrap(&self, value: HostValue) -> GuestResult<Value> {
        unmarshal(self, value)
    }

    /// Convert a guest value for the host
    pub fn unwrap(&self, value: &Value) -> GuestResult<HostValue> {
        marshal(self, value)
    }

    /// Construct a foreign instance
    pub fn new_object(&self, class: &Arc<ProxyClass>, args: &[Value]) -> GuestResult<Value> {
        let args = marshal_args(self, args)?;
        let created = self.host_call(self.host.new_instance(class.id(), &args))?;
        self.wrap(created)
    }

    /// Invoke a static foreign method
    pub fn call_static(&self, class: &Arc<ProxyClass>, method: &str, args: &[Value]) -> GuestResult<Value> {
        let args = marshal_args(self, args)?;
        let result = self.host_call(self.host.invoke_static(class.id(), method, &args))?;
        self.wrap(result)
    }

    /// Invoke a foreign instance method, bypassing adapters
    pub fn invoke_foreign(&self, object: &ProxyObject, method: &str, args: &[Value]) -> GuestResult<Value> {
        tracing::trace!(target: "crossway::adapter", class = object.class().name(), method, "foreign call");
        let args = marshal_args(self, args)?;
        let result = self.host_call(self.host.invoke(object.id(), method, &args))?;
        self.wrap(result)
    }

    /// Send a guest method call to any value the bridge owns
    ///
    /// Packages answer segment names (`java.util` style navigation); classes
    /// answer `new` and their static methods.
    pub fn call(&self, receiver: &Value, method: &str, args: &[Value], block: Option<&Block>) -> GuestResult<Value> {
        match receiver {
            Value::Object(object) => self.dispatch(object, method, args, block),
            Value::Class(class) => match method {
                "new" => self.new_object(class, args),
                "java_class" => Ok(receiver.clone()),
                _ => self.call_static(class, method, args),
            },
            Value::Package(_) if args.is_empty() => self.const_get(receiver, method, false),
            Value::Io(stream) => stream.call(method, args),
            other => Err(GuestError::NoMethod {
                receiver: other.type_name(),
                method: method.to_string(),
            }),
        }
    }

    /// Dispatch a guest method call on a foreign object
    pub fn dispatch(
        &self,
        object: &ProxyObject,
        method: &str,
        args: &[Value],
        block: Option<&Block>,
    ) -> GuestResult<Value> {
        let class = object.class();
        let cx = CallContext::new(self, object, block);

        if let Some(guest) = class.find_guest_method(method) {
            return guest(&cx, args);
        }
        if let Some(adapter) = self.adapters.find(class.capabilities(), method) {
            tracing::trace!(
                target: "crossway::adapter",
                class = class.name(),
                method,
                capability = %adapter.capability(),
                "protocol call"
            );
            return adapter.call(&cx, method, args);
        }
        if let Some(result) = self.object_method(object, method, args) {
            return result;
        }
        if !class.declares_instance_method(method) {
            if let Some(capability) = self.adapters.owner_of(method) {
                return Err(GuestError::Adapter {
                    class: class.name().to_string(),
                    method: method.to_string(),
                    capability,
                });
            }
        }
        self.invoke_foreign(object, method, args)
    }

    fn object_method(&self, object: &ProxyObject, method: &str, args: &[Value]) -> Option<GuestResult<Value>> {
        let receiver = Value::Object(object.clone());
        let result = match (method, args) {
            ("==" | "eql?", [other]) => self.values_equal(&receiver, other).map(Value::Bool),
            ("!=", [other]) => self.values_equal(&receiver, other).map(|eq| Value::Bool(!eq)),
            ("equal?", [other]) => Ok(Value::Bool(receiver == *other)),
            ("to_s", []) => self.invoke_foreign(object, "toString", &[]),
            ("inspect", []) => self
                .invoke_foreign(object, "toString", &[])
                .map(|s| Value::Str(format!("#<{}: {}>", object.class().guest_name(), plain(&s)))),
            ("hash", []) => self.invoke_foreign(object, "hashCode", &[]),
            ("java_class", []) => Ok(Value::Class(object.class().clone())),
            ("is_a?" | "kind_of?", [Value::Class(class)]) => {
                Ok(Value::Bool(self.host.is_instance(object.id(), class.id())))
            }
            ("respond_to?", [Value::Str(name)]) => Ok(Value::Bool(self.responds_to(object, name))),
            _ => return None,
        };
        Some(result)
    }

    /// Check whether a foreign object answers a guest method
    pub fn responds_to(&self, object: &ProxyObject, method: &str) -> bool {
        let class = object.class();
        class.find_guest_method(method).is_some()
            || self.adapters.find(class.capabilities(), method).is_some()
            || OBJECT_METHODS.contains(&method)
            || class.declares_instance_method(method)
    }

    /// Check foreign-class membership of a guest value
    pub fn is_instance(&self, value: &Value, class: &ProxyClass) -> bool {
        match value {
            Value::Object(object) => self.host.is_instance(object.id(), class.id()),
            _ => false,
        }
    }

    /// Guest equality, delegating to `equals` when a foreign object is involved
    pub fn values_equal(&self, a: &Value, b: &Value) -> GuestResult<bool> {
        let (object, other) = match (a, b) {
            (Value::Object(object), other) | (other, Value::Object(object)) => (object, other),
            _ => return Ok(a == b),
        };
        if let Value::Object(o) = other {
            if o == object {
                return Ok(true);
            }
        }
        let other = match marshal(self, other) {
            Ok(host) => host,
            Err(_) => return Ok(false),
        };
        let equal = self.host_call(self.host.invoke(object.id(), "equals", &[other]))?;
        Ok(equal.as_bool().unwrap_or(false))
    }

    /// Ordering between two guest values
    ///
    /// Foreign `Comparable` objects use `compareTo`; scalars use guest
    /// ordering. `nil` and unrelated values are incomparable.
    pub fn compare_values(&self, a: &Value, b: &Value) -> GuestResult<Option<Ordering>> {
        match (a, b) {
            (Value::Nil, _) | (_, Value::Nil) => Ok(None),
            (Value::Object(object), other) if object.class().has_capability(Capability::Comparable) => {
                let result = self.invoke_foreign(object, "compareTo", std::slice::from_ref(other))?;
                Ok(result.as_int().map(|i| i.cmp(&0)))
            }
            (other, Value::Object(object)) if object.class().has_capability(Capability::Comparable) => {
                let result = self.invoke_foreign(object, "compareTo", std::slice::from_ref(other))?;
                Ok(result.as_int().map(|i| 0.cmp(&i)))
            }
            _ => Ok(a.partial_cmp_scalar(b)),
        }
    }

    /// Implement a foreign interface with a guest handler
    ///
    /// The handler receives the foreign method name and guest arguments.
    /// Guest errors reach the host as the wrapped foreign exception when
    /// there is one, otherwise as a `java.lang.RuntimeException`.
    pub fn implement<F>(&self, interface: &Arc<ProxyClass>, handler: F) -> GuestResult<ProxyObject>
    where
        F: Fn(&Bridge, &str, &[Value]) -> GuestResult<Value> + Send + Sync + 'static,
    {
        let weak = self.downgrade();
        let callback = move |method: &str, args: &[HostValue]| -> Result<HostValue, ForeignException> {
            let bridge = weak.upgrade().ok_or_else(|| {
                ForeignException::with_message("java.lang.IllegalStateException", "bridge dropped")
            })?;
            let outcome = args
                .iter()
                .cloned()
                .map(|arg| bridge.wrap(arg))
                .collect::<GuestResult<Vec<_>>>()
                .and_then(|args| handler(&bridge, method, &args))
                .and_then(|result| bridge.unwrap(&result));
            outcome.map_err(into_foreign)
        };
        let id = self.host_call(self.host.implement_interface(interface.id(), Arc::new(callback)))?;
        match self.wrap(HostValue::Object(id))? {
            Value::Object(object) => Ok(object),
            other => Err(GuestError::Type(format!("interface proxy came back as {}", other.type_name()))),
        }
    }

    /// Wrap a two-argument guest block, or guest natural ordering, as a
    /// foreign `java.util.Comparator`
    pub fn wrap_comparator(&self, block: Option<&Block>) -> GuestResult<ProxyObject> {
        self.comparator_object(block, None)
    }

    /// Comparator that also records the first guest error it raises
    ///
    /// The host only sees a `RuntimeException`; callers that drive the host
    /// operation re-raise the recorded guest error instead.
    pub(crate) fn comparator_object(
        &self,
        block: Option<&Block>,
        failure: Option<ErrorSlot>,
    ) -> GuestResult<ProxyObject> {
        let interface = self.lookup_class("java.util.Comparator")?;
        let block = block.cloned();
        self.implement(&interface, move |bridge, method, args| {
            let result = compare_for_host(bridge, block.as_ref(), method, args);
            if let (Err(err), Some(slot)) = (&result, &failure) {
                slot.lock().get_or_insert_with(|| err.clone());
            }
            result
        })
    }
}

/// First guest error raised inside a host callback
pub(crate) type ErrorSlot = Arc<Mutex<Option<GuestError>>>;

fn compare_for_host(bridge: &Bridge, block: Option<&Block>, method: &str, args: &[Value]) -> GuestResult<Value> {
    if method != "compare" {
        return Err(GuestError::NoMethod {
            receiver: "Comparator".to_string(),
            method: method.to_string(),
        });
    }
    let [a, b] = args else {
        return Err(GuestError::arity(method, args.len(), "2"));
    };
    match block {
        Some(block) => match block.call(args)? {
            Value::Int(i) => Ok(Value::Int(i.signum())),
            other => Err(GuestError::Argument(format!(
                "comparison of {} with {} failed: block returned {}",
                a.type_name(),
                b.type_name(),
                other.type_name()
            ))),
        },
        None => match bridge.compare_values(a, b)? {
            Some(ordering) => Ok(Value::Int(ordering as i64)),
            None => Err(incomparable(a, b)),
        },
    }
}

/// Error for a failed guest comparison
pub(crate) fn incomparable(a: &Value, b: &Value) -> GuestError {
    GuestError::Argument(format!("comparison of {} with {} failed", a.type_name(), b.type_name()))
}

fn plain(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn into_foreign(err: GuestError) -> ForeignException {
    match err {
        GuestError::Foreign { exception, .. } | GuestError::Load { cause: exception, .. } => exception,
        other => ForeignException::with_message("java.lang.RuntimeException", other.to_string()),
    }
}

/// Bridge handle held by host-side callbacks
///
/// Callbacks live in the host, so they must not keep the host alive.
struct WeakBridge {
    host: Weak<dyn HostRuntime>,
    resolver: Weak<NamespaceResolver>,
    config: Arc<BridgeConfig>,
    classes: Arc<ClassTable>,
    adapters: Arc<AdapterRegistry>,
    translator: Arc<ErrorTranslator>,
}

impl WeakBridge {
    fn upgrade(&self) -> Option<Bridge> {
        Some(Bridge {
            host: self.host.upgrade()?,
            resolver: self.resolver.upgrade()?,
            config: self.config.clone(),
            classes: self.classes.clone(),
            adapters: self.adapters.clone(),
            translator: self.translator.clone(),
        })
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("root_module", &self.config.root_module)
            .field("classes", &self.classes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::host::memory::{ClassDef, MemoryHost, MethodDef};

    fn bridge() -> (Arc<MemoryHost>, Bridge) {
        let host = Arc::new(MemoryHost::new());
        (host.clone(), Bridge::new(host))
    }

    #[test]
    fn test_lookup_and_constant_share_handles() {
        let (_, bridge) = bridge();
        let by_string = bridge.lookup("java.util.StringTokenizer").unwrap();
        let java_util = bridge.constant(&bridge.root(), "JavaUtil").unwrap();
        let by_symbol = bridge.constant(&java_util, "StringTokenizer").unwrap();
        let by_chain = bridge.const_get(&bridge.root(), "java::util::StringTokenizer", false).unwrap();
        assert_eq!(by_string, by_symbol);
        assert_eq!(by_string, by_chain);
    }

    #[test]
    fn test_debug_names_root_module() {
        let (_, bridge) = bridge();
        bridge.lookup("java.util.ArrayList").unwrap();
        let text = format!("{:?}", bridge);
        assert!(text.starts_with("Bridge { root_module: \"Java\""), "{}", text);
    }

    #[test]
    fn test_top_level_shortcuts() {
        let (_, bridge) = bridge();
        let java = bridge.top_level("java").unwrap();
        let util = bridge.call(&java, "util", &[], None).unwrap();
        let list = bridge.call(&util, "ArrayList", &[], None).unwrap();
        assert_eq!(list.as_class().unwrap().name(), "java.util.ArrayList");
        assert!(matches!(bridge.top_level("net"), Err(GuestError::NotFound { .. })));
    }

    #[test]
    fn test_dispatch_order() {
        let (host, bridge) = bridge();
        host.define_class(ClassDef::new("com.example.Widget").method(MethodDef::new("spin", &[], None)));
        let widget = bridge.lookup_class("com.example.Widget").unwrap();
        let obj = bridge.new_object(&widget, &[]).unwrap();

        assert_eq!(bridge.call(&obj, "spin", &[], None).unwrap(), Value::Nil);
        let err = bridge.call(&obj, "each", &[], None).unwrap_err();
        assert!(matches!(
            err,
            GuestError::Adapter {
                capability: Capability::Iterable,
                ..
            }
        ));
        let missing = bridge.call(&obj, "frobnicate", &[], None).unwrap_err();
        assert_eq!(missing.category(), ErrorCategory::NoMethod);
        assert!(missing.foreign_exception().is_some());

        widget.define_method(
            "spin",
            Arc::new(|_: &CallContext<'_>, _: &[Value]| -> GuestResult<Value> { Ok(Value::Int(7)) }),
        );
        assert_eq!(bridge.call(&obj, "spin", &[], None).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_object_methods() {
        let (_, bridge) = bridge();
        let list_class = bridge.lookup_class("java.util.ArrayList").unwrap();
        let a = bridge.new_object(&list_class, &[]).unwrap();
        let b = bridge.new_object(&list_class, &[]).unwrap();
        assert_eq!(bridge.call(&a, "==", &[b.clone()], None).unwrap(), Value::Bool(true));
        assert_eq!(bridge.call(&a, "equal?", &[b.clone()], None).unwrap(), Value::Bool(false));
        assert_eq!(bridge.call(&a, "to_s", &[], None).unwrap(), Value::str("[]"));
        let collection = bridge.lookup("java.util.Collection").unwrap();
        assert_eq!(bridge.call(&a, "is_a?", &[collection], None).unwrap(), Value::Bool(true));
        assert_eq!(
            bridge.call(&a, "respond_to?", &[Value::str("each")], None).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_rescue_matches_foreign_membership() {
        let (_, bridge) = bridge();
        let list_class = bridge.lookup_class("java.util.ArrayList").unwrap();
        let list = bridge.new_object(&list_class, &[]).unwrap();
        let err = bridge.call(&list, "get", &[Value::Int(3)], None).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Index);
        let runtime = bridge.lookup_class("java.lang.RuntimeException").unwrap();
        let io = bridge.lookup_class("java.io.IOException").unwrap();
        assert!(bridge.rescues(&err, &runtime));
        assert!(!bridge.rescues(&err, &io));
    }

    #[test]
    fn test_comparator_from_block() {
        let (_, bridge) = bridge();
        let reverse = Block::new(|args| {
            let (a, b) = (args[0].as_int().unwrap_or(0), args[1].as_int().unwrap_or(0));
            Ok(Value::Int(b - a))
        });
        let comparator = bridge.wrap_comparator(Some(&reverse)).unwrap();
        let result = bridge
            .invoke_foreign(&comparator, "compare", &[Value::Int(1), Value::Int(5)])
            .unwrap();
        assert_eq!(result, Value::Int(1));

        let natural = bridge.wrap_comparator(None).unwrap();
        let err = bridge
            .invoke_foreign(&natural, "compare", &[Value::Int(1), Value::Nil])
            .unwrap_err();
        assert!(err.to_string().contains("comparison of Integer with NilClass failed"));
    }

    #[test]
    fn test_install_once() {
        let (_, bridge) = bridge();
        let _ = bridge.clone().install();
        assert!(bridge.install().is_err());
        assert!(Bridge::global().is_some());
    }
}
