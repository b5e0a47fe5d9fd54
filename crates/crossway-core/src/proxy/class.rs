//! Proxy classes
//!
//! A [`ProxyClass`] wraps exactly one foreign class and is a singleton per
//! foreign class identity (see [`super::ClassTable`]). Everything derived from
//! reflective metadata is computed once at construction: the supertype
//! closure, and from it the capability set.

use crate::adapter::{CallContext, Capability, CapabilitySet};
use crate::error::GuestResult;
use crate::host::{ForeignClassId, ForeignClassInfo, MethodInfo, Modifiers};
use crate::namespace::{guest_class_name, ResolutionOutcome};
use crate::value::Value;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

const ROOT_CLASS: &str = "java.lang.Object";

/// A guest-defined method attached to a proxy class
pub type GuestMethod = Arc<dyn Fn(&CallContext<'_>, &[Value]) -> GuestResult<Value> + Send + Sync>;

/// Guest-visible handle for one foreign class
pub struct ProxyClass {
    id: ForeignClassId,
    info: ForeignClassInfo,
    guest_name: String,
    superclass: Option<Arc<ProxyClass>>,
    interfaces: Vec<Arc<ProxyClass>>,
    ancestors: Vec<String>,
    capabilities: CapabilitySet,
    nested: DashMap<(String, bool), ResolutionOutcome>,
    guest_methods: RwLock<FxHashMap<String, GuestMethod>>,
}

impl ProxyClass {
    /// Build a proxy from reflective metadata and already-resolved supertypes
    pub fn new(
        id: ForeignClassId,
        info: ForeignClassInfo,
        root_module: &str,
        superclass: Option<Arc<ProxyClass>>,
        interfaces: Vec<Arc<ProxyClass>>,
    ) -> Self {
        let mut ancestors = vec![info.name.clone()];
        let inherited = superclass.iter().chain(interfaces.iter());
        for parent in inherited {
            for name in &parent.ancestors {
                if !ancestors.contains(name) {
                    ancestors.push(name.clone());
                }
            }
        }
        let capabilities = CapabilitySet::from_ancestors(&ancestors);
        Self {
            id,
            guest_name: guest_class_name(root_module, &info.name),
            info,
            superclass,
            interfaces,
            ancestors,
            capabilities,
            nested: DashMap::new(),
            guest_methods: RwLock::new(FxHashMap::default()),
        }
    }

    /// Foreign class identity
    pub fn id(&self) -> ForeignClassId {
        self.id
    }

    /// Fully-qualified host name
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Guest constant name, e.g. `Java::JavaUtil::StringTokenizer`
    pub fn guest_name(&self) -> &str {
        &self.guest_name
    }

    /// Raw reflective metadata
    pub fn info(&self) -> &ForeignClassInfo {
        &self.info
    }

    /// Modifier bitset
    pub fn modifiers(&self) -> Modifiers {
        self.info.modifiers
    }

    /// `public`
    pub fn is_public(&self) -> bool {
        self.modifiers().contains(Modifiers::PUBLIC)
    }

    /// `protected`
    pub fn is_protected(&self) -> bool {
        self.modifiers().contains(Modifiers::PROTECTED)
    }

    /// `private`
    pub fn is_private(&self) -> bool {
        self.modifiers().contains(Modifiers::PRIVATE)
    }

    /// `final`
    pub fn is_final(&self) -> bool {
        self.modifiers().contains(Modifiers::FINAL)
    }

    /// `static` (nested classes only)
    pub fn is_static(&self) -> bool {
        self.modifiers().contains(Modifiers::STATIC)
    }

    /// `abstract`
    pub fn is_abstract(&self) -> bool {
        self.modifiers().contains(Modifiers::ABSTRACT)
    }

    /// Interface rather than class
    pub fn is_interface(&self) -> bool {
        self.modifiers().contains(Modifiers::INTERFACE)
    }

    /// Annotations present on the class, inherited ones included
    pub fn annotations(&self) -> &[String] {
        &self.info.annotations
    }

    /// Annotations declared directly on the class
    pub fn declared_annotations(&self) -> &[String] {
        &self.info.declared_annotations
    }

    /// Check for any present annotation
    pub fn has_annotations(&self) -> bool {
        !self.info.annotations.is_empty()
    }

    /// Check for any declared annotation
    pub fn has_declared_annotations(&self) -> bool {
        !self.info.declared_annotations.is_empty()
    }

    /// Check whether `annotation` is present, inherited ones included
    pub fn is_annotation_present(&self, annotation: &str) -> bool {
        self.info.annotations.iter().any(|a| a == annotation)
    }

    /// Superclass, `None` for the root class and interfaces
    pub fn superclass(&self) -> Option<&Arc<ProxyClass>> {
        self.superclass.as_ref()
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> &[Arc<ProxyClass>] {
        &self.interfaces
    }

    /// Names of this class and every supertype, nearest first
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// Every supertype handle, breadth first, excluding this class
    pub fn ancestor_classes(&self) -> Vec<Arc<ProxyClass>> {
        let mut seen: Vec<Arc<ProxyClass>> = Vec::new();
        let mut queue: VecDeque<Arc<ProxyClass>> = self
            .superclass
            .iter()
            .chain(self.interfaces.iter())
            .cloned()
            .collect();
        while let Some(class) = queue.pop_front() {
            if seen.iter().any(|c| c.id == class.id) {
                continue;
            }
            queue.extend(class.superclass.iter().chain(class.interfaces.iter()).cloned());
            seen.push(class);
        }
        seen
    }

    /// Check whether instances of `other` are instances of this class
    pub fn is_assignable_from(&self, other: &ProxyClass) -> bool {
        // interfaces carry no superclass but still widen to the root class
        self.name() == ROOT_CLASS || other.ancestors.iter().any(|name| name == self.name())
    }

    /// Partial order over classes
    ///
    /// Equal classes compare `Equal`; a class that is assignable from the
    /// other (a supertype) is `Greater`; a subtype is `Less`; unrelated
    /// classes are incomparable.
    pub fn compare(&self, other: &ProxyClass) -> Option<Ordering> {
        if self.id == other.id {
            Some(Ordering::Equal)
        } else if self.is_assignable_from(other) {
            Some(Ordering::Greater)
        } else if other.is_assignable_from(self) {
            Some(Ordering::Less)
        } else {
            None
        }
    }

    /// Capabilities fixed at resolution time
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    /// Check for one capability
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Instance methods declared directly on this class
    pub fn declared_instance_methods(&self) -> Vec<MethodInfo> {
        self.info.methods.iter().filter(|m| !m.is_static()).cloned().collect()
    }

    /// Static methods declared directly on this class
    pub fn declared_class_methods(&self) -> Vec<MethodInfo> {
        self.info.methods.iter().filter(|m| m.is_static()).cloned().collect()
    }

    /// Public instance methods, inherited ones included
    ///
    /// A method overridden lower in the hierarchy is listed once, from the
    /// most specific declaring class.
    pub fn java_instance_methods(&self) -> Vec<MethodInfo> {
        let mut methods = self.declared_instance_methods();
        for class in self.ancestor_classes() {
            for method in class.declared_instance_methods() {
                if !methods
                    .iter()
                    .any(|m| m.name == method.name && m.parameter_types == method.parameter_types)
                {
                    methods.push(method);
                }
            }
        }
        methods.retain(|m| m.modifiers.contains(Modifiers::PUBLIC));
        methods
    }

    /// Public static methods along the superclass chain
    pub fn java_class_methods(&self) -> Vec<MethodInfo> {
        let mut methods = self.declared_class_methods();
        let mut next = self.superclass.clone();
        while let Some(class) = next {
            for method in class.declared_class_methods() {
                if !methods.iter().any(|m| m.name == method.name) {
                    methods.push(method);
                }
            }
            next = class.superclass.clone();
        }
        methods.retain(|m| m.modifiers.contains(Modifiers::PUBLIC));
        methods
    }

    /// Check whether the foreign class hierarchy declares an instance method
    pub fn declares_instance_method(&self, name: &str) -> bool {
        self.info.methods.iter().any(|m| m.name == name && !m.is_static())
            || self
                .ancestor_classes()
                .iter()
                .any(|c| c.info.methods.iter().any(|m| m.name == name && !m.is_static()))
    }

    /// Attach a guest-defined method, replacing any earlier definition
    pub fn define_method(&self, name: &str, method: GuestMethod) {
        tracing::debug!(target: "crossway::classes", class = self.name(), method = name, "guest method defined");
        self.guest_methods.write().insert(name.to_string(), method);
    }

    /// Guest method defined directly on this class
    pub fn guest_method(&self, name: &str) -> Option<GuestMethod> {
        self.guest_methods.read().get(name).cloned()
    }

    /// Guest method on this class or the nearest ancestor that defines it
    pub fn find_guest_method(&self, name: &str) -> Option<GuestMethod> {
        self.guest_method(name).or_else(|| {
            self.ancestor_classes()
                .iter()
                .find_map(|class| class.guest_method(name))
        })
    }

    /// Names of guest methods defined directly on this class
    pub fn guest_method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.guest_methods.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Cached nested constant lookup
    pub fn cached_nested(&self, name: &str, inherit: bool) -> Option<ResolutionOutcome> {
        self.nested
            .get(&(name.to_string(), inherit))
            .map(|entry| entry.value().clone())
    }

    /// Install a nested constant outcome unless one is already cached
    pub fn install_nested(&self, name: &str, inherit: bool, outcome: ResolutionOutcome) -> ResolutionOutcome {
        self.nested
            .entry((name.to_string(), inherit))
            .or_insert(outcome)
            .value()
            .clone()
    }

    /// Drop cached negative nested lookups
    pub fn forget_nested_not_found(&self) -> usize {
        let before = self.nested.len();
        self.nested.retain(|_, outcome| !outcome.is_not_found());
        before - self.nested.len()
    }
}

impl fmt::Debug for ProxyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyClass")
            .field("name", &self.info.name)
            .field("id", &self.id)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
