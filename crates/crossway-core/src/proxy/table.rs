//! Singleton table of proxy classes
//!
//! The table guarantees one [`ProxyClass`] per foreign class identity. A
//! proxy is built outside any lock and installed with compare-and-install-once
//! on the identity key, so concurrent first access converges on one handle.

use super::ProxyClass;
use crate::host::{ClassLookup, ForeignClassId, ForeignException, HostRuntime};
use dashmap::DashMap;
use std::sync::Arc;

/// Foreign class identity to proxy class
pub struct ClassTable {
    root_module: String,
    classes: DashMap<ForeignClassId, Arc<ProxyClass>>,
    by_name: DashMap<String, ForeignClassId>,
}

impl ClassTable {
    /// Create an empty table
    pub fn new(root_module: &str) -> Self {
        Self {
            root_module: root_module.to_string(),
            classes: DashMap::new(),
            by_name: DashMap::new(),
        }
    }

    /// Get an installed proxy by identity
    pub fn get(&self, id: ForeignClassId) -> Option<Arc<ProxyClass>> {
        self.classes.get(&id).map(|entry| entry.value().clone())
    }

    /// Get an installed proxy by host name
    pub fn get_by_name(&self, name: &str) -> Option<Arc<ProxyClass>> {
        let id = *self.by_name.get(name)?;
        self.get(id)
    }

    /// Number of installed proxies
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no proxy is installed
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// All installed proxies, sorted by name
    pub fn classes(&self) -> Vec<Arc<ProxyClass>> {
        let mut classes: Vec<_> = self.classes.iter().map(|e| e.value().clone()).collect();
        classes.sort_by(|a, b| a.name().cmp(b.name()));
        classes
    }

    /// Load a class by name, reusing an installed proxy when there is one
    ///
    /// # Returns
    /// * `Ok(Some(class))` - The class loaded
    /// * `Ok(None)` - No such class
    /// * `Err(exception)` - The class exists but failed to load
    pub fn load(
        &self,
        host: &dyn HostRuntime,
        name: &str,
    ) -> Result<Option<Arc<ProxyClass>>, ForeignException> {
        if let Some(class) = self.get_by_name(name) {
            return Ok(Some(class));
        }
        match host.load_class(name) {
            ClassLookup::Found(id) => self.intern(host, id).map(Some),
            ClassLookup::Missing => Ok(None),
            ClassLookup::Broken(exception) => Err(exception),
        }
    }

    /// Get or build the singleton proxy for a foreign class
    pub fn intern(
        &self,
        host: &dyn HostRuntime,
        id: ForeignClassId,
    ) -> Result<Arc<ProxyClass>, ForeignException> {
        if let Some(class) = self.get(id) {
            return Ok(class);
        }

        let info = host.describe_class(id)?;
        let superclass = match &info.superclass {
            Some(name) => Some(self.require(host, name)?),
            None => None,
        };
        let interfaces = info
            .interfaces
            .iter()
            .map(|name| self.require(host, name))
            .collect::<Result<Vec<_>, _>>()?;

        let candidate = ProxyClass::new(id, info, &self.root_module, superclass, interfaces);
        let class = self
            .classes
            .entry(id)
            .or_insert_with(|| Arc::new(candidate))
            .value()
            .clone();
        self.by_name.insert(class.name().to_string(), id);
        tracing::debug!(
            target: "crossway::classes",
            class = class.name(),
            capabilities = %class.capabilities(),
            "proxy class installed"
        );
        Ok(class)
    }

    fn require(&self, host: &dyn HostRuntime, name: &str) -> Result<Arc<ProxyClass>, ForeignException> {
        self.load(host, name)?.ok_or_else(|| {
            ForeignException::with_message("java.lang.NoClassDefFoundError", name)
        })
    }

    /// Drop cached negative nested lookups on every class
    pub fn forget_not_found(&self) -> usize {
        self.classes
            .iter()
            .map(|entry| entry.value().forget_nested_not_found())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Capability;
    use crate::host::memory::MemoryHost;

    #[test]
    fn test_intern_is_singleton() {
        let host = MemoryHost::new();
        let table = ClassTable::new("Java");

        let a = table.load(&host, "java.util.ArrayList").unwrap().unwrap();
        let b = table.load(&host, "java.util.ArrayList").unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&table.intern(&host, a.id()).unwrap(), &a));
        assert_eq!(host.lookup_count("java.util.ArrayList"), 1);
    }

    #[test]
    fn test_supertypes_share_handles() {
        let host = MemoryHost::new();
        let table = ClassTable::new("Java");

        let list = table.load(&host, "java.util.ArrayList").unwrap().unwrap();
        let object = table.get_by_name("java.lang.Object").unwrap();
        let root = list
            .ancestor_classes()
            .into_iter()
            .find(|c| c.name() == "java.lang.Object")
            .unwrap();
        assert!(Arc::ptr_eq(&object, &root));
        assert!(list.has_capability(Capability::List));
        assert!(list.has_capability(Capability::Iterable));
    }

    #[test]
    fn test_missing_and_broken() {
        let host = MemoryHost::new();
        host.define_class(crate::host::memory::ClassDef::new("BadStaticInit").failing_init("boom"));
        let table = ClassTable::new("Java");

        assert!(table.load(&host, "java.util.Nope").unwrap().is_none());
        let err = table.load(&host, "BadStaticInit").unwrap_err();
        assert_eq!(err.class_name, "java.lang.ExceptionInInitializerError");
        assert!(table.get_by_name("BadStaticInit").is_none());
    }
}
