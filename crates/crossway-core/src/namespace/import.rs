//! Package imports
//!
//! An [`ImportScope`] is what a guest module gets from `include_package` or
//! `import`: unqualified class names resolve through the imported packages,
//! in import order, and through individually imported classes.

use super::path::NamespacePath;
use super::resolver::NamespaceResolver;
use super::{PackageHandle, ResolutionOutcome};
use crate::error::{GuestError, GuestResult};
use crate::proxy::ProxyClass;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Packages and classes imported into one guest module
#[derive(Default)]
pub struct ImportScope {
    packages: RwLock<Vec<Arc<PackageHandle>>>,
    classes: RwLock<FxHashMap<String, Arc<ProxyClass>>>,
}

impl ImportScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Import every class of a package
    pub fn include_package(&self, package: Arc<PackageHandle>) {
        let mut packages = self.packages.write();
        if !packages.iter().any(|p| Arc::ptr_eq(p, &package)) {
            tracing::debug!(target: "crossway::resolver", package = %package.path(), "package imported");
            packages.push(package);
        }
    }

    /// Import a class under its simple name
    pub fn import_class(&self, class: Arc<ProxyClass>) {
        let simple = class
            .name()
            .rsplit(['.', '$'])
            .next()
            .unwrap_or_default()
            .to_string();
        self.classes.write().insert(simple, class);
    }

    /// Import a package or class given as a guest value
    pub fn import_value(&self, value: &Value) -> GuestResult<()> {
        match value {
            Value::Package(package) => self.include_package(package.clone()),
            Value::Class(class) => self.import_class(class.clone()),
            other => {
                return Err(GuestError::Type(format!(
                    "cannot import {}, expected a package or class",
                    other.type_name()
                )))
            }
        }
        Ok(())
    }

    /// Import a package or class given by dotted name
    ///
    /// # Arguments
    /// * `resolver` - Resolver the name goes through
    /// * `dotted` - Name such as `java.lang` or `java.util.ArrayList`
    ///
    /// # Returns
    /// * `Ok(Value)` - The imported package or class
    /// * `Err(GuestError)` - Malformed, absent or broken name
    pub fn import(&self, resolver: &NamespaceResolver, dotted: &str) -> GuestResult<Value> {
        let path = NamespacePath::parse(dotted).map_err(|e| GuestError::Argument(e.to_string()))?;
        let value = resolver.resolve(&path).into_value(dotted)?;
        self.import_value(&value)?;
        Ok(value)
    }

    /// Imported packages, in import order
    pub fn packages(&self) -> Vec<Arc<PackageHandle>> {
        self.packages.read().clone()
    }

    /// Check if nothing is imported
    pub fn is_empty(&self) -> bool {
        self.packages.read().is_empty() && self.classes.read().is_empty()
    }

    /// Resolve an unqualified class name
    ///
    /// Individually imported classes win; packages are searched in import
    /// order and the first class or load failure ends the search.
    pub fn resolve(&self, resolver: &NamespaceResolver, name: &str) -> ResolutionOutcome {
        if let Some(class) = self.classes.read().get(name) {
            return ResolutionOutcome::Class(class.clone());
        }
        for package in self.packages() {
            match resolver.resolve_segment(&package, name, false) {
                outcome @ (ResolutionOutcome::Class(_) | ResolutionOutcome::LoadError(_)) => return outcome,
                ResolutionOutcome::Package(_) | ResolutionOutcome::NotFound => {}
            }
        }
        ResolutionOutcome::NotFound
    }
}
