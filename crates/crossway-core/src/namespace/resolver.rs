//! Namespace resolver
//!
//! Resolution of one segment under a package follows a fixed precedence:
//!
//! 1. a cached outcome, failures included
//! 2. a loadable class, wrapped in its singleton [`ProxyClass`]
//! 3. a load failure, which is never demoted to a package or to "not found"
//! 4. a package, when the host reports one or the segment is package-like
//! 5. not found
//!
//! String paths (`"java.util.zip"`) and symbolic chains (`Java::JavaUtilZip`,
//! `Java::java::util::zip`) share the same handles and caches.

use super::package::PackageHandle;
use super::path::{decode_camel, encode_camel, is_constant_like, is_identifier, is_package_like, NamespacePath, PathError};
use super::{LoadFailure, ResolutionOutcome};
use crate::host::HostRuntime;
use crate::proxy::{ClassTable, ProxyClass};
use dashmap::DashMap;
use std::sync::Arc;

/// Lazily resolves and caches namespace paths
pub struct NamespaceResolver {
    host: Arc<dyn HostRuntime>,
    classes: Arc<ClassTable>,
    root_module: String,
    root: Arc<PackageHandle>,
    packages: DashMap<NamespacePath, Arc<PackageHandle>>,
    constants: DashMap<String, ResolutionOutcome>,
}

impl NamespaceResolver {
    /// Create a resolver with an empty cache
    ///
    /// # Arguments
    /// * `host` - Host runtime classes are loaded from
    /// * `classes` - Singleton class table shared with the rest of the bridge
    /// * `root_module` - Guest name of the root namespace (`Java`)
    pub fn new(host: Arc<dyn HostRuntime>, classes: Arc<ClassTable>, root_module: &str) -> Self {
        Self {
            host,
            classes,
            root_module: root_module.to_string(),
            root: Arc::new(PackageHandle::new(NamespacePath::root(), false, root_module)),
            packages: DashMap::new(),
            constants: DashMap::new(),
        }
    }

    /// The root namespace handle
    pub fn root(&self) -> &Arc<PackageHandle> {
        &self.root
    }

    /// Guest name of the root namespace
    pub fn root_module(&self) -> &str {
        &self.root_module
    }

    /// The class table
    pub fn classes(&self) -> &Arc<ClassTable> {
        &self.classes
    }

    /// Canonical handle for a package path, created on first reference
    pub fn package(&self, path: &NamespacePath) -> Arc<PackageHandle> {
        if path.is_root() {
            return self.root.clone();
        }
        if let Some(existing) = self.packages.get(path) {
            return existing.value().clone();
        }
        let explicit = self.host.package_exists(&path.to_dotted());
        self.install_package(path, explicit)
    }

    fn install_package(&self, path: &NamespacePath, explicit: bool) -> Arc<PackageHandle> {
        self.packages
            .entry(path.clone())
            .or_insert_with(|| {
                tracing::debug!(target: "crossway::resolver", package = %path, explicit, "package handle created");
                Arc::new(PackageHandle::new(path.clone(), explicit, &self.root_module))
            })
            .value()
            .clone()
    }

    /// Handles of every package referenced so far, sorted by path
    pub fn packages(&self) -> Vec<Arc<PackageHandle>> {
        let mut packages: Vec<_> = self.packages.iter().map(|e| e.value().clone()).collect();
        packages.sort_by(|a, b| a.path().cmp(b.path()));
        packages
    }

    /// Resolve a path from the root namespace
    pub fn resolve(&self, path: &NamespacePath) -> ResolutionOutcome {
        self.resolve_from(&self.root, path)
    }

    /// Resolve a dotted string from the root namespace
    pub fn resolve_str(&self, dotted: &str) -> Result<ResolutionOutcome, PathError> {
        let path = NamespacePath::parse(dotted)?;
        Ok(self.resolve(&path))
    }

    /// Resolve a path relative to a package
    ///
    /// Segments after a class are looked up as nested classes.
    pub fn resolve_from(&self, from: &Arc<PackageHandle>, path: &NamespacePath) -> ResolutionOutcome {
        let mut outcome = ResolutionOutcome::Package(from.clone());
        for segment in path.segments() {
            let next = match &outcome {
                ResolutionOutcome::Package(package) => self.resolve_segment(package, segment, false),
                ResolutionOutcome::Class(class) => self.resolve_nested(class, segment, false),
                ResolutionOutcome::NotFound | ResolutionOutcome::LoadError(_) => break,
            };
            outcome = next;
        }
        outcome
    }

    /// Resolve one segment under a package
    ///
    /// Packages have no supertypes, so `inherit` only matters once the
    /// segment names a class (see [`Self::resolve_nested`]).
    pub fn resolve_segment(&self, handle: &Arc<PackageHandle>, segment: &str, inherit: bool) -> ResolutionOutcome {
        if let Some(hit) = handle.cached(segment) {
            tracing::trace!(target: "crossway::resolver", package = %handle.path(), segment, inherit, kind = hit.kind(), "cache hit");
            return hit;
        }
        if !is_identifier(segment) {
            return ResolutionOutcome::NotFound;
        }

        let name = handle.path().qualify(segment);
        let outcome = match self.classes.load(self.host.as_ref(), &name) {
            Ok(Some(class)) => ResolutionOutcome::Class(class),
            Err(exception) => {
                tracing::warn!(target: "crossway::resolver", name = %name, error = %exception, "class failed to load");
                ResolutionOutcome::LoadError(LoadFailure { name, exception })
            }
            Ok(None) => {
                let explicit = self.host.package_exists(&name);
                if explicit || is_package_like(segment) {
                    ResolutionOutcome::Package(self.install_package(&handle.path().child(segment), explicit))
                } else {
                    ResolutionOutcome::NotFound
                }
            }
        };
        tracing::debug!(target: "crossway::resolver", package = %handle.path(), segment, kind = outcome.kind(), "resolved");
        handle.install(segment, outcome)
    }

    /// Resolve a guest constant under a package
    ///
    /// Under the root, a capitalised constant first names a default-package
    /// class; only when no such class exists is it decoded as a CamelCase
    /// package path (`JavaUtilZip` is `java.util.zip`). Elsewhere constants
    /// resolve like plain segments.
    pub fn resolve_constant(&self, handle: &Arc<PackageHandle>, constant: &str) -> ResolutionOutcome {
        if !handle.is_root() || !is_constant_like(constant) {
            return self.resolve_segment(handle, constant, false);
        }
        if let Some(hit) = self.constants.get(constant) {
            return hit.value().clone();
        }

        let outcome = match self.resolve_segment(handle, constant, false) {
            ResolutionOutcome::NotFound => {
                let path = decode_camel(constant);
                match self.resolve(&path) {
                    // a camel constant names a package, never a class
                    ResolutionOutcome::Class(_) => ResolutionOutcome::NotFound,
                    other => other,
                }
            }
            other => other,
        };
        self.constants
            .entry(constant.to_string())
            .or_insert(outcome)
            .value()
            .clone()
    }

    /// Resolve a nested class (`Outer$Inner`) through a class
    ///
    /// With `inherit`, supertypes are searched too, nearest first.
    pub fn resolve_nested(&self, class: &Arc<ProxyClass>, name: &str, inherit: bool) -> ResolutionOutcome {
        if let Some(hit) = class.cached_nested(name, inherit) {
            return hit;
        }

        let mut outcome = self.load_nested(class, name);
        if inherit && outcome.is_not_found() {
            for ancestor in class.ancestor_classes() {
                outcome = self.resolve_nested(&ancestor, name, false);
                if !outcome.is_not_found() {
                    break;
                }
            }
        }
        class.install_nested(name, inherit, outcome)
    }

    fn load_nested(&self, class: &Arc<ProxyClass>, name: &str) -> ResolutionOutcome {
        if !is_identifier(name) {
            return ResolutionOutcome::NotFound;
        }
        let nested = format!("{}${}", class.name(), name);
        match self.classes.load(self.host.as_ref(), &nested) {
            Ok(Some(inner)) => ResolutionOutcome::Class(inner),
            Ok(None) => ResolutionOutcome::NotFound,
            Err(exception) => {
                tracing::warn!(target: "crossway::resolver", name = %nested, error = %exception, "nested class failed to load");
                ResolutionOutcome::LoadError(LoadFailure {
                    name: nested,
                    exception,
                })
            }
        }
    }

    /// Drop the cached outcome for one path
    ///
    /// This is the only way a cached load failure is retried. Returns whether
    /// anything was cached.
    pub fn invalidate(&self, path: &NamespacePath) -> bool {
        let Some(last) = path.last() else {
            return false;
        };
        let parent = path.parent().unwrap_or_default();
        let mut dropped = self.package(&parent).forget(last).is_some();
        dropped |= self.constants.remove(&encode_camel(path)).is_some();
        tracing::debug!(target: "crossway::resolver", path = %path, dropped, "invalidated");
        dropped
    }

    /// Drop every cached `NotFound`, keeping load failures
    pub fn forget_not_found(&self) -> usize {
        let mut dropped = self.root.forget_not_found();
        for package in self.packages.iter() {
            dropped += package.value().forget_not_found();
        }
        let before = self.constants.len();
        self.constants.retain(|_, outcome| !outcome.is_not_found());
        dropped += before - self.constants.len();
        dropped += self.classes.forget_not_found();
        tracing::debug!(target: "crossway::resolver", dropped, "negative lookups forgotten");
        dropped
    }
}
