//! Package handles

use super::path::NamespacePath;
use super::ResolutionOutcome;
use dashmap::DashMap;
use std::fmt;

/// A resolved (or resolvable) namespace node
///
/// Handles are created on first reference and live for the rest of the
/// process. The child cache maps the next segment to its outcome.
pub struct PackageHandle {
    path: NamespacePath,
    explicit: bool,
    guest_name: String,
    children: DashMap<String, ResolutionOutcome>,
}

impl PackageHandle {
    /// Create a handle
    ///
    /// # Arguments
    /// * `path` - Package path
    /// * `explicit` - Whether the host has a package object for the path
    /// * `root_module` - Guest root module name, for the guest name
    pub fn new(path: NamespacePath, explicit: bool, root_module: &str) -> Self {
        let guest_name = path.guest_name(root_module);
        Self {
            path,
            explicit,
            guest_name,
            children: DashMap::new(),
        }
    }

    /// Package path
    pub fn path(&self) -> &NamespacePath {
        &self.path
    }

    /// Dotted package name
    pub fn name(&self) -> String {
        self.path.to_dotted()
    }

    /// Guest constant name, e.g. `Java::JavaUtilZip`
    pub fn guest_name(&self) -> &str {
        &self.guest_name
    }

    /// Check if this is the root namespace
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    /// Check whether the host reported an explicit package object
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Cached outcome for a child segment
    pub fn cached(&self, segment: &str) -> Option<ResolutionOutcome> {
        self.children.get(segment).map(|entry| entry.value().clone())
    }

    /// Install an outcome unless another thread got there first
    ///
    /// Returns the canonical outcome for the segment.
    pub fn install(&self, segment: &str, outcome: ResolutionOutcome) -> ResolutionOutcome {
        self.children
            .entry(segment.to_string())
            .or_insert(outcome)
            .value()
            .clone()
    }

    /// Drop the cached outcome for a segment
    pub fn forget(&self, segment: &str) -> Option<ResolutionOutcome> {
        self.children.remove(segment).map(|(_, outcome)| outcome)
    }

    /// Drop every cached `NotFound`, returning how many were dropped
    pub fn forget_not_found(&self) -> usize {
        let before = self.children.len();
        self.children.retain(|_, outcome| !outcome.is_not_found());
        before - self.children.len()
    }

    /// Cached segments and their outcomes
    pub fn cached_entries(&self) -> Vec<(String, ResolutionOutcome)> {
        let mut entries: Vec<_> = self
            .children
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl fmt::Debug for PackageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageHandle")
            .field("path", &self.path.to_dotted())
            .field("explicit", &self.explicit)
            .field("cached", &self.children.len())
            .finish()
    }
}
