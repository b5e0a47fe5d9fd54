//! Proxy objects

use super::ProxyClass;
use crate::host::ObjectId;
use std::fmt;
use std::sync::Arc;

/// Guest-visible handle for one foreign instance
///
/// The handle does not keep the foreign object alive; it is valid exactly as
/// long as the host keeps the object.
#[derive(Clone)]
pub struct ProxyObject {
    id: ObjectId,
    class: Arc<ProxyClass>,
}

impl ProxyObject {
    /// Wrap a foreign instance of `class`
    pub fn new(id: ObjectId, class: Arc<ProxyClass>) -> Self {
        Self { id, class }
    }

    /// Foreign object identity
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Runtime class
    pub fn class(&self) -> &Arc<ProxyClass> {
        &self.class
    }

    /// Check membership by the cached supertype closure
    pub fn is_a(&self, class: &ProxyClass) -> bool {
        class.is_assignable_from(&self.class)
    }
}

impl PartialEq for ProxyObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProxyObject {}

impl fmt::Debug for ProxyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}:#{}>", self.class.name(), self.id.0)
    }
}
