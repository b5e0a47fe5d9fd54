//! Object heap for the in-memory host
//!
//! Objects are reference-counted cells keyed by [`ObjectId`]. The heap never
//! collects; ids stay valid for the lifetime of the host.

use crate::host::{ForeignCallback, ForeignClassId, HostValue, ObjectId};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-behavior instance state
pub enum ObjectState {
    /// Declared-methods-only object
    Plain,
    /// List elements
    List(Vec<HostValue>),
    /// Insertion-ordered entries
    Map(Vec<(HostValue, HostValue)>),
    /// Map entry
    Entry(HostValue, HostValue),
    /// Snapshot cursor (iterators, enumerations, tokenizers)
    Cursor {
        /// Remaining and consumed items
        items: Vec<HostValue>,
        /// Next position
        pos: usize,
    },
    /// Exception data
    Throwable {
        /// Message, absent when constructed without one
        message: Option<String>,
        /// Captured trace
        trace: Vec<String>,
    },
    /// Boxed comparable value
    Boxed(HostValue),
    /// Byte source
    Input {
        /// Bytes
        data: Vec<u8>,
        /// Read position
        pos: usize,
        /// Closed flag
        closed: bool,
    },
    /// Byte sink
    Output {
        /// Written bytes
        data: Vec<u8>,
        /// Closed flag
        closed: bool,
    },
    /// UTF-16 char source
    Reader {
        /// Code units
        data: Vec<u16>,
        /// Read position
        pos: usize,
        /// Closed flag
        closed: bool,
    },
    /// UTF-16 char sink
    Writer {
        /// Written code units
        data: Vec<u16>,
        /// Closed flag
        closed: bool,
    },
    /// Callback-backed interface implementation
    Callback(Arc<dyn ForeignCallback>),
}

impl fmt::Debug for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectState::Plain => write!(f, "Plain"),
            ObjectState::List(items) => f.debug_tuple("List").field(items).finish(),
            ObjectState::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            ObjectState::Entry(k, v) => f.debug_tuple("Entry").field(k).field(v).finish(),
            ObjectState::Cursor { items, pos } => f
                .debug_struct("Cursor")
                .field("items", items)
                .field("pos", pos)
                .finish(),
            ObjectState::Throwable { message, .. } => {
                f.debug_struct("Throwable").field("message", message).finish()
            }
            ObjectState::Boxed(v) => f.debug_tuple("Boxed").field(v).finish(),
            ObjectState::Input { data, pos, closed } => f
                .debug_struct("Input")
                .field("len", &data.len())
                .field("pos", pos)
                .field("closed", closed)
                .finish(),
            ObjectState::Output { data, closed } => f
                .debug_struct("Output")
                .field("len", &data.len())
                .field("closed", closed)
                .finish(),
            ObjectState::Reader { data, pos, closed } => f
                .debug_struct("Reader")
                .field("len", &data.len())
                .field("pos", pos)
                .field("closed", closed)
                .finish(),
            ObjectState::Writer { data, closed } => f
                .debug_struct("Writer")
                .field("len", &data.len())
                .field("closed", closed)
                .finish(),
            ObjectState::Callback(_) => write!(f, "Callback"),
        }
    }
}

/// A heap-allocated host object
#[derive(Debug)]
pub struct HostObject {
    /// Runtime class
    pub class: ForeignClassId,
    /// Instance state
    pub state: ObjectState,
}

/// Shared handle to a host object
pub type ObjectCell = Arc<Mutex<HostObject>>;

/// Object heap
#[derive(Debug)]
pub struct Heap {
    objects: RwLock<FxHashMap<ObjectId, ObjectCell>>,
    next_id: AtomicU64,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate an object and return its id
    pub fn alloc(&self, class: ForeignClassId, state: ObjectState) -> ObjectId {
        let id = ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cell = Arc::new(Mutex::new(HostObject { class, state }));
        self.objects.write().insert(id, cell);
        id
    }

    /// Get an object cell
    pub fn get(&self, id: ObjectId) -> Option<ObjectCell> {
        self.objects.read().get(&id).cloned()
    }

    /// Get the runtime class of an object
    pub fn class_of(&self, id: ObjectId) -> Option<ForeignClassId> {
        self.get(id).map(|cell| cell.lock().class)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Check if the heap is empty
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
