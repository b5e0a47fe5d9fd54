//! In-memory host runtime
//!
//! [`MemoryHost`] implements [`HostRuntime`] without a real foreign VM. It
//! models just enough of a JDK to exercise every bridge path:
//! - a classpath with visible classes and not-yet-appended archives
//! - static initializers that fail (first `ExceptionInInitializerError`,
//!   then `NoClassDefFoundError`, as a JVM reports them)
//! - native behaviors for lists, maps, cursors, throwables, boxed
//!   comparables and byte streams
//! - callback-backed interface implementations
//!
//! Lookups are counted per class name so tests can observe caching.

pub mod classes;
pub mod heap;
pub mod manifest;

pub use classes::{jdk_classes, Behavior, ClassDef, Literal, MethodDef};
pub use heap::{Heap, HostObject, ObjectState};
pub use manifest::{ArchiveDef, HostManifest, ManifestError};

use crate::host::{
    ClassLookup, ForeignCallback, ForeignClassId, ForeignClassInfo, ForeignException,
    HostRuntime, HostValue, ObjectId,
};
use classes::{ARRAY_LIST, LIST_ITERATOR, MAP_ENTRY, SET_VIEW, VALUES_VIEW};
use dashmap::DashMap;
use heap::ObjectCell;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

type HostResult<T> = Result<T, ForeignException>;

#[derive(Default)]
struct ClassSpace {
    defs: Vec<Arc<ClassDef>>,
    visible: FxHashMap<String, ForeignClassId>,
    archives: FxHashMap<PathBuf, Vec<ClassDef>>,
}

/// In-memory host runtime with a JDK-like class set
pub struct MemoryHost {
    classes: RwLock<ClassSpace>,
    heap: Heap,
    init_failed: Mutex<FxHashSet<ForeignClassId>>,
    lookups: DashMap<String, usize>,
    properties: RwLock<FxHashMap<String, String>>,
    proxy_counter: AtomicU64,
}

impl MemoryHost {
    /// Create a host with the built-in JDK classes on the classpath
    pub fn new() -> Self {
        let host = Self::empty();
        for def in jdk_classes() {
            host.define_class(def);
        }
        host
    }

    /// Create a host with no classes at all
    pub fn empty() -> Self {
        Self {
            classes: RwLock::new(ClassSpace::default()),
            heap: Heap::new(),
            init_failed: Mutex::new(FxHashSet::default()),
            lookups: DashMap::new(),
            properties: RwLock::new(FxHashMap::default()),
            proxy_counter: AtomicU64::new(0),
        }
    }

    /// Create a JDK host extended with a manifest's classes and archives
    pub fn from_manifest(manifest: &HostManifest) -> Self {
        let host = Self::new();
        for (key, value) in &manifest.properties {
            host.set_property(key, value);
        }
        for def in &manifest.classes {
            host.define_class(def.clone());
        }
        for archive in &manifest.archives {
            host.define_archive(&archive.location, archive.classes.clone());
        }
        host
    }

    /// Put a class on the classpath
    ///
    /// Defining a name twice keeps the first definition.
    pub fn define_class(&self, def: ClassDef) -> ForeignClassId {
        let mut space = self.classes.write();
        if let Some(id) = space.visible.get(&def.name) {
            return *id;
        }
        let id = ForeignClassId(space.defs.len() as u64);
        space.visible.insert(def.name.clone(), id);
        space.defs.push(Arc::new(def));
        id
    }

    /// Register classes that become loadable once `location` is appended to
    /// the classpath
    pub fn define_archive(&self, location: impl AsRef<Path>, defs: Vec<ClassDef>) {
        self.classes
            .write()
            .archives
            .entry(location.as_ref().to_path_buf())
            .or_default()
            .extend(defs);
    }

    /// Set a system property
    pub fn set_property(&self, key: &str, value: &str) {
        self.properties
            .write()
            .insert(key.to_string(), value.to_string());
    }

    /// Number of `load_class` requests seen for `name`
    pub fn lookup_count(&self, name: &str) -> usize {
        self.lookups.get(name).map_or(0, |count| *count)
    }

    /// The object heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Check whether a stream object has been closed
    pub fn is_closed(&self, stream: ObjectId) -> Option<bool> {
        let cell = self.heap.get(stream)?;
        let guard = cell.lock();
        match &guard.state {
            ObjectState::Input { closed, .. }
            | ObjectState::Output { closed, .. }
            | ObjectState::Reader { closed, .. }
            | ObjectState::Writer { closed, .. } => Some(*closed),
            _ => None,
        }
    }

    fn def(&self, id: ForeignClassId) -> Option<Arc<ClassDef>> {
        self.classes.read().defs.get(id.0 as usize).cloned()
    }

    fn id_of(&self, name: &str) -> Option<ForeignClassId> {
        self.classes.read().visible.get(name).copied()
    }

    fn def_by_name(&self, name: &str) -> Option<Arc<ClassDef>> {
        self.id_of(name).and_then(|id| self.def(id))
    }

    /// All supertype names of a class, the class itself included
    fn ancestors(&self, class: ForeignClassId) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut queue: VecDeque<Arc<ClassDef>> = self.def(class).into_iter().collect();
        while let Some(def) = queue.pop_front() {
            if seen.contains(&def.name) {
                continue;
            }
            seen.push(def.name.clone());
            let supers = def.effective_superclass().into_iter().chain(def.interfaces.iter().cloned());
            queue.extend(supers.filter_map(|name| self.def_by_name(&name)));
        }
        seen
    }

    /// Build an exception, allocating the exception object when its class is
    /// on the classpath
    fn raise(&self, class_name: &str, message: Option<String>) -> ForeignException {
        let trace = vec![format!("{}.<init>(MemoryHost)", class_name)];
        let object = self.id_of(class_name).map(|class| {
            self.heap.alloc(
                class,
                ObjectState::Throwable {
                    message: message.clone(),
                    trace: trace.clone(),
                },
            )
        });
        ForeignException {
            class_name: class_name.to_string(),
            message,
            stack_trace: trace,
            object,
        }
    }

    fn illegal_argument(&self, class: &str, method: &str) -> ForeignException {
        self.raise(
            "java.lang.IllegalArgumentException",
            Some(format!("argument type mismatch for {}.{}", class, method)),
        )
    }

    fn alloc_named(&self, class_name: &str, state: ObjectState) -> HostResult<ObjectId> {
        let class = self.id_of(class_name).ok_or_else(|| {
            self.raise("java.lang.NoClassDefFoundError", Some(class_name.to_string()))
        })?;
        Ok(self.heap.alloc(class, state))
    }

    fn cell(&self, id: ObjectId) -> HostResult<ObjectCell> {
        self.heap.get(id).ok_or_else(|| {
            self.raise(
                "java.lang.NullPointerException",
                Some(format!("no live object #{}", id.0)),
            )
        })
    }

    fn check_index(&self, index: i64, len: i64) -> HostResult<usize> {
        if index < 0 || index >= len {
            return Err(self.raise(
                "java.lang.IndexOutOfBoundsException",
                Some(format!("Index {} out of bounds for length {}", index, len)),
            ));
        }
        Ok(index as usize)
    }

    /// Host-level equality (`Object.equals`)
    fn values_equal(&self, a: &HostValue, b: &HostValue) -> bool {
        match (a, b) {
            (HostValue::Object(x), HostValue::Object(y)) if x == y => true,
            (HostValue::Object(x), HostValue::Object(y)) => {
                match (self.snapshot(*x), self.snapshot(*y)) {
                    (Some(Snapshot::Boxed(p)), Some(Snapshot::Boxed(q))) => {
                        self.values_equal(&p, &q)
                    }
                    (Some(Snapshot::List(p)), Some(Snapshot::List(q))) => {
                        p.len() == q.len()
                            && p.iter().zip(&q).all(|(l, r)| self.values_equal(l, r))
                    }
                    (Some(Snapshot::Map(p)), Some(Snapshot::Map(q))) => {
                        p.len() == q.len()
                            && p.iter().all(|(k, v)| {
                                q.iter()
                                    .any(|(k2, v2)| self.values_equal(k, k2) && self.values_equal(v, v2))
                            })
                    }
                    (Some(Snapshot::Entry(k1, v1)), Some(Snapshot::Entry(k2, v2))) => {
                        self.values_equal(&k1, &k2) && self.values_equal(&v1, &v2)
                    }
                    _ => false,
                }
            }
            (HostValue::Int(x), HostValue::Double(y)) | (HostValue::Double(y), HostValue::Int(x)) => {
                (*x as f64) == *y
            }
            _ => a == b,
        }
    }

    fn snapshot(&self, id: ObjectId) -> Option<Snapshot> {
        let cell = self.heap.get(id)?;
        let guard = cell.lock();
        match &guard.state {
            ObjectState::Boxed(v) => Some(Snapshot::Boxed(v.clone())),
            ObjectState::List(items) => Some(Snapshot::List(items.clone())),
            ObjectState::Map(entries) => Some(Snapshot::Map(entries.clone())),
            ObjectState::Entry(k, v) => Some(Snapshot::Entry(k.clone(), v.clone())),
            _ => None,
        }
    }

    /// Natural ordering (`Comparable.compareTo`)
    fn natural_compare(&self, a: &HostValue, b: &HostValue) -> HostResult<Ordering> {
        let unbox = |v: &HostValue| match v {
            HostValue::Object(id) => match self.snapshot(*id) {
                Some(Snapshot::Boxed(inner)) => inner,
                _ => v.clone(),
            },
            other => other.clone(),
        };
        match (unbox(a), unbox(b)) {
            (HostValue::Null, _) | (_, HostValue::Null) => {
                Err(self.raise("java.lang.NullPointerException", None))
            }
            (HostValue::Int(x), HostValue::Int(y)) => Ok(x.cmp(&y)),
            (HostValue::Int(x), HostValue::Double(y)) => Ok((x as f64).total_cmp(&y)),
            (HostValue::Double(x), HostValue::Int(y)) => Ok(x.total_cmp(&(y as f64))),
            (HostValue::Double(x), HostValue::Double(y)) => Ok(x.total_cmp(&y)),
            (HostValue::Str(x), HostValue::Str(y)) => Ok(x.cmp(&y)),
            (HostValue::Bool(x), HostValue::Bool(y)) => Ok(x.cmp(&y)),
            (x, y) => Err(self.raise(
                "java.lang.ClassCastException",
                Some(format!("{} cannot be compared to {}", x.type_name(), y.type_name())),
            )),
        }
    }

    /// Elements of a collection-like object
    fn elements_of(&self, id: ObjectId) -> HostResult<Vec<HostValue>> {
        let cell = self.cell(id)?;
        let guard = cell.lock();
        match &guard.state {
            ObjectState::List(items) => Ok(items.clone()),
            ObjectState::Cursor { items, pos } => Ok(items[*pos..].to_vec()),
            _ => {
                drop(guard);
                Err(self.raise(
                    "java.lang.ClassCastException",
                    Some(format!("object #{} is not a java.util.Collection", id.0)),
                ))
            }
        }
    }

    /// Entries of a map object
    fn entries_of(&self, id: ObjectId) -> HostResult<Vec<(HostValue, HostValue)>> {
        match self.snapshot(id) {
            Some(Snapshot::Map(entries)) => Ok(entries),
            _ => Err(self.raise(
                "java.lang.ClassCastException",
                Some(format!("object #{} is not a java.util.Map", id.0)),
            )),
        }
    }

    fn display(&self, value: &HostValue) -> String {
        match value {
            HostValue::Null => "null".to_string(),
            HostValue::Bool(b) => b.to_string(),
            HostValue::Int(i) => i.to_string(),
            HostValue::Double(d) => d.to_string(),
            HostValue::Str(s) => s.clone(),
            HostValue::Object(id) => match self.invoke(*id, "toString", &[]) {
                Ok(HostValue::Str(s)) => s,
                _ => format!("#{}", id.0),
            },
        }
    }

    fn with_list<R>(&self, cell: &ObjectCell, f: impl FnOnce(&mut Vec<HostValue>) -> R) -> Option<R> {
        match &mut cell.lock().state {
            ObjectState::List(items) => Some(f(items)),
            _ => None,
        }
    }

    fn with_map<R>(
        &self,
        cell: &ObjectCell,
        f: impl FnOnce(&mut Vec<(HostValue, HostValue)>) -> R,
    ) -> Option<R> {
        match &mut cell.lock().state {
            ObjectState::Map(entries) => Some(f(entries)),
            _ => None,
        }
    }

    fn list_call(
        &self,
        cell: &ObjectCell,
        method: &str,
        args: &[HostValue],
    ) -> HostResult<Option<HostValue>> {
        let items = match &cell.lock().state {
            ObjectState::List(items) => items.clone(),
            _ => return Ok(None),
        };
        let len = items.len() as i64;
        let position = |needle: &HostValue| items.iter().position(|x| self.values_equal(x, needle));

        let result = match (method, args) {
            ("size", []) => HostValue::Int(len),
            ("isEmpty", []) => HostValue::Bool(items.is_empty()),
            ("get", [HostValue::Int(i)]) => items[self.check_index(*i, len)?].clone(),
            ("set", [HostValue::Int(i), value]) => {
                let idx = self.check_index(*i, len)?;
                self.with_list(cell, |list| std::mem::replace(&mut list[idx], value.clone()))
                    .unwrap_or(HostValue::Null)
            }
            ("add", [value]) => {
                self.with_list(cell, |list| list.push(value.clone()));
                HostValue::Bool(true)
            }
            ("add", [HostValue::Int(i), value]) => {
                if *i < 0 || *i > len {
                    return Err(self.raise(
                        "java.lang.IndexOutOfBoundsException",
                        Some(format!("Index: {}, Size: {}", i, len)),
                    ));
                }
                self.with_list(cell, |list| list.insert(*i as usize, value.clone()));
                HostValue::Null
            }
            ("remove", [HostValue::Int(i)]) => {
                let idx = self.check_index(*i, len)?;
                self.with_list(cell, |list| list.remove(idx))
                    .unwrap_or(HostValue::Null)
            }
            ("remove", [value]) => match position(value) {
                Some(idx) => {
                    self.with_list(cell, |list| list.remove(idx));
                    HostValue::Bool(true)
                }
                None => HostValue::Bool(false),
            },
            ("addAll", [HostValue::Object(other)]) => {
                let extra = self.elements_of(*other)?;
                let changed = !extra.is_empty();
                self.with_list(cell, |list| list.extend(extra));
                HostValue::Bool(changed)
            }
            ("removeAll", [HostValue::Object(other)]) => {
                let remove = self.elements_of(*other)?;
                let kept: Vec<HostValue> = items
                    .iter()
                    .filter(|x| !remove.iter().any(|r| self.values_equal(x, r)))
                    .cloned()
                    .collect();
                let changed = kept.len() != items.len();
                self.with_list(cell, |list| *list = kept);
                HostValue::Bool(changed)
            }
            ("contains", [value]) => HostValue::Bool(position(value).is_some()),
            ("indexOf", [value]) => HostValue::Int(position(value).map_or(-1, |i| i as i64)),
            ("lastIndexOf", [value]) => HostValue::Int(
                items
                    .iter()
                    .rposition(|x| self.values_equal(x, value))
                    .map_or(-1, |i| i as i64),
            ),
            ("iterator", []) => HostValue::Object(
                self.alloc_named(LIST_ITERATOR, ObjectState::Cursor { items, pos: 0 })?,
            ),
            ("subList", [HostValue::Int(from), HostValue::Int(to)]) => {
                if *from < 0 || *to > len || from > to {
                    return Err(self.raise(
                        "java.lang.IndexOutOfBoundsException",
                        Some(format!("fromIndex: {}, toIndex: {}, size: {}", from, to, len)),
                    ));
                }
                let slice = items[*from as usize..*to as usize].to_vec();
                HostValue::Object(self.alloc_named(ARRAY_LIST, ObjectState::List(slice))?)
            }
            ("clear", []) => {
                self.with_list(cell, Vec::clear);
                HostValue::Null
            }
            ("ensureCapacity", [_]) => HostValue::Null,
            ("toString", []) => HostValue::Str(format!(
                "[{}]",
                items.iter().map(|v| self.display(v)).collect::<Vec<_>>().join(", ")
            )),
            _ => return Ok(None),
        };
        Ok(Some(result))
    }

    fn map_call(
        &self,
        cell: &ObjectCell,
        method: &str,
        args: &[HostValue],
    ) -> HostResult<Option<HostValue>> {
        let entries = match &cell.lock().state {
            ObjectState::Map(entries) => entries.clone(),
            _ => return Ok(None),
        };
        let find = |key: &HostValue| entries.iter().position(|(k, _)| self.values_equal(k, key));

        let result = match (method, args) {
            ("size", []) => HostValue::Int(entries.len() as i64),
            ("isEmpty", []) => HostValue::Bool(entries.is_empty()),
            ("get", [key]) => find(key).map_or(HostValue::Null, |i| entries[i].1.clone()),
            ("put", [key, value]) => match find(key) {
                Some(i) => self
                    .with_map(cell, |map| std::mem::replace(&mut map[i].1, value.clone()))
                    .unwrap_or(HostValue::Null),
                None => {
                    self.with_map(cell, |map| map.push((key.clone(), value.clone())));
                    HostValue::Null
                }
            },
            ("remove", [key]) => match find(key) {
                Some(i) => self
                    .with_map(cell, |map| map.remove(i).1)
                    .unwrap_or(HostValue::Null),
                None => HostValue::Null,
            },
            ("containsKey", [key]) => HostValue::Bool(find(key).is_some()),
            ("containsValue", [value]) => {
                HostValue::Bool(entries.iter().any(|(_, v)| self.values_equal(v, value)))
            }
            ("entrySet", []) => {
                let mut views = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    let entry = self.alloc_named(MAP_ENTRY, ObjectState::Entry(k, v))?;
                    views.push(HostValue::Object(entry));
                }
                HostValue::Object(self.alloc_named(SET_VIEW, ObjectState::List(views))?)
            }
            ("keySet", []) => {
                let keys = entries.into_iter().map(|(k, _)| k).collect();
                HostValue::Object(self.alloc_named(SET_VIEW, ObjectState::List(keys))?)
            }
            ("values", []) => {
                let values = entries.into_iter().map(|(_, v)| v).collect();
                HostValue::Object(self.alloc_named(VALUES_VIEW, ObjectState::List(values))?)
            }
            ("clear", []) => {
                self.with_map(cell, Vec::clear);
                HostValue::Null
            }
            ("putAll", [HostValue::Object(other)]) => {
                for (k, v) in self.entries_of(*other)? {
                    self.map_call(cell, "put", &[k, v])?;
                }
                HostValue::Null
            }
            ("toString", []) => HostValue::Str(format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{}={}", self.display(k), self.display(v)))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            _ => return Ok(None),
        };
        Ok(Some(result))
    }

    fn cursor_call(
        &self,
        cell: &ObjectCell,
        behavior: Behavior,
        method: &str,
    ) -> HostResult<Option<HostValue>> {
        enum Op {
            HasNext,
            Next,
            Count,
        }
        let op = match (behavior, method) {
            (Behavior::Iterator, "hasNext") => Op::HasNext,
            (Behavior::Iterator, "next") => Op::Next,
            (Behavior::Enumeration | Behavior::Tokenizer, "hasMoreElements") => Op::HasNext,
            (Behavior::Enumeration | Behavior::Tokenizer, "nextElement") => Op::Next,
            (Behavior::Tokenizer, "hasMoreTokens") => Op::HasNext,
            (Behavior::Tokenizer, "nextToken") => Op::Next,
            (Behavior::Tokenizer, "countTokens") => Op::Count,
            _ => return Ok(None),
        };
        let mut guard = cell.lock();
        let ObjectState::Cursor { items, pos } = &mut guard.state else {
            return Ok(None);
        };
        let result = match op {
            Op::HasNext => HostValue::Bool(*pos < items.len()),
            Op::Count => HostValue::Int((items.len() - *pos) as i64),
            Op::Next => match items.get(*pos).cloned() {
                Some(item) => {
                    *pos += 1;
                    item
                }
                None => {
                    drop(guard);
                    return Err(self.raise("java.util.NoSuchElementException", None));
                }
            },
        };
        Ok(Some(result))
    }

    fn instance_call(
        &self,
        target: ObjectId,
        cell: &ObjectCell,
        behavior: Behavior,
        method: &str,
        args: &[HostValue],
    ) -> HostResult<Option<HostValue>> {
        match behavior {
            Behavior::List => return self.list_call(cell, method, args),
            Behavior::Map => return self.map_call(cell, method, args),
            Behavior::Iterator | Behavior::Enumeration | Behavior::Tokenizer => {
                return self.cursor_call(cell, behavior, method)
            }
            Behavior::Callback => {
                if matches!(method, "equals" | "hashCode" | "toString") {
                    return Ok(None);
                }
                let callback = match &cell.lock().state {
                    ObjectState::Callback(cb) => cb.clone(),
                    _ => return Ok(None),
                };
                return callback.call(method, args).map(Some);
            }
            _ => {}
        }

        let mut guard = cell.lock();
        let class = guard.class;
        let result = match (&mut guard.state, method, args) {
            (ObjectState::Entry(k, _), "getKey", []) => k.clone(),
            (ObjectState::Entry(_, v), "getValue", []) => v.clone(),
            (ObjectState::Entry(_, v), "setValue", [value]) => std::mem::replace(v, value.clone()),
            (ObjectState::Throwable { message, .. }, "getMessage" | "getLocalizedMessage", []) => {
                message.clone().map_or(HostValue::Null, HostValue::Str)
            }
            (ObjectState::Throwable { trace, .. }, "getStackTrace", []) => {
                let frames = trace.iter().cloned().map(HostValue::Str).collect();
                drop(guard);
                return Ok(Some(HostValue::Object(
                    self.alloc_named(ARRAY_LIST, ObjectState::List(frames))?,
                )));
            }
            (ObjectState::Throwable { message, .. }, "toString", []) => {
                let name = self.def(class).map(|d| d.name.clone()).unwrap_or_default();
                HostValue::Str(match message {
                    Some(m) => format!("{}: {}", name, m),
                    None => name,
                })
            }
            (ObjectState::Boxed(inner), "compareTo", [other]) => {
                let inner = inner.clone();
                drop(guard);
                let ord = self.natural_compare(&inner, other)?;
                return Ok(Some(HostValue::Int(ord as i64)));
            }
            (ObjectState::Boxed(inner), "equals", [other]) => {
                let inner = inner.clone();
                drop(guard);
                let equal = self.values_equal(&HostValue::Object(target), other)
                    || self.values_equal(&inner, other);
                return Ok(Some(HostValue::Bool(equal)));
            }
            (ObjectState::Boxed(inner), "intValue" | "longValue", []) => match inner {
                HostValue::Double(d) => HostValue::Int(*d as i64),
                other => other.clone(),
            },
            (ObjectState::Boxed(inner), "doubleValue", []) => match inner {
                HostValue::Int(i) => HostValue::Double(*i as f64),
                other => other.clone(),
            },
            (ObjectState::Boxed(inner), "hashCode", []) => match inner {
                HostValue::Int(i) => HostValue::Int(*i),
                HostValue::Str(s) => HostValue::Int(s.len() as i64),
                _ => HostValue::Int(0),
            },
            (ObjectState::Boxed(inner), "toString", []) => {
                let inner = inner.clone();
                drop(guard);
                return Ok(Some(HostValue::Str(self.display(&inner))));
            }
            (ObjectState::Input { closed: true, .. }, "read" | "available", _)
            | (ObjectState::Output { closed: true, .. }, "write", _)
            | (ObjectState::Reader { closed: true, .. }, "read" | "ready", _)
            | (ObjectState::Writer { closed: true, .. }, "write" | "append", _) => {
                drop(guard);
                return Err(self.raise("java.io.IOException", Some("Stream closed".to_string())));
            }
            (ObjectState::Input { data, pos, .. }, "read", []) => match data.get(*pos) {
                Some(byte) => {
                    *pos += 1;
                    HostValue::Int(i64::from(*byte))
                }
                None => HostValue::Int(-1),
            },
            (ObjectState::Input { data, pos, .. }, "available", []) => {
                HostValue::Int((data.len() - *pos) as i64)
            }
            (ObjectState::Output { data, .. }, "write", [HostValue::Int(b)]) => {
                data.push((*b & 0xff) as u8);
                HostValue::Null
            }
            (ObjectState::Output { data, .. }, "write", [HostValue::Str(s)]) => {
                data.extend_from_slice(s.as_bytes());
                HostValue::Null
            }
            (ObjectState::Output { data, .. }, "size", []) => HostValue::Int(data.len() as i64),
            (ObjectState::Output { data, .. }, "toString", []) => {
                HostValue::Str(String::from_utf8_lossy(data).into_owned())
            }
            (ObjectState::Output { .. } | ObjectState::Writer { .. }, "flush", []) => HostValue::Null,
            (ObjectState::Reader { data, pos, .. }, "read", []) => match data.get(*pos) {
                Some(unit) => {
                    *pos += 1;
                    HostValue::Int(i64::from(*unit))
                }
                None => HostValue::Int(-1),
            },
            (ObjectState::Reader { data, pos, .. }, "ready", []) => HostValue::Bool(*pos < data.len()),
            (ObjectState::Writer { data, .. }, "write" | "append", [HostValue::Int(unit)]) => {
                data.push((*unit & 0xffff) as u16);
                HostValue::Null
            }
            (ObjectState::Writer { data, .. }, "write" | "append", [HostValue::Str(s)]) => {
                data.extend(s.encode_utf16());
                HostValue::Null
            }
            (ObjectState::Writer { data, .. }, "toString", []) => {
                HostValue::Str(String::from_utf16_lossy(data))
            }
            (
                ObjectState::Input { closed, .. }
                | ObjectState::Output { closed, .. }
                | ObjectState::Reader { closed, .. }
                | ObjectState::Writer { closed, .. },
                "close",
                [],
            ) => {
                *closed = true;
                HostValue::Null
            }
            _ => return Ok(None),
        };
        Ok(Some(result))
    }

    /// Result of a declared method without native behavior
    fn declared_call(
        &self,
        class: ForeignClassId,
        method: &str,
        is_static: bool,
    ) -> HostResult<HostValue> {
        let own = self.def(class);
        for name in self.ancestors(class) {
            let Some(def) = self.def_by_name(&name) else { continue };
            if let Some(found) = def.find_method(method, is_static) {
                return match &found.value {
                    Some(value) => Ok(value.to_host()),
                    None if own.as_ref().is_some_and(|d| d.behavior == Behavior::Plain) => {
                        Ok(HostValue::Null)
                    }
                    None => Err(self.illegal_argument(&name, method)),
                };
            }
        }
        let class_name = own.map(|d| d.name.clone()).unwrap_or_default();
        Err(self.raise(
            "java.lang.NoSuchMethodError",
            Some(format!("{}.{}", class_name, method)),
        ))
    }

    fn sort_list(&self, list: ObjectId, comparator: Option<ObjectId>) -> HostResult<HostValue> {
        let cell = self.cell(list)?;
        let items = match &cell.lock().state {
            ObjectState::List(items) => items.clone(),
            _ => {
                return Err(self.raise(
                    "java.lang.ClassCastException",
                    Some("Collections.sort requires a java.util.List".to_string()),
                ))
            }
        };
        let mut compare = |a: &HostValue, b: &HostValue| -> HostResult<Ordering> {
            match comparator {
                Some(cmp) => {
                    let result = self.invoke(cmp, "compare", &[a.clone(), b.clone()])?;
                    result.as_int().map(|i| i.cmp(&0)).ok_or_else(|| {
                        self.raise(
                            "java.lang.ClassCastException",
                            Some(format!("comparator returned {}", result.type_name())),
                        )
                    })
                }
                None => self.natural_compare(a, b),
            }
        };
        let sorted = merge_sort(items, &mut compare)?;
        self.with_list(&cell, |list| *list = sorted);
        Ok(HostValue::Null)
    }

    fn static_call(
        &self,
        def: &ClassDef,
        class: ForeignClassId,
        method: &str,
        args: &[HostValue],
    ) -> HostResult<Option<HostValue>> {
        let result = match (def.behavior, method, args) {
            (Behavior::Collections, "sort", [HostValue::Object(list)]) => {
                self.sort_list(*list, None)?
            }
            (Behavior::Collections, "sort", [HostValue::Object(list), HostValue::Null]) => {
                self.sort_list(*list, None)?
            }
            (Behavior::Collections, "sort", [HostValue::Object(list), HostValue::Object(cmp)]) => {
                self.sort_list(*list, Some(*cmp))?
            }
            (Behavior::Arrays, "asList", elements) => HostValue::Object(
                self.alloc_named(ARRAY_LIST, ObjectState::List(elements.to_vec()))?,
            ),
            (Behavior::System, "getProperty", [HostValue::Str(key), rest @ ..]) => {
                match self.properties.read().get(key) {
                    Some(value) => HostValue::Str(value.clone()),
                    None => rest.first().cloned().unwrap_or(HostValue::Null),
                }
            }
            (Behavior::Boxed, "valueOf", [value @ (HostValue::Int(_) | HostValue::Double(_))]) => {
                HostValue::Object(self.heap.alloc(class, ObjectState::Boxed(value.clone())))
            }
            _ => return Ok(None),
        };
        Ok(Some(result))
    }

    fn initial_state(&self, def: &ClassDef, args: &[HostValue]) -> HostResult<ObjectState> {
        let mismatch = || self.illegal_argument(&def.name, "<init>");
        let state = match def.behavior {
            Behavior::Plain => ObjectState::Plain,
            Behavior::List => match args {
                [] | [HostValue::Int(_)] => ObjectState::List(Vec::new()),
                [HostValue::Object(source)] => ObjectState::List(self.elements_of(*source)?),
                _ => return Err(mismatch()),
            },
            Behavior::Map => match args {
                [] | [HostValue::Int(_)] => ObjectState::Map(Vec::new()),
                [HostValue::Object(source)] => ObjectState::Map(self.entries_of(*source)?),
                _ => return Err(mismatch()),
            },
            Behavior::Entry => match args {
                [key, value] => ObjectState::Entry(key.clone(), value.clone()),
                _ => return Err(mismatch()),
            },
            Behavior::Tokenizer => {
                let tokens: Vec<HostValue> = match args {
                    [HostValue::Str(text)] => text
                        .split_whitespace()
                        .map(|t| HostValue::Str(t.to_string()))
                        .collect(),
                    [HostValue::Str(text), HostValue::Str(delims)] => text
                        .split(|c: char| delims.contains(c))
                        .filter(|t| !t.is_empty())
                        .map(|t| HostValue::Str(t.to_string()))
                        .collect(),
                    _ => return Err(mismatch()),
                };
                ObjectState::Cursor { items: tokens, pos: 0 }
            }
            Behavior::Throwable => ObjectState::Throwable {
                message: match args {
                    [] | [HostValue::Null] => None,
                    [HostValue::Str(message)] => Some(message.clone()),
                    _ => return Err(mismatch()),
                },
                trace: vec![format!("{}.<init>(MemoryHost)", def.name)],
            },
            Behavior::Boxed => match args {
                [value @ (HostValue::Int(_) | HostValue::Double(_))] => {
                    ObjectState::Boxed(value.clone())
                }
                [HostValue::Str(text)] => match text.trim().parse::<i64>() {
                    Ok(i) => ObjectState::Boxed(HostValue::Int(i)),
                    Err(_) => {
                        return Err(self.raise(
                            "java.lang.IllegalArgumentException",
                            Some(format!("For input string: \"{}\"", text)),
                        ))
                    }
                },
                _ => return Err(mismatch()),
            },
            Behavior::InputStream => match args {
                [] => ObjectState::Input { data: Vec::new(), pos: 0, closed: false },
                [HostValue::Str(text)] => ObjectState::Input {
                    data: text.as_bytes().to_vec(),
                    pos: 0,
                    closed: false,
                },
                _ => return Err(mismatch()),
            },
            Behavior::OutputStream => ObjectState::Output { data: Vec::new(), closed: false },
            Behavior::Reader => match args {
                [HostValue::Str(text)] => ObjectState::Reader {
                    data: text.encode_utf16().collect(),
                    pos: 0,
                    closed: false,
                },
                _ => return Err(mismatch()),
            },
            Behavior::Writer => ObjectState::Writer { data: Vec::new(), closed: false },
            Behavior::Iterator
            | Behavior::Enumeration
            | Behavior::Collections
            | Behavior::Arrays
            | Behavior::System
            | Behavior::Callback => {
                return Err(self.raise("java.lang.InstantiationException", Some(def.name.clone())))
            }
        };
        Ok(state)
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

enum Snapshot {
    Boxed(HostValue),
    List(Vec<HostValue>),
    Map(Vec<(HostValue, HostValue)>),
    Entry(HostValue, HostValue),
}

/// Stable merge sort with a fallible comparator
fn merge_sort<E>(
    mut items: Vec<HostValue>,
    compare: &mut dyn FnMut(&HostValue, &HostValue) -> Result<Ordering, E>,
) -> Result<Vec<HostValue>, E> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare)?;
    let right = merge_sort(right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if compare(l, r)? == Ordering::Greater {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

impl HostRuntime for MemoryHost {
    fn load_class(&self, name: &str) -> ClassLookup {
        *self.lookups.entry(name.to_string()).or_insert(0) += 1;

        let Some(id) = self.id_of(name) else {
            return ClassLookup::Missing;
        };
        let Some(def) = self.def(id) else {
            return ClassLookup::Missing;
        };

        let supers = def.effective_superclass().into_iter().chain(def.interfaces.iter().cloned());
        for sup in supers {
            if self.id_of(&sup).is_none() {
                return ClassLookup::Broken(self.raise("java.lang.NoClassDefFoundError", Some(sup)));
            }
        }

        if let Some(error) = &def.init_error {
            let first_failure = self.init_failed.lock().insert(id);
            let exception = if first_failure {
                self.raise("java.lang.ExceptionInInitializerError", Some(error.clone()))
            } else {
                self.raise(
                    "java.lang.NoClassDefFoundError",
                    Some(format!("Could not initialize class {}", name)),
                )
            };
            tracing::debug!(target: "crossway::host", class = name, "static initializer failed");
            return ClassLookup::Broken(exception);
        }
        ClassLookup::Found(id)
    }

    fn describe_class(&self, class: ForeignClassId) -> Result<ForeignClassInfo, ForeignException> {
        let def = self.def(class).ok_or_else(|| {
            self.raise("java.lang.NoClassDefFoundError", Some(format!("class #{}", class.0)))
        })?;

        let mut annotations = def.annotations.clone();
        let mut next = def.effective_superclass();
        while let Some(parent) = next.and_then(|name| self.def_by_name(&name)) {
            for annotation in &parent.annotations {
                if !annotations.contains(annotation) {
                    annotations.push(annotation.clone());
                }
            }
            next = parent.effective_superclass();
        }

        Ok(ForeignClassInfo {
            name: def.name.clone(),
            modifiers: def.modifier_bits(),
            superclass: def.effective_superclass(),
            interfaces: def.interfaces.clone(),
            annotations,
            declared_annotations: def.annotations.clone(),
            methods: def.methods.iter().map(|m| m.info(&def.name)).collect(),
        })
    }

    fn package_exists(&self, name: &str) -> bool {
        let prefix = format!("{}.", name);
        self.classes
            .read()
            .visible
            .keys()
            .any(|class| class.starts_with(&prefix))
    }

    fn class_of(&self, object: ObjectId) -> Result<ForeignClassId, ForeignException> {
        self.heap.class_of(object).ok_or_else(|| {
            self.raise(
                "java.lang.NullPointerException",
                Some(format!("no live object #{}", object.0)),
            )
        })
    }

    fn is_instance(&self, object: ObjectId, class: ForeignClassId) -> bool {
        let (Some(actual), Some(target)) = (self.heap.class_of(object), self.def(class)) else {
            return false;
        };
        self.ancestors(actual).contains(&target.name)
    }

    fn new_instance(
        &self,
        class: ForeignClassId,
        args: &[HostValue],
    ) -> Result<HostValue, ForeignException> {
        let def = self.def(class).ok_or_else(|| {
            self.raise("java.lang.NoClassDefFoundError", Some(format!("class #{}", class.0)))
        })?;
        if !def.is_instantiable() {
            return Err(self.raise("java.lang.InstantiationException", Some(def.name.clone())));
        }
        let state = self.initial_state(&def, args)?;
        Ok(HostValue::Object(self.heap.alloc(class, state)))
    }

    fn invoke(
        &self,
        target: ObjectId,
        method: &str,
        args: &[HostValue],
    ) -> Result<HostValue, ForeignException> {
        let cell = self.cell(target)?;
        let class = cell.lock().class;
        let behavior = self.def(class).map_or(Behavior::Plain, |d| d.behavior);

        if let Some(result) = self.instance_call(target, &cell, behavior, method, args)? {
            return Ok(result);
        }
        match (method, args) {
            ("equals", [other]) => Ok(HostValue::Bool(
                self.values_equal(&HostValue::Object(target), other),
            )),
            ("hashCode", []) => Ok(HostValue::Int(target.0 as i64)),
            ("toString", []) => {
                let name = self.def(class).map(|d| d.name.clone()).unwrap_or_default();
                Ok(HostValue::Str(format!("{}@{:x}", name, target.0)))
            }
            _ => self.declared_call(class, method, false),
        }
    }

    fn invoke_static(
        &self,
        class: ForeignClassId,
        method: &str,
        args: &[HostValue],
    ) -> Result<HostValue, ForeignException> {
        let def = self.def(class).ok_or_else(|| {
            self.raise("java.lang.NoClassDefFoundError", Some(format!("class #{}", class.0)))
        })?;
        if let Some(result) = self.static_call(&def, class, method, args)? {
            return Ok(result);
        }
        self.declared_call(class, method, true)
    }

    fn implement_interface(
        &self,
        interface: ForeignClassId,
        callback: Arc<dyn ForeignCallback>,
    ) -> Result<ObjectId, ForeignException> {
        let def = self.def(interface).ok_or_else(|| {
            self.raise("java.lang.NoClassDefFoundError", Some(format!("class #{}", interface.0)))
        })?;
        if !def.is_interface() {
            return Err(self.raise(
                "java.lang.IllegalArgumentException",
                Some(format!("{} is not an interface", def.name)),
            ));
        }
        let n = self.proxy_counter.fetch_add(1, AtomicOrdering::Relaxed);
        let proxy = ClassDef::new(&format!("jdk.proxy.$Proxy{}", n))
            .with_modifiers(&["public", "final"])
            .implements(&[def.name.as_str()])
            .behavior(Behavior::Callback);
        let class = self.define_class(proxy);
        Ok(self.heap.alloc(class, ObjectState::Callback(callback)))
    }

    fn add_classpath_entry(&self, location: &Path) -> Result<(), ForeignException> {
        let archived = self.classes.write().archives.remove(location);
        match archived {
            Some(defs) => {
                tracing::debug!(
                    target: "crossway::host",
                    location = %location.display(),
                    classes = defs.len(),
                    "classpath entry added"
                );
                for def in defs {
                    self.define_class(def);
                }
            }
            None => {
                tracing::debug!(
                    target: "crossway::host",
                    location = %location.display(),
                    "classpath entry has no classes"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(host: &MemoryHost, name: &str) -> ForeignClassId {
        match host.load_class(name) {
            ClassLookup::Found(id) => id,
            other => panic!("Expected {} to load, got {:?}", name, other),
        }
    }

    fn new_list(host: &MemoryHost, items: &[i64]) -> ObjectId {
        let class = found(host, ARRAY_LIST);
        let list = host.new_instance(class, &[]).unwrap().as_object().unwrap();
        for i in items {
            host.invoke(list, "add", &[HostValue::Int(*i)]).unwrap();
        }
        list
    }

    #[test]
    fn test_missing_class() {
        let host = MemoryHost::new();
        assert_eq!(host.load_class("java.util.Nope"), ClassLookup::Missing);
        assert_eq!(host.lookup_count("java.util.Nope"), 1);
    }

    #[test]
    fn test_broken_initializer_reports_twice() {
        let host = MemoryHost::new();
        host.define_class(ClassDef::new("BadStaticInit").failing_init("boom"));

        match host.load_class("BadStaticInit") {
            ClassLookup::Broken(e) => {
                assert_eq!(e.class_name, "java.lang.ExceptionInInitializerError");
                assert_eq!(e.message.as_deref(), Some("boom"));
                assert!(e.object.is_some());
            }
            other => panic!("Expected broken class, got {:?}", other),
        }
        match host.load_class("BadStaticInit") {
            ClassLookup::Broken(e) => assert_eq!(e.class_name, "java.lang.NoClassDefFoundError"),
            other => panic!("Expected broken class, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_superclass_is_broken() {
        let host = MemoryHost::new();
        host.define_class(ClassDef::new("com.example.Orphan").extends("com.example.Gone"));
        assert!(matches!(host.load_class("com.example.Orphan"), ClassLookup::Broken(_)));
    }

    #[test]
    fn test_package_exists() {
        let host = MemoryHost::new();
        assert!(host.package_exists("java.util"));
        assert!(host.package_exists("java.util.zip"));
        assert!(!host.package_exists("java.util.zap"));
    }

    #[test]
    fn test_list_behavior() {
        let host = MemoryHost::new();
        let list = new_list(&host, &[3, 1, 2]);

        assert_eq!(host.invoke(list, "size", &[]).unwrap(), HostValue::Int(3));
        assert_eq!(host.invoke(list, "get", &[HostValue::Int(1)]).unwrap(), HostValue::Int(1));
        assert_eq!(
            host.invoke(list, "indexOf", &[HostValue::Int(2)]).unwrap(),
            HostValue::Int(2)
        );

        let err = host.invoke(list, "get", &[HostValue::Int(9)]).unwrap_err();
        assert_eq!(err.class_name, "java.lang.IndexOutOfBoundsException");
    }

    #[test]
    fn test_collections_sort_natural() {
        let host = MemoryHost::new();
        let list = new_list(&host, &[3, 1, 2]);
        let collections = found(&host, "java.util.Collections");

        host.invoke_static(collections, "sort", &[HostValue::Object(list)]).unwrap();
        assert_eq!(host.elements_of(list).unwrap(), vec![
            HostValue::Int(1),
            HostValue::Int(2),
            HostValue::Int(3)
        ]);
    }

    #[test]
    fn test_collections_sort_with_callback_comparator() {
        let host = MemoryHost::new();
        let list = new_list(&host, &[1, 3, 2]);
        let collections = found(&host, "java.util.Collections");
        let comparator = found(&host, "java.util.Comparator");

        let reverse = Arc::new(|_: &str, args: &[HostValue]| -> Result<HostValue, ForeignException> {
            let (a, b) = (args[0].as_int().unwrap(), args[1].as_int().unwrap());
            Ok(HostValue::Int(b.cmp(&a) as i64))
        });
        let cmp = host.implement_interface(comparator, reverse).unwrap();
        assert!(host.is_instance(cmp, comparator));

        host.invoke_static(collections, "sort", &[HostValue::Object(list), HostValue::Object(cmp)])
            .unwrap();
        assert_eq!(host.elements_of(list).unwrap(), vec![
            HostValue::Int(3),
            HostValue::Int(2),
            HostValue::Int(1)
        ]);
    }

    #[test]
    fn test_map_behavior() {
        let host = MemoryHost::new();
        let class = found(&host, "java.util.HashMap");
        let map = host.new_instance(class, &[]).unwrap().as_object().unwrap();

        host.invoke(map, "put", &[HostValue::Str("a".into()), HostValue::Int(1)]).unwrap();
        let previous = host
            .invoke(map, "put", &[HostValue::Str("a".into()), HostValue::Int(2)])
            .unwrap();
        assert_eq!(previous, HostValue::Int(1));
        assert_eq!(host.invoke(map, "size", &[]).unwrap(), HostValue::Int(1));
        assert_eq!(
            host.invoke(map, "toString", &[]).unwrap(),
            HostValue::Str("{a=2}".into())
        );
    }

    #[test]
    fn test_tokenizer_enumeration() {
        let host = MemoryHost::new();
        let class = found(&host, "java.util.StringTokenizer");
        let tok = host
            .new_instance(class, &[HostValue::Str("a b  c".into())])
            .unwrap()
            .as_object()
            .unwrap();

        assert_eq!(host.invoke(tok, "countTokens", &[]).unwrap(), HostValue::Int(3));
        assert_eq!(host.invoke(tok, "nextElement", &[]).unwrap(), HostValue::Str("a".into()));
        assert_eq!(host.invoke(tok, "nextToken", &[]).unwrap(), HostValue::Str("b".into()));
        assert_eq!(host.invoke(tok, "hasMoreElements", &[]).unwrap(), HostValue::Bool(true));
    }

    #[test]
    fn test_archive_needs_classpath_entry() {
        let host = MemoryHost::new();
        host.define_archive("target/test-classes", vec![ClassDef::new("DefaultPackageClass")]);

        assert_eq!(host.load_class("DefaultPackageClass"), ClassLookup::Missing);
        host.add_classpath_entry(Path::new("target/test-classes")).unwrap();
        assert!(matches!(host.load_class("DefaultPackageClass"), ClassLookup::Found(_)));
    }

    #[test]
    fn test_inherited_annotations() {
        let host = MemoryHost::new();
        host.define_class(ClassDef::new("com.example.Base").annotated("java.lang.Deprecated"));
        host.define_class(ClassDef::new("com.example.Derived").extends("com.example.Base"));

        let derived = found(&host, "com.example.Derived");
        let info = host.describe_class(derived).unwrap();
        assert_eq!(info.annotations, vec!["java.lang.Deprecated".to_string()]);
        assert!(info.declared_annotations.is_empty());
    }

    #[test]
    fn test_stream_close() {
        let host = MemoryHost::new();
        let class = found(&host, "java.io.ByteArrayInputStream");
        let input = host
            .new_instance(class, &[HostValue::Str("hi".into())])
            .unwrap()
            .as_object()
            .unwrap();

        assert_eq!(host.invoke(input, "read", &[]).unwrap(), HostValue::Int(104));
        host.invoke(input, "close", &[]).unwrap();
        assert_eq!(host.is_closed(input), Some(true));
        let err = host.invoke(input, "read", &[]).unwrap_err();
        assert_eq!(err.class_name, "java.io.IOException");
    }

    #[test]
    fn test_char_streams_use_utf16_units() {
        let host = MemoryHost::new();
        let class = found(&host, "java.io.StringReader");
        let reader = host
            .new_instance(class, &[HostValue::Str("中😀".into())])
            .unwrap()
            .as_object()
            .unwrap();
        assert_eq!(host.invoke(reader, "read", &[]).unwrap(), HostValue::Int(0x4e2d));
        assert_eq!(host.invoke(reader, "read", &[]).unwrap(), HostValue::Int(0xd83d));
        assert_eq!(host.invoke(reader, "read", &[]).unwrap(), HostValue::Int(0xde00));
        assert_eq!(host.invoke(reader, "read", &[]).unwrap(), HostValue::Int(-1));

        let class = found(&host, "java.io.StringWriter");
        let writer = host.new_instance(class, &[]).unwrap().as_object().unwrap();
        host.invoke(writer, "write", &[HostValue::Int(0x4e2d)]).unwrap();
        host.invoke(writer, "write", &[HostValue::Str("!".into())]).unwrap();
        assert_eq!(host.invoke(writer, "toString", &[]).unwrap(), HostValue::Str("中!".into()));
        host.invoke(writer, "close", &[]).unwrap();
        assert_eq!(host.is_closed(writer), Some(true));
    }

    #[test]
    fn test_abstract_class_not_instantiable() {
        let host = MemoryHost::new();
        let class = found(&host, "java.io.InputStream");
        let err = host.new_instance(class, &[]).unwrap_err();
        assert_eq!(err.class_name, "java.lang.InstantiationException");
    }
}
