//! Map adapter
//!
//! Reads go through the foreign `get`/`containsKey`; iteration and the
//! entry-set operations (`invert`, `key`, `assoc`, `rassoc`, the subset
//! operators) walk `entrySet`. Non-mutating filters build a guest hash,
//! their bang forms remove entries from the foreign map.
//!
//! A map's default value or default proc is guest-only state: the foreign
//! map never sees it. Defaults are keyed by [`ObjectId`] and live as long
//! as the adapter, which relies on the host never reusing an object id.
//! `clear` and `replace` keep the default, as a guest hash does.

use super::{check_arity, collect_elements, duplicate, int_arg, CallContext, Capability, ProtocolAdapter};
use crate::error::{GuestError, GuestResult};
use crate::host::ObjectId;
use crate::marshal::MAP_CLASS;
use crate::proxy::ProxyObject;
use crate::value::{Block, Value};
use dashmap::DashMap;
use std::cmp::Ordering;

const METHODS: &[&str] = &[
    "[]",
    "[]=",
    "store",
    "key?",
    "has_key?",
    "include?",
    "member?",
    "value?",
    "has_value?",
    "each",
    "each_pair",
    "each_key",
    "each_value",
    "fetch",
    "select",
    "filter",
    "reject",
    "select!",
    "filter!",
    "reject!",
    "keep_if",
    "delete_if",
    "merge",
    "merge!",
    "update",
    "<",
    "<=",
    ">",
    ">=",
    "==",
    "invert",
    "key",
    "assoc",
    "rassoc",
    "default",
    "default=",
    "default_proc",
    "default_proc=",
    "size",
    "length",
    "empty?",
    "to_a",
    "to_h",
    "to_hash",
    "to_proc",
    "keys",
    "values",
    "values_at",
    "fetch_values",
    "delete",
    "clear",
    "replace",
    "any?",
    "dig",
    "sort",
    "flatten",
];

/// Guest-side default of one map
#[derive(Debug, Clone)]
pub enum MapDefault {
    /// `default = value`
    Value(Value),
    /// `default_proc = proc`, called with the map and the missing key
    Proc(Block),
}

/// Guest protocol for `java.util.Map`
pub struct MapAdapter {
    /// Never pruned; see the module docs
    defaults: DashMap<ObjectId, MapDefault>,
}

impl MapAdapter {
    /// Create an adapter with no defaults recorded
    pub fn new() -> Self {
        Self {
            defaults: DashMap::new(),
        }
    }

    /// Default recorded for a map
    pub fn default_of(&self, map: ObjectId) -> Option<MapDefault> {
        self.defaults.get(&map).map(|entry| entry.value().clone())
    }

    fn entries(cx: &CallContext<'_>, map: &ProxyObject) -> GuestResult<Vec<(Value, Value)>> {
        let set = super::expect_object(cx.invoke_on(map, "entrySet", &[])?, "entrySet")?;
        collect_elements(cx, &set)?
            .into_iter()
            .map(|entry| {
                let entry = super::expect_object(entry, "entrySet")?;
                Ok((cx.invoke_on(&entry, "getKey", &[])?, cx.invoke_on(&entry, "getValue", &[])?))
            })
            .collect()
    }

    /// Entries of a guest hash or foreign map operand
    fn operand_entries(cx: &CallContext<'_>, method: &str, value: &Value) -> GuestResult<Vec<(Value, Value)>> {
        match value {
            Value::Hash(entries) => Ok(entries.clone()),
            Value::Object(object) if object.class().has_capability(Capability::Map) => Self::entries(cx, object),
            other => Err(GuestError::Type(format!(
                "no implicit conversion of {} into Hash ({})",
                other.type_name(),
                method
            ))),
        }
    }

    fn has_key(cx: &CallContext<'_>, key: &Value) -> GuestResult<bool> {
        Ok(cx.invoke("containsKey", std::slice::from_ref(key))?.truthy())
    }

    /// `map[key]`, falling back to the default
    fn lookup(&self, cx: &CallContext<'_>, key: &Value) -> GuestResult<Value> {
        let value = cx.invoke("get", std::slice::from_ref(key))?;
        if !value.is_nil() || Self::has_key(cx, key)? {
            return Ok(value);
        }
        self.default_for(cx, Some(key))
    }

    fn default_for(&self, cx: &CallContext<'_>, key: Option<&Value>) -> GuestResult<Value> {
        match self.default_of(cx.receiver().id()) {
            Some(MapDefault::Value(value)) => Ok(value),
            Some(MapDefault::Proc(block)) => match key {
                Some(key) => block.call(&[cx.receiver_value(), key.clone()]),
                None => Ok(Value::Nil),
            },
            None => Ok(Value::Nil),
        }
    }

    fn fetch(cx: &CallContext<'_>, key: &Value, fallback: Option<&Value>) -> GuestResult<Value> {
        if Self::has_key(cx, key)? {
            return cx.invoke("get", std::slice::from_ref(key));
        }
        match (cx.block(), fallback) {
            (Some(block), _) => block.call(std::slice::from_ref(key)),
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(GuestError::Key(key.to_string())),
        }
    }

    /// Remove every entry for which the block answers `remove_when`
    ///
    /// Returns whether anything was removed.
    fn remove_where(cx: &CallContext<'_>, method: &str, remove_when: bool) -> GuestResult<bool> {
        let block = cx.require_block(method)?;
        let mut removed = false;
        for (key, value) in Self::entries(cx, cx.receiver())? {
            if block.call(&[key.clone(), value])?.truthy() == remove_when {
                cx.invoke("remove", &[key])?;
                removed = true;
            }
        }
        Ok(removed)
    }

    /// Merge `other` into `target`; a block resolves keys present in both
    fn merge_into(cx: &CallContext<'_>, target: &ProxyObject, method: &str, other: &Value) -> GuestResult<()> {
        for (key, value) in Self::operand_entries(cx, method, other)? {
            let value = match cx.block() {
                Some(block) if cx.invoke_on(target, "containsKey", std::slice::from_ref(&key))?.truthy() => {
                    let old = cx.invoke_on(target, "get", std::slice::from_ref(&key))?;
                    block.call(&[key.clone(), old, value])?
                }
                _ => value,
            };
            cx.invoke_on(target, "put", &[key, value])?;
        }
        Ok(())
    }

    /// Check that every entry of `sub` is an entry of `sup`
    fn contains_all(cx: &CallContext<'_>, sub: &[(Value, Value)], sup: &[(Value, Value)]) -> GuestResult<bool> {
        let bridge = cx.bridge();
        for (key, value) in sub {
            let mut found = false;
            for (k, v) in sup {
                if bridge.values_equal(key, k)? && bridge.values_equal(value, v)? {
                    found = true;
                    break;
                }
            }
            if !found {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn subset(cx: &CallContext<'_>, method: &str, other: &Value) -> GuestResult<bool> {
        let mine = Self::entries(cx, cx.receiver())?;
        let theirs = Self::operand_entries(cx, method, other)?;
        let result = match method {
            "<=" => Self::contains_all(cx, &mine, &theirs)?,
            "<" => mine.len() < theirs.len() && Self::contains_all(cx, &mine, &theirs)?,
            ">=" => Self::contains_all(cx, &theirs, &mine)?,
            ">" => mine.len() > theirs.len() && Self::contains_all(cx, &theirs, &mine)?,
            _ => mine.len() == theirs.len() && Self::contains_all(cx, &mine, &theirs)?,
        };
        Ok(result)
    }

    fn pair(key: Value, value: Value) -> Value {
        Value::Array(vec![key, value])
    }

    /// Fetch `rest` from a nested value, as `dig` does
    fn dig(cx: &CallContext<'_>, value: Value, rest: &[Value]) -> GuestResult<Value> {
        let Some((next, tail)) = rest.split_first() else {
            return Ok(value);
        };
        let inner = match &value {
            Value::Nil => return Ok(Value::Nil),
            Value::Hash(_) => value.hash_get(next).cloned().unwrap_or(Value::Nil),
            Value::Array(items) => {
                let index = int_arg(next)?;
                let index = if index < 0 { index + items.len() as i64 } else { index };
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Value::Nil)
            }
            Value::Object(_) => return cx.bridge().call(&value, "dig", rest, None),
            other => {
                return Err(GuestError::Type(format!("{} does not have #dig method", other.type_name())))
            }
        };
        Self::dig(cx, inner, tail)
    }

    /// Compare two `[key, value]` pairs element-wise
    fn compare_pairs(cx: &CallContext<'_>, a: &(Value, Value), b: &(Value, Value)) -> GuestResult<Ordering> {
        let bridge = cx.bridge();
        let by_key = bridge
            .compare_values(&a.0, &b.0)?
            .ok_or_else(|| crate::bridge::incomparable(&a.0, &b.0))?;
        if by_key != Ordering::Equal {
            return Ok(by_key);
        }
        bridge
            .compare_values(&a.1, &b.1)?
            .ok_or_else(|| crate::bridge::incomparable(&a.1, &b.1))
    }

    fn sorted_pairs(cx: &CallContext<'_>) -> GuestResult<Vec<Value>> {
        let mut entries = Self::entries(cx, cx.receiver())?;
        let mut failure = None;
        entries.sort_by(|a, b| {
            let ordering = match cx.block() {
                Some(block) => block
                    .call(&[Self::pair(a.0.clone(), a.1.clone()), Self::pair(b.0.clone(), b.1.clone())])
                    .and_then(|r| int_arg(&r))
                    .map(|i| i.cmp(&0)),
                None => Self::compare_pairs(cx, a, b),
            };
            ordering.unwrap_or_else(|err| {
                if failure.is_none() {
                    failure = Some(err);
                }
                Ordering::Equal
            })
        });
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(entries.into_iter().map(|(k, v)| Self::pair(k, v)).collect())
    }
}

impl Default for MapAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolAdapter for MapAdapter {
    fn capability(&self) -> Capability {
        Capability::Map
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value> {
        match method {
            "[]" => {
                check_arity(method, args, 1, 1)?;
                self.lookup(cx, &args[0])
            }
            "[]=" | "store" => {
                check_arity(method, args, 2, 2)?;
                cx.invoke("put", args)?;
                Ok(args[1].clone())
            }
            "key?" | "has_key?" | "include?" | "member?" => {
                check_arity(method, args, 1, 1)?;
                Ok(Value::Bool(Self::has_key(cx, &args[0])?))
            }
            "value?" | "has_value?" => {
                check_arity(method, args, 1, 1)?;
                Ok(Value::Bool(cx.invoke("containsValue", args)?.truthy()))
            }
            "each" | "each_pair" | "each_key" | "each_value" => {
                check_arity(method, args, 0, 0)?;
                let block = cx.require_block(method)?;
                for (key, value) in Self::entries(cx, cx.receiver())? {
                    match method {
                        "each_key" => block.call(&[key])?,
                        "each_value" => block.call(&[value])?,
                        _ => block.call(&[key, value])?,
                    };
                }
                Ok(cx.receiver_value())
            }
            "fetch" => {
                check_arity(method, args, 1, 2)?;
                Self::fetch(cx, &args[0], args.get(1))
            }
            "select" | "filter" | "reject" => {
                check_arity(method, args, 0, 0)?;
                let block = cx.require_block(method)?;
                let keep = method != "reject";
                let mut kept = Vec::new();
                for (key, value) in Self::entries(cx, cx.receiver())? {
                    if block.call(&[key.clone(), value.clone()])?.truthy() == keep {
                        kept.push((key, value));
                    }
                }
                Ok(Value::Hash(kept))
            }
            "select!" | "filter!" | "keep_if" => {
                check_arity(method, args, 0, 0)?;
                let removed = Self::remove_where(cx, method, false)?;
                Ok(if removed || method == "keep_if" {
                    cx.receiver_value()
                } else {
                    Value::Nil
                })
            }
            "reject!" | "delete_if" => {
                check_arity(method, args, 0, 0)?;
                let removed = Self::remove_where(cx, method, true)?;
                Ok(if removed || method == "delete_if" {
                    cx.receiver_value()
                } else {
                    Value::Nil
                })
            }
            "merge" => {
                let copy = duplicate(cx, MAP_CLASS)?;
                for other in args {
                    Self::merge_into(cx, &copy, method, other)?;
                }
                Ok(Value::Object(copy))
            }
            "merge!" | "update" => {
                for other in args {
                    Self::merge_into(cx, cx.receiver(), method, other)?;
                }
                Ok(cx.receiver_value())
            }
            "<" | "<=" | ">" | ">=" | "==" => {
                check_arity(method, args, 1, 1)?;
                if method == "==" && !matches!(&args[0], Value::Hash(_) | Value::Object(_)) {
                    return Ok(Value::Bool(false));
                }
                if method == "==" {
                    if let Value::Object(other) = &args[0] {
                        if !other.class().has_capability(Capability::Map) {
                            return Ok(Value::Bool(false));
                        }
                    }
                }
                Ok(Value::Bool(Self::subset(cx, method, &args[0])?))
            }
            "invert" => {
                check_arity(method, args, 0, 0)?;
                let mut inverted: Vec<(Value, Value)> = Vec::new();
                for (key, value) in Self::entries(cx, cx.receiver())? {
                    let mut slot = None;
                    for (i, (k, _)) in inverted.iter().enumerate() {
                        if cx.bridge().values_equal(k, &value)? {
                            slot = Some(i);
                            break;
                        }
                    }
                    match slot {
                        Some(i) => inverted[i].1 = key,
                        None => inverted.push((value, key)),
                    }
                }
                Ok(Value::Hash(inverted))
            }
            "key" | "rassoc" => {
                check_arity(method, args, 1, 1)?;
                for (key, value) in Self::entries(cx, cx.receiver())? {
                    if cx.bridge().values_equal(&value, &args[0])? {
                        return Ok(if method == "key" { key } else { Self::pair(key, value) });
                    }
                }
                Ok(Value::Nil)
            }
            "assoc" => {
                check_arity(method, args, 1, 1)?;
                for (key, value) in Self::entries(cx, cx.receiver())? {
                    if cx.bridge().values_equal(&key, &args[0])? {
                        return Ok(Self::pair(key, value));
                    }
                }
                Ok(Value::Nil)
            }
            "default" => {
                check_arity(method, args, 0, 1)?;
                self.default_for(cx, args.first())
            }
            "default=" => {
                check_arity(method, args, 1, 1)?;
                self.defaults
                    .insert(cx.receiver().id(), MapDefault::Value(args[0].clone()));
                Ok(args[0].clone())
            }
            "default_proc" => {
                check_arity(method, args, 0, 0)?;
                Ok(match self.default_of(cx.receiver().id()) {
                    Some(MapDefault::Proc(block)) => Value::Proc(block),
                    _ => Value::Nil,
                })
            }
            "default_proc=" => {
                check_arity(method, args, 1, 1)?;
                match &args[0] {
                    Value::Proc(block) => {
                        self.defaults
                            .insert(cx.receiver().id(), MapDefault::Proc(block.clone()));
                    }
                    Value::Nil => {
                        self.defaults.remove(&cx.receiver().id());
                    }
                    other => {
                        return Err(GuestError::Type(format!(
                            "wrong default_proc type {} (expected Proc)",
                            other.type_name()
                        )))
                    }
                }
                Ok(args[0].clone())
            }
            "size" | "length" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Int(cx.invoke_int("size", &[])?))
            }
            "empty?" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Bool(cx.invoke_int("size", &[])? == 0))
            }
            "to_a" => {
                check_arity(method, args, 0, 0)?;
                let entries = Self::entries(cx, cx.receiver())?;
                Ok(Value::Array(entries.into_iter().map(|(k, v)| Self::pair(k, v)).collect()))
            }
            "to_h" | "to_hash" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Hash(Self::entries(cx, cx.receiver())?))
            }
            "to_proc" => {
                check_arity(method, args, 0, 0)?;
                let bridge = cx.bridge().clone();
                let map = cx.receiver_value();
                Ok(Value::Proc(Block::new(move |args| {
                    check_arity("call", args, 1, 1)?;
                    bridge.call(&map, "[]", args, None)
                })))
            }
            "keys" | "values" => {
                check_arity(method, args, 0, 0)?;
                let entries = Self::entries(cx, cx.receiver())?;
                Ok(Value::Array(
                    entries
                        .into_iter()
                        .map(|(k, v)| if method == "keys" { k } else { v })
                        .collect(),
                ))
            }
            "values_at" => Ok(Value::Array(
                args.iter()
                    .map(|key| self.lookup(cx, key))
                    .collect::<GuestResult<Vec<_>>>()?,
            )),
            "fetch_values" => Ok(Value::Array(
                args.iter()
                    .map(|key| Self::fetch(cx, key, None))
                    .collect::<GuestResult<Vec<_>>>()?,
            )),
            "delete" => {
                check_arity(method, args, 1, 1)?;
                if Self::has_key(cx, &args[0])? {
                    return cx.invoke("remove", args);
                }
                match cx.block() {
                    Some(block) => block.call(args),
                    None => Ok(Value::Nil),
                }
            }
            "clear" => {
                check_arity(method, args, 0, 0)?;
                cx.invoke("clear", &[])?;
                Ok(cx.receiver_value())
            }
            "replace" => {
                check_arity(method, args, 1, 1)?;
                let entries = Self::operand_entries(cx, method, &args[0])?;
                cx.invoke("clear", &[])?;
                for (key, value) in entries {
                    cx.invoke("put", &[key, value])?;
                }
                Ok(cx.receiver_value())
            }
            "any?" => {
                check_arity(method, args, 0, 0)?;
                match cx.block() {
                    Some(block) => {
                        for (key, value) in Self::entries(cx, cx.receiver())? {
                            if block.call(&[key, value])?.truthy() {
                                return Ok(Value::Bool(true));
                            }
                        }
                        Ok(Value::Bool(false))
                    }
                    None => Ok(Value::Bool(cx.invoke_int("size", &[])? > 0)),
                }
            }
            "dig" => {
                let Some((key, rest)) = args.split_first() else {
                    return Err(GuestError::arity(method, 0, "1+"));
                };
                let value = self.lookup(cx, key)?;
                Self::dig(cx, value, rest)
            }
            "sort" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Array(Self::sorted_pairs(cx)?))
            }
            "flatten" => {
                check_arity(method, args, 0, 1)?;
                let depth = match args.first() {
                    Some(depth) => int_arg(depth)?,
                    None => 1,
                };
                let mut flat = Vec::new();
                for (key, value) in Self::entries(cx, cx.receiver())? {
                    flat.push(key);
                    match value {
                        Value::Array(items) if depth > 1 => flat.extend(items),
                        other => flat.push(other),
                    }
                }
                Ok(Value::Array(flat))
            }
            _ => Err(GuestError::NoMethod {
                receiver: cx.receiver().class().guest_name().to_string(),
                method: method.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bridge::Bridge;
    use crate::error::{ErrorCategory, GuestError};
    use crate::host::memory::MemoryHost;
    use crate::value::{Block, Value};
    use std::sync::Arc;

    fn setup() -> Bridge {
        Bridge::new(Arc::new(MemoryHost::new()))
    }

    fn hash(pairs: &[(&str, i64)]) -> Value {
        Value::Hash(
            pairs
                .iter()
                .map(|(k, v)| (Value::str(*k), Value::Int(*v)))
                .collect(),
        )
    }

    fn map(bridge: &Bridge, pairs: &[(&str, i64)]) -> Value {
        bridge.wrap(bridge.unwrap(&hash(pairs)).unwrap()).unwrap()
    }

    fn call(bridge: &Bridge, recv: &Value, method: &str, args: &[Value]) -> Value {
        bridge.call(recv, method, args, None).unwrap()
    }

    #[test]
    fn test_reads_and_writes() {
        let bridge = setup();
        let m = map(&bridge, &[("a", 1)]);
        assert_eq!(call(&bridge, &m, "[]", &[Value::str("a")]), Value::Int(1));
        assert_eq!(call(&bridge, &m, "[]", &[Value::str("z")]), Value::Nil);
        assert_eq!(call(&bridge, &m, "[]=", &[Value::str("b"), Value::Int(2)]), Value::Int(2));
        assert_eq!(call(&bridge, &m, "store", &[Value::str("c"), Value::Nil]), Value::Nil);
        assert_eq!(call(&bridge, &m, "size", &[]), Value::Int(3));
        assert_eq!(call(&bridge, &m, "key?", &[Value::str("c")]), Value::Bool(true));
        assert_eq!(call(&bridge, &m, "value?", &[Value::Int(2)]), Value::Bool(true));
        assert_eq!(call(&bridge, &m, "keys", &[]), Value::Array(vec![Value::str("a"), Value::str("b"), Value::str("c")]));
    }

    #[test]
    fn test_defaults_are_guest_only() {
        let bridge = setup();
        let m = map(&bridge, &[("a", 1)]);
        call(&bridge, &m, "default=", &[Value::Int(0)]);
        assert_eq!(call(&bridge, &m, "[]", &[Value::str("zz")]), Value::Int(0));
        assert_eq!(call(&bridge, &m, "get", &[Value::str("zz")]), Value::Nil);
        assert_eq!(call(&bridge, &m, "default", &[]), Value::Int(0));

        let by_key = Block::new(|args| Ok(Value::Str(format!("no {}", args[1].as_str().unwrap_or("?")))));
        call(&bridge, &m, "default_proc=", &[Value::Proc(by_key.clone())]);
        assert_eq!(call(&bridge, &m, "[]", &[Value::str("x")]), Value::str("no x"));
        assert_eq!(call(&bridge, &m, "default_proc", &[]), Value::Proc(by_key));
        assert_eq!(call(&bridge, &m, "default", &[]), Value::Nil);

        call(&bridge, &m, "default_proc=", &[Value::Nil]);
        assert_eq!(call(&bridge, &m, "[]", &[Value::str("x")]), Value::Nil);
    }

    #[test]
    fn test_fetch() {
        let bridge = setup();
        let m = map(&bridge, &[("a", 1)]);
        assert_eq!(call(&bridge, &m, "fetch", &[Value::str("a")]), Value::Int(1));
        assert_eq!(call(&bridge, &m, "fetch", &[Value::str("b"), Value::Int(5)]), Value::Int(5));
        let shout = Block::new(|args| Ok(Value::Str(format!("{}!", args[0].as_str().unwrap_or("")))));
        assert_eq!(
            bridge.call(&m, "fetch", &[Value::str("b")], Some(&shout)).unwrap(),
            Value::str("b!")
        );
        let err = bridge.call(&m, "fetch", &[Value::str("b")], None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Key);
        assert_eq!(err.to_string(), "key not found: \"b\"");
    }

    #[test]
    fn test_filters() {
        let bridge = setup();
        let m = map(&bridge, &[("a", 1), ("b", 2), ("c", 3)]);
        let odd = Block::new(|args| Ok(Value::Bool(args[1].as_int().unwrap_or(0) % 2 == 1)));

        assert_eq!(bridge.call(&m, "select", &[], Some(&odd)).unwrap(), hash(&[("a", 1), ("c", 3)]));
        assert_eq!(bridge.call(&m, "reject", &[], Some(&odd)).unwrap(), hash(&[("b", 2)]));
        assert_eq!(call(&bridge, &m, "size", &[]), Value::Int(3));

        assert_eq!(bridge.call(&m, "reject!", &[], Some(&odd)).unwrap(), m);
        assert_eq!(call(&bridge, &m, "to_h", &[]), hash(&[("b", 2)]));
        assert_eq!(bridge.call(&m, "reject!", &[], Some(&odd)).unwrap(), Value::Nil);
        assert_eq!(bridge.call(&m, "delete_if", &[], Some(&odd)).unwrap(), m);
    }

    #[test]
    fn test_merge() {
        let bridge = setup();
        let m = map(&bridge, &[("a", 1), ("b", 2)]);
        let merged = call(&bridge, &m, "merge", &[hash(&[("b", 20), ("c", 30)])]);
        assert_eq!(call(&bridge, &merged, "to_h", &[]), hash(&[("a", 1), ("b", 20), ("c", 30)]));
        assert_eq!(call(&bridge, &m, "to_h", &[]), hash(&[("a", 1), ("b", 2)]));

        let sum = Block::new(|args| {
            Ok(Value::Int(args[1].as_int().unwrap_or(0) + args[2].as_int().unwrap_or(0)))
        });
        bridge.call(&m, "merge!", &[hash(&[("b", 5)])], Some(&sum)).unwrap();
        assert_eq!(call(&bridge, &m, "[]", &[Value::str("b")]), Value::Int(7));
    }

    #[test]
    fn test_subset_laws() {
        let bridge = setup();
        let small = map(&bridge, &[("a", 1)]);
        let big = map(&bridge, &[("a", 1), ("b", 2)]);
        let other = hash(&[("a", 2)]);

        assert_eq!(call(&bridge, &small, "<", &[big.clone()]), Value::Bool(true));
        assert_eq!(call(&bridge, &small, "<=", &[big.clone()]), Value::Bool(true));
        assert_eq!(call(&bridge, &big, ">", &[small.clone()]), Value::Bool(true));
        assert_eq!(call(&bridge, &big, ">=", &[big.clone()]), Value::Bool(true));
        assert_eq!(call(&bridge, &big, "<", &[big.clone()]), Value::Bool(false));
        assert_eq!(call(&bridge, &small, "<=", &[other]), Value::Bool(false));
        assert_eq!(call(&bridge, &small, "==", &[hash(&[("a", 1)])]), Value::Bool(true));
        assert_eq!(call(&bridge, &small, "==", &[big]), Value::Bool(false));
        assert_eq!(call(&bridge, &small, "==", &[Value::Int(1)]), Value::Bool(false));
    }

    #[test]
    fn test_entry_set_queries() {
        let bridge = setup();
        let m = map(&bridge, &[("a", 1), ("b", 2)]);
        assert_eq!(call(&bridge, &m, "invert", &[]), Value::Hash(vec![
            (Value::Int(1), Value::str("a")),
            (Value::Int(2), Value::str("b")),
        ]));
        assert_eq!(call(&bridge, &m, "key", &[Value::Int(2)]), Value::str("b"));
        assert_eq!(call(&bridge, &m, "key", &[Value::Int(9)]), Value::Nil);
        assert_eq!(
            call(&bridge, &m, "assoc", &[Value::str("a")]),
            Value::Array(vec![Value::str("a"), Value::Int(1)])
        );
        assert_eq!(
            call(&bridge, &m, "rassoc", &[Value::Int(2)]),
            Value::Array(vec![Value::str("b"), Value::Int(2)])
        );
        assert_eq!(
            call(&bridge, &m, "flatten", &[]),
            Value::Array(vec![Value::str("a"), Value::Int(1), Value::str("b"), Value::Int(2)])
        );
    }

    #[test]
    fn test_delete_clear_replace() {
        let bridge = setup();
        let m = map(&bridge, &[("a", 1), ("b", 2)]);
        assert_eq!(call(&bridge, &m, "delete", &[Value::str("a")]), Value::Int(1));
        let missing = Block::new(|_| Ok(Value::str("gone")));
        assert_eq!(
            bridge.call(&m, "delete", &[Value::str("a")], Some(&missing)).unwrap(),
            Value::str("gone")
        );
        call(&bridge, &m, "replace", &[hash(&[("z", 26)])]);
        assert_eq!(call(&bridge, &m, "to_h", &[]), hash(&[("z", 26)]));
        call(&bridge, &m, "clear", &[]);
        assert_eq!(call(&bridge, &m, "empty?", &[]), Value::Bool(true));
        assert_eq!(call(&bridge, &m, "any?", &[]), Value::Bool(false));
    }

    #[test]
    fn test_sort_and_values_at() {
        let bridge = setup();
        let m = map(&bridge, &[("b", 2), ("a", 1)]);
        assert_eq!(
            call(&bridge, &m, "sort", &[]),
            Value::Array(vec![
                Value::Array(vec![Value::str("a"), Value::Int(1)]),
                Value::Array(vec![Value::str("b"), Value::Int(2)]),
            ])
        );
        assert_eq!(
            call(&bridge, &m, "values_at", &[Value::str("a"), Value::str("q")]),
            Value::Array(vec![Value::Int(1), Value::Nil])
        );
        assert!(matches!(
            bridge.call(&m, "fetch_values", &[Value::str("q")], None),
            Err(GuestError::Key(_))
        ));
    }

    #[test]
    fn test_to_proc_and_to_hash() {
        let bridge = setup();
        let m = map(&bridge, &[("a", 1)]);
        call(&bridge, &m, "default=", &[Value::Int(-1)]);

        let lookup = match call(&bridge, &m, "to_proc", &[]) {
            Value::Proc(block) => block,
            other => panic!("Expected proc, got {:?}", other),
        };
        assert_eq!(lookup.call(&[Value::str("a")]).unwrap(), Value::Int(1));
        assert_eq!(lookup.call(&[Value::str("zz")]).unwrap(), Value::Int(-1));
        assert!(matches!(lookup.call(&[]), Err(GuestError::Argument(_))));

        assert_eq!(call(&bridge, &m, "to_hash", &[]), hash(&[("a", 1)]));
    }

    #[test]
    fn test_invert_uses_host_equality() {
        let bridge = setup();
        let m = map(&bridge, &[]);
        let pair = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        // each store marshals a separate host list with equal contents
        call(&bridge, &m, "[]=", &[Value::str("a"), pair.clone()]);
        call(&bridge, &m, "[]=", &[Value::str("b"), pair]);

        match call(&bridge, &m, "invert", &[]) {
            Value::Hash(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].1, Value::str("b"));
            }
            other => panic!("Expected hash, got {:?}", other),
        }
    }

    #[test]
    fn test_default_survives_clear() {
        let bridge = setup();
        let m = map(&bridge, &[("a", 1)]);
        call(&bridge, &m, "default=", &[Value::Int(0)]);
        call(&bridge, &m, "clear", &[]);
        assert_eq!(call(&bridge, &m, "[]", &[Value::str("a")]), Value::Int(0));
    }

    #[test]
    fn test_dig() {
        let bridge = setup();
        let m = map(&bridge, &[]);
        let nested = Value::Hash(vec![(Value::str("x"), Value::Array(vec![Value::Int(4), Value::Int(5)]))]);
        call(&bridge, &m, "[]=", &[Value::str("n"), nested]);
        // the nested hash crossed into the host and came back as a foreign map
        assert!(call(&bridge, &m, "dig", &[Value::str("n"), Value::str("x")])
            .as_object()
            .is_some());
        assert_eq!(call(&bridge, &m, "dig", &[Value::str("missing"), Value::str("x")]), Value::Nil);
    }
}
