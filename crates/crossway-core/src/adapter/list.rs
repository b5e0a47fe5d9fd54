//! List adapter
//!
//! Indexing follows guest array rules: negative indices count from the end
//! and reads outside the list return `nil`. `[start, length]` reads a slice
//! and `[start, length] = values` replaces one, so writing a slice and
//! reading it back returns the written values.

use super::{check_arity, collect_elements, duplicate, int_arg, CallContext, Capability, ProtocolAdapter};
use crate::error::{GuestError, GuestResult};
use crate::marshal::LIST_CLASS;
use crate::proxy::ProxyObject;
use crate::value::Value;
use parking_lot::Mutex;
use std::sync::Arc;

const METHODS: &[&str] = &[
    "[]", "[]=", "at", "slice", "index", "find_index", "rindex", "sort", "sort!", "first", "last", "to_ary",
];

/// Guest protocol for `java.util.List`
pub struct ListAdapter;

impl ListAdapter {
    fn size(cx: &CallContext<'_>, list: &ProxyObject) -> GuestResult<i64> {
        let size = cx.invoke_on(list, "size", &[])?;
        int_arg(&size)
    }

    /// Read `[index]`
    fn element(cx: &CallContext<'_>, index: i64) -> GuestResult<Value> {
        let len = Self::size(cx, cx.receiver())?;
        let index = if index < 0 { index + len } else { index };
        if index < 0 || index >= len {
            return Ok(Value::Nil);
        }
        cx.invoke("get", &[Value::Int(index)])
    }

    /// Read `[start, length]`
    fn slice(cx: &CallContext<'_>, start: i64, length: i64) -> GuestResult<Value> {
        let len = Self::size(cx, cx.receiver())?;
        let start = if start < 0 { start + len } else { start };
        if start < 0 || start > len || length < 0 {
            return Ok(Value::Nil);
        }
        let end = start.saturating_add(length).min(len);
        let items = (start..end)
            .map(|i| cx.invoke("get", &[Value::Int(i)]))
            .collect::<GuestResult<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    /// Host lists are int-indexed; writing past that would pad forever
    fn check_padding(index: i64, target: i64) -> GuestResult<()> {
        if target > i64::from(i32::MAX) {
            return Err(GuestError::Index(format!("index {} too big", index)));
        }
        Ok(())
    }

    /// Write `[index] = value`, padding with `nil` past the end
    fn store(cx: &CallContext<'_>, index: i64, value: &Value) -> GuestResult<()> {
        let len = Self::size(cx, cx.receiver())?;
        let idx = if index < 0 { index + len } else { index };
        if idx < 0 {
            return Err(GuestError::Index(format!(
                "index {} too small for array; minimum: -{}",
                index, len
            )));
        }
        if idx < len {
            cx.invoke("set", &[Value::Int(idx), value.clone()])?;
            return Ok(());
        }
        Self::check_padding(index, idx)?;
        for _ in len..idx {
            cx.invoke("add", &[Value::Nil])?;
        }
        cx.invoke("add", std::slice::from_ref(value))?;
        Ok(())
    }

    /// Write `[start, length] = values`
    fn splice(cx: &CallContext<'_>, start: i64, length: i64, values: &Value) -> GuestResult<()> {
        let len = Self::size(cx, cx.receiver())?;
        let from = if start < 0 { start + len } else { start };
        if from < 0 {
            return Err(GuestError::Index(format!(
                "index {} too small for array; minimum: -{}",
                start, len
            )));
        }
        if length < 0 {
            return Err(GuestError::Index(format!("negative length ({})", length)));
        }
        if from > len {
            Self::check_padding(start, from)?;
        }
        for _ in len..from {
            cx.invoke("add", &[Value::Nil])?;
        }
        let len = len.max(from);
        for _ in 0..length.min(len - from) {
            cx.invoke("remove", &[Value::Int(from)])?;
        }
        let replacement = match values {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        };
        for (offset, item) in replacement.into_iter().enumerate() {
            let at = i64::try_from(offset)
                .ok()
                .and_then(|offset| from.checked_add(offset))
                .ok_or_else(|| GuestError::Index(format!("index {} too big", start)))?;
            cx.invoke("add", &[Value::Int(at), item])?;
        }
        Ok(())
    }

    /// `index`/`rindex`: value search when an argument is given, predicate
    /// search with a block otherwise
    fn position(cx: &CallContext<'_>, method: &str, args: &[Value], reverse: bool) -> GuestResult<Value> {
        check_arity(method, args, 0, 1)?;
        if let Some(needle) = args.first() {
            let foreign = if reverse { "lastIndexOf" } else { "indexOf" };
            let found = cx.invoke_int(foreign, std::slice::from_ref(needle))?;
            return Ok(if found < 0 { Value::Nil } else { Value::Int(found) });
        }

        let block = cx.require_block(method)?;
        let mut items: Vec<(usize, Value)> = collect_elements(cx, cx.receiver())?
            .into_iter()
            .enumerate()
            .collect();
        if reverse {
            items.reverse();
        }
        for (i, item) in items {
            if block.call(&[item])?.truthy() {
                return Ok(Value::Int(i as i64));
            }
        }
        Ok(Value::Nil)
    }

    /// Sort a foreign list in place through `Collections.sort`
    fn sort_in_place(cx: &CallContext<'_>, list: &ProxyObject) -> GuestResult<()> {
        let bridge = cx.bridge();
        let collections = bridge.lookup_class("java.util.Collections")?;
        let target = Value::Object(list.clone());
        let Some(block) = cx.block() else {
            bridge.call_static(&collections, "sort", &[target])?;
            return Ok(());
        };

        let failure = Arc::new(Mutex::new(None));
        let comparator = bridge.comparator_object(Some(block), Some(failure.clone()))?;
        match bridge.call_static(&collections, "sort", &[target, Value::Object(comparator)]) {
            Ok(_) => Ok(()),
            Err(err) => Err(failure.lock().take().unwrap_or(err)),
        }
    }
}

impl ProtocolAdapter for ListAdapter {
    fn capability(&self) -> Capability {
        Capability::List
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value> {
        match method {
            "[]" | "slice" => match args {
                [index] => Self::element(cx, int_arg(index)?),
                [start, length] => Self::slice(cx, int_arg(start)?, int_arg(length)?),
                _ => Err(GuestError::arity(method, args.len(), "1..2")),
            },
            "at" => {
                check_arity(method, args, 1, 1)?;
                Self::element(cx, int_arg(&args[0])?)
            }
            "[]=" => match args {
                [index, value] => {
                    Self::store(cx, int_arg(index)?, value)?;
                    Ok(value.clone())
                }
                [start, length, values] => {
                    Self::splice(cx, int_arg(start)?, int_arg(length)?, values)?;
                    Ok(values.clone())
                }
                _ => Err(GuestError::arity(method, args.len(), "2..3")),
            },
            "index" | "find_index" => Self::position(cx, method, args, false),
            "rindex" => Self::position(cx, method, args, true),
            "sort" => {
                check_arity(method, args, 0, 0)?;
                let copy = duplicate(cx, LIST_CLASS)?;
                Self::sort_in_place(cx, &copy)?;
                Ok(Value::Object(copy))
            }
            "sort!" => {
                check_arity(method, args, 0, 0)?;
                Self::sort_in_place(cx, cx.receiver())?;
                Ok(cx.receiver_value())
            }
            "first" | "last" => {
                check_arity(method, args, 0, 1)?;
                let len = Self::size(cx, cx.receiver())?;
                match args.first() {
                    None if method == "first" => Self::element(cx, 0),
                    None => Self::element(cx, -1),
                    Some(n) => {
                        let n = int_arg(n)?;
                        if n < 0 {
                            return Err(GuestError::Argument("negative array size".to_string()));
                        }
                        let n = n.min(len);
                        let start = if method == "first" { 0 } else { len - n };
                        Self::slice(cx, start, n)
                    }
                }
            }
            "to_ary" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Array(collect_elements(cx, cx.receiver())?))
            }
            _ => Err(GuestError::NoMethod {
                receiver: cx.receiver().class().guest_name().to_string(),
                method: method.to_string(),
            }),
        }
    }
}
