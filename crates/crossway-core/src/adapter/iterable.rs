//! Iterable, Iterator and Enumeration adapters
//!
//! All three drive the foreign has-next/next protocol to exhaustion exactly
//! once per request; an iterable hands out a fresh iterator each time while
//! iterators and enumerations are consumed in place.

use super::{check_arity, collect_elements, each_element, int_arg, CallContext, Capability, ProtocolAdapter};
use crate::error::{GuestError, GuestResult};
use crate::value::Value;
use std::ops::ControlFlow;

const METHODS: &[&str] = &[
    "each",
    "each_with_index",
    "to_a",
    "entries",
    "map",
    "collect",
    "select",
    "filter",
    "reject",
    "count",
    "first",
    "include?",
    "member?",
    "find",
    "detect",
];

/// Enumerable protocol over a foreign iteration source
pub struct EnumerableAdapter {
    capability: Capability,
}

impl EnumerableAdapter {
    /// Adapter for `Iterable`, `Iterator` or `Enumeration`
    pub fn new(capability: Capability) -> Self {
        Self { capability }
    }
}

impl ProtocolAdapter for EnumerableAdapter {
    fn capability(&self) -> Capability {
        self.capability
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value> {
        let receiver = cx.receiver();
        match method {
            "each" => {
                check_arity(method, args, 0, 0)?;
                let block = cx.require_block(method)?;
                each_element(cx, receiver, |item| {
                    block.call(&[item])?;
                    Ok(ControlFlow::Continue(()))
                })?;
                Ok(cx.receiver_value())
            }
            "each_with_index" => {
                check_arity(method, args, 0, 0)?;
                let block = cx.require_block(method)?;
                let mut index = 0i64;
                each_element(cx, receiver, |item| {
                    block.call(&[item, Value::Int(index)])?;
                    index += 1;
                    Ok(ControlFlow::Continue(()))
                })?;
                Ok(cx.receiver_value())
            }
            "to_a" | "entries" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Array(collect_elements(cx, receiver)?))
            }
            "map" | "collect" => {
                let block = cx.require_block(method)?;
                let mut mapped = Vec::new();
                each_element(cx, receiver, |item| {
                    mapped.push(block.call(&[item])?);
                    Ok(ControlFlow::Continue(()))
                })?;
                Ok(Value::Array(mapped))
            }
            "select" | "filter" | "reject" => {
                let block = cx.require_block(method)?;
                let keep = method != "reject";
                let mut kept = Vec::new();
                each_element(cx, receiver, |item| {
                    if block.call(std::slice::from_ref(&item))?.truthy() == keep {
                        kept.push(item);
                    }
                    Ok(ControlFlow::Continue(()))
                })?;
                Ok(Value::Array(kept))
            }
            "count" => {
                check_arity(method, args, 0, 1)?;
                let mut count = 0i64;
                each_element(cx, receiver, |item| {
                    let hit = match (args.first(), cx.block()) {
                        (Some(needle), _) => cx.bridge().values_equal(&item, needle)?,
                        (None, Some(block)) => block.call(&[item])?.truthy(),
                        (None, None) => true,
                    };
                    if hit {
                        count += 1;
                    }
                    Ok(ControlFlow::Continue(()))
                })?;
                Ok(Value::Int(count))
            }
            "first" => {
                check_arity(method, args, 0, 1)?;
                match args.first() {
                    None => {
                        let mut first = Value::Nil;
                        each_element(cx, receiver, |item| {
                            first = item;
                            Ok(ControlFlow::Break(()))
                        })?;
                        Ok(first)
                    }
                    Some(n) => {
                        let n = int_arg(n)?;
                        if n < 0 {
                            return Err(GuestError::Argument("negative array size".to_string()));
                        }
                        let mut taken = Vec::new();
                        if n > 0 {
                            each_element(cx, receiver, |item| {
                                taken.push(item);
                                Ok(if taken.len() as i64 >= n {
                                    ControlFlow::Break(())
                                } else {
                                    ControlFlow::Continue(())
                                })
                            })?;
                        }
                        Ok(Value::Array(taken))
                    }
                }
            }
            "include?" | "member?" => {
                check_arity(method, args, 1, 1)?;
                let mut found = false;
                each_element(cx, receiver, |item| {
                    found = cx.bridge().values_equal(&item, &args[0])?;
                    Ok(if found {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    })
                })?;
                Ok(Value::Bool(found))
            }
            "find" | "detect" => {
                let block = cx.require_block(method)?;
                let mut found = Value::Nil;
                each_element(cx, receiver, |item| {
                    if block.call(std::slice::from_ref(&item))?.truthy() {
                        found = item;
                        return Ok(ControlFlow::Break(()));
                    }
                    Ok(ControlFlow::Continue(()))
                })?;
                Ok(found)
            }
            _ => Err(GuestError::NoMethod {
                receiver: receiver.class().guest_name().to_string(),
                method: method.to_string(),
            }),
        }
    }
}
