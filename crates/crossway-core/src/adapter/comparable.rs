//! Comparable and Comparator adapters

use super::{check_arity, CallContext, Capability, ProtocolAdapter};
use crate::bridge::incomparable;
use crate::error::{ErrorCategory, GuestError, GuestResult};
use crate::value::{Block, Value};
use std::cmp::Ordering;

const COMPARABLE_METHODS: &[&str] = &["<=>", "<", "<=", ">", ">=", "between?", "clamp"];

const COMPARATOR_METHODS: &[&str] = &["call", "to_proc"];

/// Guest ordering operators over `compareTo`
pub struct ComparableAdapter;

impl ComparableAdapter {
    /// `receiver <=> other`, with `None` for incomparable operands
    fn spaceship(cx: &CallContext<'_>, other: &Value) -> GuestResult<Option<Ordering>> {
        match cx.bridge().compare_values(&cx.receiver_value(), other) {
            Ok(ordering) => Ok(ordering),
            Err(err) if err.category() == ErrorCategory::Type => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn ordering(cx: &CallContext<'_>, other: &Value) -> GuestResult<Ordering> {
        Self::spaceship(cx, other)?.ok_or_else(|| incomparable(&cx.receiver_value(), other))
    }
}

impl ProtocolAdapter for ComparableAdapter {
    fn capability(&self) -> Capability {
        Capability::Comparable
    }

    fn methods(&self) -> &'static [&'static str] {
        COMPARABLE_METHODS
    }

    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value> {
        match method {
            "<=>" => {
                check_arity(method, args, 1, 1)?;
                Ok(match Self::spaceship(cx, &args[0])? {
                    Some(ordering) => Value::Int(ordering as i64),
                    None => Value::Nil,
                })
            }
            "<" | "<=" | ">" | ">=" => {
                check_arity(method, args, 1, 1)?;
                let ordering = Self::ordering(cx, &args[0])?;
                let result = match method {
                    "<" => ordering.is_lt(),
                    "<=" => ordering.is_le(),
                    ">" => ordering.is_gt(),
                    _ => ordering.is_ge(),
                };
                Ok(Value::Bool(result))
            }
            "between?" => {
                check_arity(method, args, 2, 2)?;
                let above_min = Self::ordering(cx, &args[0])?.is_ge();
                let below_max = Self::ordering(cx, &args[1])?.is_le();
                Ok(Value::Bool(above_min && below_max))
            }
            "clamp" => {
                check_arity(method, args, 2, 2)?;
                let (min, max) = (&args[0], &args[1]);
                if cx.bridge().compare_values(min, max)? == Some(Ordering::Greater) {
                    return Err(GuestError::Argument(
                        "min argument must be less than or equal to max argument".to_string(),
                    ));
                }
                if Self::ordering(cx, min)?.is_lt() {
                    return Ok(min.clone());
                }
                if Self::ordering(cx, max)?.is_gt() {
                    return Ok(max.clone());
                }
                Ok(cx.receiver_value())
            }
            _ => Err(GuestError::NoMethod {
                receiver: cx.receiver().class().guest_name().to_string(),
                method: method.to_string(),
            }),
        }
    }
}

/// Lets a foreign `Comparator` be called like a guest proc
pub struct ComparatorAdapter;

impl ProtocolAdapter for ComparatorAdapter {
    fn capability(&self) -> Capability {
        Capability::Comparator
    }

    fn methods(&self) -> &'static [&'static str] {
        COMPARATOR_METHODS
    }

    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value> {
        match method {
            "call" => {
                check_arity(method, args, 2, 2)?;
                cx.invoke("compare", args)
            }
            "to_proc" => {
                check_arity(method, args, 0, 0)?;
                let bridge = cx.bridge().clone();
                let comparator = cx.receiver().clone();
                Ok(Value::Proc(Block::new(move |args| {
                    bridge.invoke_foreign(&comparator, "compare", args)
                })))
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
    use crate::error::GuestError;
    use crate::host::memory::MemoryHost;
    use crate::value::{Block, Value};
    use std::sync::Arc;

    fn setup() -> Bridge {
        Bridge::new(Arc::new(MemoryHost::new()))
    }

    fn big(bridge: &Bridge, n: i64) -> Value {
        let class = bridge.lookup_class("java.math.BigInteger").unwrap();
        bridge.call_static(&class, "valueOf", &[Value::Int(n)]).unwrap()
    }

    #[test]
    fn test_spaceship() {
        let bridge = setup();
        let five = big(&bridge, 5);
        let seven = big(&bridge, 7);
        assert_eq!(bridge.call(&five, "<=>", &[seven.clone()], None).unwrap(), Value::Int(-1));
        assert_eq!(bridge.call(&seven, "<=>", &[five.clone()], None).unwrap(), Value::Int(1));
        assert_eq!(bridge.call(&five, "<=>", &[Value::Int(5)], None).unwrap(), Value::Int(0));
        assert_eq!(bridge.call(&five, "<=>", &[Value::Nil], None).unwrap(), Value::Nil);
        assert_eq!(bridge.call(&five, "<=>", &[Value::str("x")], None).unwrap(), Value::Nil);
    }

    #[test]
    fn test_relational_operators() {
        let bridge = setup();
        let five = big(&bridge, 5);
        let seven = big(&bridge, 7);
        let yes = Value::Bool(true);
        let no = Value::Bool(false);
        assert_eq!(bridge.call(&five, "<", &[seven.clone()], None).unwrap(), yes);
        assert_eq!(bridge.call(&five, "<=", &[Value::Int(5)], None).unwrap(), yes);
        assert_eq!(bridge.call(&five, ">", &[seven.clone()], None).unwrap(), no);
        assert_eq!(bridge.call(&seven, ">=", &[five], None).unwrap(), yes);

        let err = bridge.call(&seven, "<", &[Value::Nil], None).unwrap_err();
        assert!(matches!(err, GuestError::Argument(m) if m.starts_with("comparison of")));
    }

    #[test]
    fn test_between_and_clamp() {
        let bridge = setup();
        let five = big(&bridge, 5);
        assert_eq!(
            bridge.call(&five, "between?", &[Value::Int(1), Value::Int(5)], None).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            bridge.call(&five, "between?", &[Value::Int(6), Value::Int(9)], None).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            bridge.call(&five, "clamp", &[Value::Int(7), Value::Int(9)], None).unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            bridge.call(&five, "clamp", &[Value::Int(1), Value::Int(3)], None).unwrap(),
            Value::Int(3)
        );
        assert_eq!(bridge.call(&five, "clamp", &[Value::Int(1), Value::Int(9)], None).unwrap(), five);
        assert!(matches!(
            bridge.call(&five, "clamp", &[Value::Int(9), Value::Int(1)], None),
            Err(GuestError::Argument(_))
        ));
    }

    #[test]
    fn test_comparator_is_callable() {
        let bridge = setup();
        let reverse = Block::new(|args| Ok(Value::Int(args[1].as_int().unwrap_or(0) - args[0].as_int().unwrap_or(0))));
        let comparator = Value::Object(bridge.wrap_comparator(Some(&reverse)).unwrap());

        assert_eq!(
            bridge.call(&comparator, "call", &[Value::Int(1), Value::Int(2)], None).unwrap(),
            Value::Int(1)
        );
        let proc = bridge.call(&comparator, "to_proc", &[], None).unwrap();
        let Value::Proc(proc) = proc else {
            panic!("expected a proc, got {:?}", proc);
        };
        assert_eq!(proc.call(&[Value::Int(3), Value::Int(2)]).unwrap(), Value::Int(-1));
    }
}
