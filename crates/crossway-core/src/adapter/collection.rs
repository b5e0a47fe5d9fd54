//! Collection adapter
//!
//! `<<` mutates and returns the receiver; `+` and `-` work on a duplicate
//! and leave the receiver untouched.

use super::{check_arity, collect_elements, display_string, duplicate, CallContext, Capability, ProtocolAdapter};
use crate::error::{GuestError, GuestResult};
use crate::marshal::LIST_CLASS;
use crate::value::Value;

const METHODS: &[&str] = &["<<", "+", "-", "length", "size", "empty?", "join", "to_a", "include?"];

/// Guest protocol for `java.util.Collection`
pub struct CollectionAdapter;

impl CollectionAdapter {
    fn operand(method: &str, value: &Value) -> GuestResult<Value> {
        match value {
            Value::Array(_) => Ok(value.clone()),
            Value::Object(object) if object.class().has_capability(Capability::Collection) => Ok(value.clone()),
            other => Err(GuestError::Type(format!(
                "no implicit conversion of {} into Array ({})",
                other.type_name(),
                method
            ))),
        }
    }
}

impl ProtocolAdapter for CollectionAdapter {
    fn capability(&self) -> Capability {
        Capability::Collection
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value> {
        match method {
            "<<" => {
                check_arity(method, args, 1, 1)?;
                cx.invoke("add", args)?;
                Ok(cx.receiver_value())
            }
            "+" | "-" => {
                check_arity(method, args, 1, 1)?;
                let operand = Self::operand(method, &args[0])?;
                let copy = duplicate(cx, LIST_CLASS)?;
                let bulk = if method == "+" { "addAll" } else { "removeAll" };
                cx.invoke_on(&copy, bulk, &[operand])?;
                Ok(Value::Object(copy))
            }
            "length" | "size" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Int(cx.invoke_int("size", &[])?))
            }
            "empty?" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Bool(cx.invoke_int("size", &[])? == 0))
            }
            "join" => {
                check_arity(method, args, 0, 1)?;
                let separator = match args.first() {
                    None | Some(Value::Nil) => String::new(),
                    Some(Value::Str(s)) => s.clone(),
                    Some(other) => {
                        return Err(GuestError::Type(format!(
                            "no implicit conversion of {} into String",
                            other.type_name()
                        )))
                    }
                };
                let parts = collect_elements(cx, cx.receiver())?
                    .iter()
                    .map(|item| display_string(cx.bridge(), item))
                    .collect::<GuestResult<Vec<_>>>()?;
                Ok(Value::Str(parts.join(&separator)))
            }
            "to_a" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Array(collect_elements(cx, cx.receiver())?))
            }
            "include?" => {
                check_arity(method, args, 1, 1)?;
                Ok(Value::Bool(cx.invoke("contains", args)?.truthy()))
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
    use crate::value::Value;
    use std::sync::Arc;

    fn setup() -> Bridge {
        Bridge::new(Arc::new(MemoryHost::new()))
    }

    fn ints(items: &[i64]) -> Value {
        Value::Array(items.iter().map(|i| Value::Int(*i)).collect())
    }

    fn list(bridge: &Bridge, items: &[i64]) -> Value {
        bridge.wrap(bridge.unwrap(&ints(items)).unwrap()).unwrap()
    }

    #[test]
    fn test_append_returns_self() {
        let bridge = setup();
        let list = list(&bridge, &[1]);
        let result = bridge.call(&list, "<<", &[Value::Int(2)], None).unwrap();
        assert_eq!(result, list);
        assert_eq!(bridge.call(&list, "to_a", &[], None).unwrap(), ints(&[1, 2]));
    }

    #[test]
    fn test_plus_minus_leave_receiver_alone() {
        let bridge = setup();
        let list = list(&bridge, &[1, 2, 3]);

        let sum = bridge.call(&list, "+", &[ints(&[4])], None).unwrap();
        let diff = bridge.call(&list, "-", &[ints(&[2])], None).unwrap();

        assert_eq!(bridge.call(&sum, "to_a", &[], None).unwrap(), ints(&[1, 2, 3, 4]));
        assert_eq!(bridge.call(&diff, "to_a", &[], None).unwrap(), ints(&[1, 3]));
        assert_eq!(bridge.call(&list, "to_a", &[], None).unwrap(), ints(&[1, 2, 3]));
        assert_eq!(
            sum.as_object().unwrap().class().name(),
            list.as_object().unwrap().class().name()
        );
    }

    #[test]
    fn test_plus_with_foreign_collection() {
        let bridge = setup();
        let a = list(&bridge, &[1]);
        let b = list(&bridge, &[2, 3]);
        let sum = bridge.call(&a, "+", &[b], None).unwrap();
        assert_eq!(bridge.call(&sum, "size", &[], None).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_set_view_dup() {
        let bridge = setup();
        let map = bridge
            .wrap(
                bridge
                    .unwrap(&Value::Hash(vec![(Value::str("a"), Value::Int(1))]))
                    .unwrap(),
            )
            .unwrap();
        let keys = bridge.call(&map, "keySet", &[], None).unwrap();
        let more = bridge.call(&keys, "+", &[Value::Array(vec![Value::str("b")])], None).unwrap();
        assert_eq!(bridge.call(&more, "length", &[], None).unwrap(), Value::Int(2));
        assert_eq!(bridge.call(&keys, "length", &[], None).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_queries() {
        let bridge = setup();
        let empty = list(&bridge, &[]);
        let list = list(&bridge, &[1, 2]);
        assert_eq!(bridge.call(&list, "empty?", &[], None).unwrap(), Value::Bool(false));
        assert_eq!(bridge.call(&empty, "empty?", &[], None).unwrap(), Value::Bool(true));
        assert_eq!(bridge.call(&list, "include?", &[Value::Int(2)], None).unwrap(), Value::Bool(true));
        assert_eq!(
            bridge.call(&list, "join", &[Value::str("-")], None).unwrap(),
            Value::str("1-2")
        );
    }

    #[test]
    fn test_bad_operand() {
        let bridge = setup();
        let list = list(&bridge, &[1]);
        let err = bridge.call(&list, "+", &[Value::Int(1)], None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Type);
        assert!(matches!(
            bridge.call(&list, "<<", &[], None),
            Err(GuestError::Argument(_))
        ));
    }
}
