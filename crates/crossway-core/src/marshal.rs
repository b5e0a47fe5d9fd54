//! Value marshalling across the guest/host boundary
//!
//! Scalars cross by value. Guest arrays and hashes are copied into fresh
//! host lists and maps; foreign objects cross as their identity. On the way
//! back, host objects become [`ProxyObject`]s of their singleton class.

use crate::bridge::Bridge;
use crate::error::{GuestError, GuestResult};
use crate::host::HostValue;
use crate::proxy::ProxyObject;
use crate::value::Value;
use thiserror::Error;

/// Maximum nesting depth of guest containers passed to the host
pub const MAX_DEPTH: usize = 64;

/// Host class guest arrays are copied into
pub const LIST_CLASS: &str = "java.util.ArrayList";

/// Host class guest hashes are copied into
pub const MAP_CLASS: &str = "java.util.LinkedHashMap";

/// Errors that can occur during marshalling
#[derive(Debug, Clone, Error)]
pub enum MarshalError {
    /// Value has no host representation
    #[error("Value cannot be marshalled: {0}")]
    Unmarshallable(String),

    /// Maximum marshalling depth exceeded
    #[error("Maximum marshalling depth exceeded")]
    MaxDepthExceeded,
}

impl From<MarshalError> for GuestError {
    fn from(err: MarshalError) -> Self {
        match err {
            MarshalError::MaxDepthExceeded => GuestError::Argument(err.to_string()),
            MarshalError::Unmarshallable(_) => GuestError::Type(err.to_string()),
        }
    }
}

/// Convert a guest value for a host call
///
/// # Arguments
/// * `bridge` - Bridge whose host receives the value
/// * `value` - The value to convert
///
/// # Returns
/// * `Ok(HostValue)` - The host representation
/// * `Err(GuestError)` - The value cannot cross, or building a container failed
pub fn marshal(bridge: &Bridge, value: &Value) -> GuestResult<HostValue> {
    marshal_recursive(bridge, value, 0)
}

/// Convert a slice of guest arguments
pub fn marshal_args(bridge: &Bridge, args: &[Value]) -> GuestResult<Vec<HostValue>> {
    args.iter().map(|arg| marshal(bridge, arg)).collect()
}

fn marshal_recursive(bridge: &Bridge, value: &Value, depth: usize) -> GuestResult<HostValue> {
    if depth > MAX_DEPTH {
        return Err(MarshalError::MaxDepthExceeded.into());
    }

    match value {
        Value::Nil => Ok(HostValue::Null),
        Value::Bool(b) => Ok(HostValue::Bool(*b)),
        Value::Int(i) => Ok(HostValue::Int(*i)),
        Value::Float(x) => Ok(HostValue::Double(*x)),
        Value::Str(s) => Ok(HostValue::Str(s.clone())),
        Value::Object(object) => Ok(HostValue::Object(object.id())),
        Value::Io(stream) => Ok(HostValue::Object(stream.foreign().id())),

        Value::Array(items) => {
            let list = new_container(bridge, LIST_CLASS)?;
            for item in items {
                let item = marshal_recursive(bridge, item, depth + 1)?;
                bridge.host_call(bridge.host().invoke(list, "add", &[item]))?;
            }
            Ok(HostValue::Object(list))
        }

        Value::Hash(entries) => {
            let map = new_container(bridge, MAP_CLASS)?;
            for (key, val) in entries {
                let key = marshal_recursive(bridge, key, depth + 1)?;
                let val = marshal_recursive(bridge, val, depth + 1)?;
                bridge.host_call(bridge.host().invoke(map, "put", &[key, val]))?;
            }
            Ok(HostValue::Object(map))
        }

        Value::Class(_) | Value::Package(_) | Value::Proc(_) => {
            Err(MarshalError::Unmarshallable(value.type_name()).into())
        }
    }
}

fn new_container(bridge: &Bridge, class_name: &str) -> GuestResult<crate::host::ObjectId> {
    let class = bridge.lookup_class(class_name)?;
    let created = bridge.host_call(bridge.host().new_instance(class.id(), &[]))?;
    created.as_object().ok_or_else(|| {
        GuestError::Type(format!("{} constructor returned {}", class_name, created.type_name()))
    })
}

/// Convert a host result for the guest
///
/// Host objects are wrapped in a [`ProxyObject`] of their runtime class.
pub fn unmarshal(bridge: &Bridge, value: HostValue) -> GuestResult<Value> {
    match value {
        HostValue::Null => Ok(Value::Nil),
        HostValue::Bool(b) => Ok(Value::Bool(b)),
        HostValue::Int(i) => Ok(Value::Int(i)),
        HostValue::Double(x) => Ok(Value::Float(x)),
        HostValue::Str(s) => Ok(Value::Str(s)),
        HostValue::Object(id) => {
            let host = bridge.host();
            let class_id = bridge.host_call(host.class_of(id))?;
            let class = bridge.host_call(bridge.classes().intern(host.as_ref(), class_id))?;
            Ok(Value::Object(ProxyObject::new(id, class)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::host::HostRuntime;
    use std::sync::Arc;

    fn bridge() -> (Arc<MemoryHost>, Bridge) {
        let host = Arc::new(MemoryHost::new());
        (host.clone(), Bridge::new(host))
    }

    #[test]
    fn test_scalars_cross_by_value() {
        let (_, bridge) = bridge();
        for value in [Value::Nil, Value::Bool(true), Value::Int(-3), Value::Float(0.5), Value::str("x")] {
            let host = marshal(&bridge, &value).unwrap();
            assert_eq!(unmarshal(&bridge, host).unwrap(), value);
        }
    }

    #[test]
    fn test_array_becomes_host_list() {
        let (host, bridge) = bridge();
        let value = Value::Array(vec![Value::Int(1), Value::Array(vec![Value::str("a")])]);
        let list = marshal(&bridge, &value).unwrap().as_object().unwrap();

        assert_eq!(host.invoke(list, "size", &[]).unwrap(), HostValue::Int(2));
        let proxy = unmarshal(&bridge, HostValue::Object(list)).unwrap();
        assert_eq!(proxy.as_object().unwrap().class().name(), LIST_CLASS);
    }

    #[test]
    fn test_hash_keeps_insertion_order() {
        let (host, bridge) = bridge();
        let value = Value::Hash(vec![
            (Value::str("b"), Value::Int(2)),
            (Value::str("a"), Value::Int(1)),
        ]);
        let map = marshal(&bridge, &value).unwrap().as_object().unwrap();
        assert_eq!(
            host.invoke(map, "toString", &[]).unwrap(),
            HostValue::Str("{b=2, a=1}".to_string())
        );
    }

    #[test]
    fn test_depth_limit() {
        let (_, bridge) = bridge();
        let mut value = Value::Nil;
        for _ in 0..=MAX_DEPTH + 1 {
            value = Value::Array(vec![value]);
        }
        assert!(matches!(marshal(&bridge, &value), Err(GuestError::Argument(_))));
    }

    #[test]
    fn test_classes_do_not_cross() {
        let (_, bridge) = bridge();
        let class = bridge.lookup("java.util.ArrayList").unwrap();
        let err = marshal(&bridge, &class).unwrap_err();
        assert!(matches!(err, GuestError::Type(_)));
        assert!(err.to_string().contains("Class"));
    }
}
