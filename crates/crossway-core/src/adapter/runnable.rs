//! Runnable adapter

use super::{check_arity, CallContext, Capability, ProtocolAdapter};
use crate::error::{GuestError, GuestResult};
use crate::value::{Block, Value};

const METHODS: &[&str] = &["call", "to_proc"];

/// Lets a foreign `Runnable` be called like a guest proc
pub struct RunnableAdapter;

impl ProtocolAdapter for RunnableAdapter {
    fn capability(&self) -> Capability {
        Capability::Runnable
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value> {
        check_arity(method, args, 0, 0)?;
        match method {
            "call" => cx.invoke("run", &[]),
            "to_proc" => {
                let bridge = cx.bridge().clone();
                let runnable = cx.receiver().clone();
                Ok(Value::Proc(Block::new(move |_| {
                    bridge.invoke_foreign(&runnable, "run", &[])
                })))
            }
            _ => Err(GuestError::NoMethod {
                receiver: cx.receiver().class().guest_name().to_string(),
                method: method.to_string(),
            }),
        }
    }
}
