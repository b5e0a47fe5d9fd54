//! Throwable adapter

use super::{check_arity, collect_elements, display_string, expect_object, CallContext, Capability, ProtocolAdapter};
use crate::error::{GuestError, GuestResult};
use crate::value::Value;

const METHODS: &[&str] = &["message", "to_s", "backtrace", "set_backtrace", "inspect"];

/// Guest exception protocol for `java.lang.Throwable`
pub struct ThrowableAdapter;

impl ThrowableAdapter {
    /// Localized foreign message; `None` when the exception carries none
    fn foreign_message(cx: &CallContext<'_>) -> GuestResult<Option<String>> {
        match cx.invoke("getLocalizedMessage", &[])? {
            Value::Nil => Ok(None),
            other => display_string(cx.bridge(), &other).map(Some),
        }
    }

    fn backtrace(cx: &CallContext<'_>) -> GuestResult<Value> {
        let frames = match cx.invoke("getStackTrace", &[])? {
            Value::Nil => return Ok(Value::Nil),
            Value::Array(frames) => frames,
            other => {
                let trace = expect_object(other, "getStackTrace")?;
                collect_elements(cx, &trace)?
            }
        };
        let lines = frames
            .iter()
            .map(|frame| display_string(cx.bridge(), frame).map(Value::Str))
            .collect::<GuestResult<Vec<_>>>()?;
        Ok(Value::Array(lines))
    }
}

impl ProtocolAdapter for ThrowableAdapter {
    fn capability(&self) -> Capability {
        Capability::Throwable
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value> {
        let arity = usize::from(method == "set_backtrace");
        check_arity(method, args, arity, arity)?;
        match method {
            "message" | "to_s" => Ok(Value::Str(Self::foreign_message(cx)?.unwrap_or_default())),
            "inspect" => {
                let class = cx.receiver().class().guest_name().to_string();
                Ok(Value::Str(match Self::foreign_message(cx)? {
                    Some(message) if !message.is_empty() => format!("#<{}: {}>", class, message),
                    _ => class,
                }))
            }
            "backtrace" => Self::backtrace(cx),
            // the foreign trace stays authoritative
            "set_backtrace" => Ok(args[0].clone()),
            _ => Err(GuestError::NoMethod {
                receiver: cx.receiver().class().guest_name().to_string(),
                method: method.to_string(),
            }),
        }
    }
}
