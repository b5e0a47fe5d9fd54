//! Stream adapter
//!
//! `to_io` turns a foreign stream into a guest IO handle ([`GuestStream`]).
//! Byte streams move one byte per `read()`/`write(int)` call. Readers and
//! writers move UTF-16 code units, which the handle converts to and from the
//! guest's UTF-8 bytes. With `autoclose` set, closing or dropping the guest handle closes the
//! foreign stream too; without it the foreign stream outlives the handle.

use super::{check_arity, display_string, CallContext, Capability, ProtocolAdapter};
use crate::bridge::Bridge;
use crate::error::{GuestError, GuestResult};
use crate::proxy::ProxyObject;
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const METHODS: &[&str] = &["to_io"];

/// Options accepted by `to_io`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Close the foreign stream when the guest handle is closed or dropped
    pub autoclose: bool,
}

impl StreamOptions {
    /// Parse a guest options hash
    ///
    /// # Arguments
    /// * `options` - `nil`, absent, or a hash with an `autoclose` key
    /// * `default_autoclose` - Used when the hash does not say
    pub fn from_value(options: Option<&Value>, default_autoclose: bool) -> GuestResult<Self> {
        let autoclose = match options {
            None | Some(Value::Nil) => default_autoclose,
            Some(hash @ Value::Hash(_)) => hash
                .hash_get(&Value::str("autoclose"))
                .map_or(default_autoclose, Value::truthy),
            Some(other) => {
                return Err(GuestError::Type(format!(
                    "no implicit conversion of {} into Hash",
                    other.type_name()
                )))
            }
        };
        Ok(Self { autoclose })
    }
}

/// Unit a foreign stream transfers per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamUnit {
    /// `InputStream`/`OutputStream`
    Byte,
    /// `Reader`/`Writer`
    Char,
}

impl StreamUnit {
    /// Unit of a foreign stream object
    pub fn of(stream: &ProxyObject) -> Self {
        let is_char = stream
            .class()
            .ancestors()
            .iter()
            .any(|name| name == "java.io.Reader" || name == "java.io.Writer");
        if is_char {
            StreamUnit::Char
        } else {
            StreamUnit::Byte
        }
    }
}

/// Guest IO handle over a foreign stream
pub struct GuestStream {
    bridge: Bridge,
    foreign: ProxyObject,
    unit: StreamUnit,
    /// UTF-8 bytes of a decoded char not yet handed out
    pending: Mutex<VecDeque<u8>>,
    autoclose: AtomicBool,
    closed: AtomicBool,
}

impl GuestStream {
    /// Wrap a foreign stream
    pub fn new(bridge: Bridge, foreign: ProxyObject, options: StreamOptions) -> Self {
        Self {
            unit: StreamUnit::of(&foreign),
            bridge,
            foreign,
            pending: Mutex::new(VecDeque::new()),
            autoclose: AtomicBool::new(options.autoclose),
            closed: AtomicBool::new(false),
        }
    }

    /// Byte or char transfer
    pub fn unit(&self) -> StreamUnit {
        self.unit
    }

    /// The foreign stream
    pub fn foreign(&self) -> &ProxyObject {
        &self.foreign
    }

    /// Whether closing this handle closes the foreign stream
    pub fn autoclose(&self) -> bool {
        self.autoclose.load(Ordering::Acquire)
    }

    /// Check if the guest handle is closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> GuestResult<()> {
        if self.is_closed() {
            return Err(GuestError::Io("closed stream".to_string()));
        }
        Ok(())
    }

    /// One foreign `read()`; `None` at end of stream
    fn read_unit(&self) -> GuestResult<Option<i64>> {
        let unit = self.bridge.invoke_foreign(&self.foreign, "read", &[])?;
        match unit.as_int() {
            Some(-1) => Ok(None),
            Some(unit) => Ok(Some(unit)),
            None => Err(GuestError::Type(format!("read returned {}", unit.type_name()))),
        }
    }

    /// Read one char from a reader, joining surrogate pairs
    ///
    /// A lone surrogate decodes to U+FFFD.
    fn read_char(&self) -> GuestResult<Option<char>> {
        let Some(first) = self.read_unit()? else {
            return Ok(None);
        };
        let first = (first & 0xffff) as u16;
        let mut units = vec![first];
        if (0xd800..0xdc00).contains(&first) {
            if let Some(second) = self.read_unit()? {
                units.push((second & 0xffff) as u16);
            }
        }
        let mut decoded = char::decode_utf16(units.iter().copied())
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER));
        let ch = decoded.next().unwrap_or(char::REPLACEMENT_CHARACTER);
        // a high surrogate followed by a non-low unit: keep the second char
        if let Some(rest) = decoded.next() {
            let mut buf = [0; 4];
            self.pending.lock().extend(rest.encode_utf8(&mut buf).as_bytes());
        }
        Ok(Some(ch))
    }

    /// Read one byte; `None` at end of stream
    ///
    /// Reader chars are handed out one UTF-8 byte at a time.
    pub fn read_byte(&self) -> GuestResult<Option<u8>> {
        self.ensure_open()?;
        if let Some(byte) = self.pending.lock().pop_front() {
            return Ok(Some(byte));
        }
        match self.unit {
            StreamUnit::Byte => Ok(self.read_unit()?.map(|b| (b & 0xff) as u8)),
            StreamUnit::Char => {
                let Some(ch) = self.read_char()? else {
                    return Ok(None);
                };
                let mut buf = [0; 4];
                let encoded = ch.encode_utf8(&mut buf).as_bytes();
                let mut pending = self.pending.lock();
                // pending may already hold the char after a broken pair
                for byte in encoded[1..].iter().rev() {
                    pending.push_front(*byte);
                }
                Ok(Some(encoded[0]))
            }
        }
    }

    /// Read one UTF-8 character as a string; `None` at end of stream
    pub fn getc(&self) -> GuestResult<Option<String>> {
        let Some(first) = self.read_byte()? else {
            return Ok(None);
        };
        let width = match first {
            0xf0..=0xf7 => 4,
            0xe0..=0xef => 3,
            0xc0..=0xdf => 2,
            _ => 1,
        };
        let mut bytes = vec![first];
        while bytes.len() < width {
            match self.read_byte()? {
                Some(byte) => bytes.push(byte),
                None => break,
            }
        }
        Ok(Some(lossy(bytes)))
    }

    /// Read up to `limit` bytes, or to end of stream when `limit` is `None`
    pub fn read(&self, limit: Option<usize>) -> GuestResult<Vec<u8>> {
        let mut bytes = Vec::new();
        while limit.map_or(true, |limit| bytes.len() < limit) {
            match self.read_byte()? {
                Some(byte) => bytes.push(byte),
                None => break,
            }
        }
        Ok(bytes)
    }

    /// Write every byte of `bytes`
    ///
    /// Writers receive the UTF-16 code units of the decoded text; invalid
    /// UTF-8 is replaced with U+FFFD. The count is always in bytes.
    pub fn write(&self, bytes: &[u8]) -> GuestResult<usize> {
        self.ensure_open()?;
        match self.unit {
            StreamUnit::Byte => {
                for byte in bytes {
                    self.bridge
                        .invoke_foreign(&self.foreign, "write", &[Value::Int(i64::from(*byte))])?;
                }
            }
            StreamUnit::Char => {
                for unit in String::from_utf8_lossy(bytes).encode_utf16() {
                    self.bridge
                        .invoke_foreign(&self.foreign, "write", &[Value::Int(i64::from(unit))])?;
                }
            }
        }
        Ok(bytes.len())
    }

    /// Flush the foreign stream
    pub fn flush(&self) -> GuestResult<()> {
        self.ensure_open()?;
        self.bridge.invoke_foreign(&self.foreign, "flush", &[])?;
        Ok(())
    }

    /// Close the guest handle, and the foreign stream when `autoclose` is set
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) -> GuestResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if self.autoclose() {
            tracing::debug!(target: "crossway::adapter", object = self.foreign.id().0, "closing foreign stream");
            self.bridge.invoke_foreign(&self.foreign, "close", &[])?;
        }
        Ok(())
    }

    /// Guest IO protocol
    pub fn call(self: &Arc<Self>, method: &str, args: &[Value]) -> GuestResult<Value> {
        match method {
            "read" => {
                check_arity(method, args, 0, 1)?;
                match args.first() {
                    None | Some(Value::Nil) => Ok(Value::Str(lossy(self.read(None)?))),
                    Some(length) => {
                        let length = usize::try_from(super::int_arg(length)?)
                            .map_err(|_| GuestError::Argument("negative length".to_string()))?;
                        let bytes = self.read(Some(length))?;
                        if bytes.is_empty() && length > 0 {
                            return Ok(Value::Nil);
                        }
                        Ok(Value::Str(lossy(bytes)))
                    }
                }
            }
            "getc" => {
                check_arity(method, args, 0, 0)?;
                Ok(self.getc()?.map_or(Value::Nil, Value::Str))
            }
            "write" => {
                let mut written = 0;
                for arg in args {
                    written += self.write(display_string(&self.bridge, arg)?.as_bytes())?;
                }
                Ok(Value::Int(written as i64))
            }
            "<<" => {
                check_arity(method, args, 1, 1)?;
                self.write(display_string(&self.bridge, &args[0])?.as_bytes())?;
                Ok(Value::Io(self.clone()))
            }
            "flush" => {
                check_arity(method, args, 0, 0)?;
                self.flush()?;
                Ok(Value::Io(self.clone()))
            }
            "close" => {
                check_arity(method, args, 0, 0)?;
                self.close()?;
                Ok(Value::Nil)
            }
            "closed?" => Ok(Value::Bool(self.is_closed())),
            "autoclose?" => Ok(Value::Bool(self.autoclose())),
            "autoclose=" => {
                check_arity(method, args, 1, 1)?;
                self.autoclose.store(args[0].truthy(), Ordering::Release);
                Ok(args[0].clone())
            }
            "to_java" => Ok(Value::Object(self.foreign.clone())),
            _ => Err(GuestError::NoMethod {
                receiver: "IO".to_string(),
                method: method.to_string(),
            }),
        }
    }
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

impl fmt::Debug for GuestStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestStream")
            .field("foreign", &self.foreign.id())
            .field("unit", &self.unit)
            .field("autoclose", &self.autoclose())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for GuestStream {
    fn drop(&mut self) {
        if self.autoclose() && !self.is_closed() {
            if let Err(err) = self.close() {
                tracing::debug!(target: "crossway::adapter", error = %err, "closing dropped stream failed");
            }
        }
    }
}

/// Guest `to_io` for foreign streams
pub struct StreamAdapter;

impl ProtocolAdapter for StreamAdapter {
    fn capability(&self) -> Capability {
        Capability::Stream
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn call(&self, cx: &CallContext<'_>, method: &str, args: &[Value]) -> GuestResult<Value> {
        match method {
            "to_io" => {
                check_arity(method, args, 0, 1)?;
                let bridge = cx.bridge();
                let options = StreamOptions::from_value(args.first(), bridge.config().stream.autoclose)?;
                let stream = GuestStream::new(bridge.clone(), cx.receiver().clone(), options);
                Ok(Value::Io(Arc::new(stream)))
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
    use super::*;
    use crate::config::BridgeConfig;
    use crate::error::ErrorCategory;
    use crate::host::memory::MemoryHost;

    fn setup() -> (Arc<MemoryHost>, Bridge) {
        let host = Arc::new(MemoryHost::new());
        (host.clone(), Bridge::new(host))
    }

    fn input(bridge: &Bridge, text: &str) -> Value {
        let class = bridge.lookup_class("java.io.ByteArrayInputStream").unwrap();
        bridge.new_object(&class, &[Value::str(text)]).unwrap()
    }

    fn output(bridge: &Bridge) -> Value {
        let class = bridge.lookup_class("java.io.ByteArrayOutputStream").unwrap();
        bridge.new_object(&class, &[]).unwrap()
    }

    fn foreign_id(value: &Value) -> crate::host::ObjectId {
        value.as_object().unwrap().id()
    }

    #[test]
    fn test_options() {
        assert!(StreamOptions::from_value(None, true).unwrap().autoclose);
        let off = Value::Hash(vec![(Value::str("autoclose"), Value::Bool(false))]);
        assert!(!StreamOptions::from_value(Some(&off), true).unwrap().autoclose);
        let silent = Value::Hash(vec![]);
        assert!(!StreamOptions::from_value(Some(&silent), false).unwrap().autoclose);
        assert!(StreamOptions::from_value(Some(&Value::Int(1)), true).is_err());
    }

    #[test]
    fn test_read() {
        let (_, bridge) = setup();
        let io = bridge.call(&input(&bridge, "hello"), "to_io", &[], None).unwrap();
        assert_eq!(bridge.call(&io, "getc", &[], None).unwrap(), Value::str("h"));
        assert_eq!(bridge.call(&io, "read", &[Value::Int(2)], None).unwrap(), Value::str("el"));
        assert_eq!(bridge.call(&io, "read", &[], None).unwrap(), Value::str("lo"));
        assert_eq!(bridge.call(&io, "read", &[], None).unwrap(), Value::str(""));
        assert_eq!(bridge.call(&io, "read", &[Value::Int(1)], None).unwrap(), Value::Nil);
        assert_eq!(bridge.call(&io, "getc", &[], None).unwrap(), Value::Nil);
    }

    #[test]
    fn test_write() {
        let (_, bridge) = setup();
        let out = output(&bridge);
        let io = bridge.call(&out, "to_io", &[], None).unwrap();
        assert_eq!(bridge.call(&io, "write", &[Value::str("ab"), Value::Int(7)], None).unwrap(), Value::Int(3));
        let same = bridge.call(&io, "<<", &[Value::str("!")], None).unwrap();
        assert_eq!(same, io);
        assert_eq!(bridge.call(&out, "toString", &[], None).unwrap(), Value::str("ab7!"));
        assert_eq!(bridge.call(&io, "to_java", &[], None).unwrap(), out);
    }

    #[test]
    fn test_reader_decodes_chars() {
        let (_, bridge) = setup();
        let class = bridge.lookup_class("java.io.StringReader").unwrap();
        let reader = bridge.new_object(&class, &[Value::str("中a😀b")]).unwrap();
        let io = bridge.call(&reader, "to_io", &[], None).unwrap();
        match &io {
            Value::Io(stream) => assert_eq!(stream.unit(), StreamUnit::Char),
            other => panic!("Expected io, got {:?}", other),
        }

        assert_eq!(bridge.call(&io, "getc", &[], None).unwrap(), Value::str("中"));
        assert_eq!(bridge.call(&io, "getc", &[], None).unwrap(), Value::str("a"));
        // a surrogate pair is one char on the guest side
        assert_eq!(bridge.call(&io, "read", &[Value::Int(4)], None).unwrap(), Value::str("😀"));
        assert_eq!(bridge.call(&io, "read", &[], None).unwrap(), Value::str("b"));
        assert_eq!(bridge.call(&io, "getc", &[], None).unwrap(), Value::Nil);
    }

    #[test]
    fn test_writer_round_trip() {
        let (_, bridge) = setup();
        let class = bridge.lookup_class("java.io.StringWriter").unwrap();
        let writer = bridge.new_object(&class, &[]).unwrap();
        let io = bridge.call(&writer, "to_io", &[], None).unwrap();

        let text = "héllo 世界 😀";
        let written = bridge.call(&io, "write", &[Value::str(text)], None).unwrap();
        assert_eq!(written, Value::Int(text.len() as i64));
        assert_eq!(bridge.call(&writer, "toString", &[], None).unwrap(), Value::str(text));

        let class = bridge.lookup_class("java.io.StringReader").unwrap();
        let reader = bridge.new_object(&class, &[Value::str(text)]).unwrap();
        let io = bridge.call(&reader, "to_io", &[], None).unwrap();
        assert_eq!(bridge.call(&io, "read", &[], None).unwrap(), Value::str(text));
    }

    #[test]
    fn test_byte_stream_getc_reads_whole_char() {
        let (_, bridge) = setup();
        let io = bridge.call(&input(&bridge, "é!"), "to_io", &[], None).unwrap();
        assert_eq!(bridge.call(&io, "getc", &[], None).unwrap(), Value::str("é"));
        assert_eq!(bridge.call(&io, "getc", &[], None).unwrap(), Value::str("!"));
    }

    #[test]
    fn test_close_with_autoclose() {
        let (host, bridge) = setup();
        let source = input(&bridge, "x");
        let io = bridge.call(&source, "to_io", &[], None).unwrap();
        assert_eq!(bridge.call(&io, "autoclose?", &[], None).unwrap(), Value::Bool(true));
        bridge.call(&io, "close", &[], None).unwrap();
        assert_eq!(bridge.call(&io, "closed?", &[], None).unwrap(), Value::Bool(true));
        assert_eq!(host.is_closed(foreign_id(&source)), Some(true));

        let err = bridge.call(&io, "read", &[], None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Io);
        bridge.call(&io, "close", &[], None).unwrap();
    }

    #[test]
    fn test_close_without_autoclose() {
        let (host, bridge) = setup();
        let source = input(&bridge, "xy");
        let options = Value::Hash(vec![(Value::str("autoclose"), Value::Bool(false))]);
        let io = bridge.call(&source, "to_io", &[options], None).unwrap();
        bridge.call(&io, "close", &[], None).unwrap();
        assert_eq!(host.is_closed(foreign_id(&source)), Some(false));
        assert_eq!(bridge.call(&source, "read", &[], None).unwrap(), Value::Int(i64::from(b'x')));
    }

    #[test]
    fn test_drop_closes_foreign() {
        let (host, bridge) = setup();
        let source = input(&bridge, "x");
        let io = bridge.call(&source, "to_io", &[], None).unwrap();
        drop(io);
        assert_eq!(host.is_closed(foreign_id(&source)), Some(true));
    }

    #[test]
    fn test_configured_default() {
        let host = Arc::new(MemoryHost::new());
        let mut config = BridgeConfig::default();
        config.stream.autoclose = false;
        let bridge = Bridge::with_config(host.clone(), config).unwrap();
        let source = input(&bridge, "x");
        let io = bridge.call(&source, "to_io", &[], None).unwrap();
        drop(io);
        assert_eq!(host.is_closed(foreign_id(&source)), Some(false));
    }
}
