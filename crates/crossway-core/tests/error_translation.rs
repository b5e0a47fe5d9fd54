//! Error translation integration tests
//!
//! Foreign exceptions crossing into the guest keep their identity, land in
//! the right guest category and can be rescued by foreign class.

use crossway_core::host::memory::{Behavior, ClassDef, MemoryHost};
use crossway_core::{
    Bridge, Capability, ErrorCategory, ErrorTranslator, ForeignException, GuestError, Value,
};
use std::sync::Arc;

fn setup() -> (Arc<MemoryHost>, Bridge) {
    let host = Arc::new(MemoryHost::new());
    (host.clone(), Bridge::new(host))
}

fn list(bridge: &Bridge, items: &[i64]) -> Value {
    let items = Value::Array(items.iter().map(|i| Value::Int(*i)).collect());
    bridge.wrap(bridge.unwrap(&items).unwrap()).unwrap()
}

// ============================================================================
// Foreign exceptions
// ============================================================================

#[test]
fn test_foreign_exception_is_wrapped_not_swallowed() {
    let (_, bridge) = setup();
    let list = list(&bridge, &[1, 2]);

    let err = bridge.call(&list, "get", &[Value::Int(10)], None).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Index);
    let exception = err.foreign_exception().expect("foreign exception kept");
    assert_eq!(exception.class_name, "java.lang.IndexOutOfBoundsException");
    assert!(exception.object.is_some());
    assert!(err.to_string().contains("out of bounds"));
}

#[test]
fn test_rescue_by_foreign_class() {
    let (_, bridge) = setup();
    let stream = bridge.lookup_class("java.io.ByteArrayInputStream").unwrap();
    let input = bridge.new_object(&stream, &[Value::str("x")]).unwrap();
    bridge.call(&input, "close", &[], None).unwrap();

    let err = bridge.call(&input, "read", &[], None).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Io);

    let exception = bridge.lookup_class("java.lang.Exception").unwrap();
    let io = bridge.lookup_class("java.io.IOException").unwrap();
    let runtime = bridge.lookup_class("java.lang.RuntimeException").unwrap();
    assert!(bridge.rescues(&err, &io));
    assert!(bridge.rescues(&err, &exception));
    assert!(!bridge.rescues(&err, &runtime));
}

#[test]
fn test_exception_object_answers_throwable_protocol() {
    let (_, bridge) = setup();
    let list = list(&bridge, &[]);
    let err = bridge.call(&list, "get", &[Value::Int(0)], None).unwrap_err();

    let object = err.foreign_exception().and_then(|e| e.object).unwrap();
    let exception = bridge
        .wrap(crossway_core::HostValue::Object(object))
        .unwrap();
    let message = bridge.call(&exception, "message", &[], None).unwrap();
    assert_eq!(message, Value::str("Index 0 out of bounds for length 0"));
    let Value::Array(trace) = bridge.call(&exception, "backtrace", &[], None).unwrap() else {
        panic!("backtrace is not an array");
    };
    assert!(!trace.is_empty());
}

#[test]
fn test_exception_without_object_uses_class_name() {
    let (_, bridge) = setup();
    let err = bridge.translate(ForeignException::with_message(
        "java.lang.IllegalArgumentException",
        "bad",
    ));
    assert_eq!(err.category(), ErrorCategory::Argument);

    let runtime = bridge.lookup_class("java.lang.RuntimeException").unwrap();
    assert!(bridge.rescues(&err, &runtime));
}

#[test]
fn test_custom_translation_rule() {
    let host = Arc::new(MemoryHost::new());
    host.define_class(
        ClassDef::new("com.example.QuotaExceeded")
            .extends("java.lang.RuntimeException")
            .behavior(Behavior::Throwable),
    );
    let mut translator = ErrorTranslator::new();
    translator.add_rule("com.example.QuotaExceeded", ErrorCategory::Argument);
    let bridge = Bridge::new(host).with_translator(translator);

    let err = bridge.translate(ForeignException::with_message("com.example.QuotaExceeded", "over"));
    assert_eq!(err.category(), ErrorCategory::Argument);
    assert_eq!(err.foreign_exception().unwrap().message.as_deref(), Some("over"));

    // unmapped exceptions keep the generic category
    let err = bridge.translate(ForeignException::new("java.lang.IllegalStateException", None));
    assert_eq!(err.category(), ErrorCategory::Foreign);
}

// ============================================================================
// Missing methods
// ============================================================================

#[test]
fn test_protocol_method_without_capability() {
    let (host, bridge) = setup();
    host.define_class(ClassDef::new("com.example.Plain"));
    let plain = bridge.lookup_class("com.example.Plain").unwrap();
    let object = bridge.new_object(&plain, &[]).unwrap();

    match bridge.call(&object, "each", &[], None).unwrap_err() {
        GuestError::Adapter {
            class,
            method,
            capability,
        } => {
            assert_eq!(class, "com.example.Plain");
            assert_eq!(method, "each");
            assert_eq!(capability, Capability::Iterable);
        }
        other => panic!("Expected adapter error, got {:?}", other),
    }
}

#[test]
fn test_undeclared_method_is_no_method() {
    let (host, bridge) = setup();
    host.define_class(ClassDef::new("com.example.Plain"));
    let plain = bridge.lookup_class("com.example.Plain").unwrap();
    let object = bridge.new_object(&plain, &[]).unwrap();

    let err = bridge.call(&object, "frobnicate", &[], None).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NoMethod);
    assert!(!err.is_retryable());
}

#[test]
fn test_guest_values_have_no_foreign_methods() {
    let (_, bridge) = setup();
    let err = bridge.call(&Value::Int(1), "size", &[], None).unwrap_err();
    assert!(matches!(err, GuestError::NoMethod { .. }));
}

// ============================================================================
// Load failures
// ============================================================================

#[test]
fn test_load_failure_carries_cause() {
    let (host, bridge) = setup();
    host.define_class(ClassDef::new("com.example.Broken").failing_init("no config"));

    let err = bridge.lookup("com.example.Broken").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Load);
    assert!(err.is_retryable());
    let cause = err.foreign_exception().unwrap();
    assert_eq!(cause.class_name, "java.lang.ExceptionInInitializerError");
    assert!(err.to_string().contains("com.example.Broken"));
}
