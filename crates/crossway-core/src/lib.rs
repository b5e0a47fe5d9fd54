//! Crossway object-model bridge
//!
//! This crate lets dynamically-typed guest code address, introspect and
//! use the classes, packages and objects of a statically-typed host runtime:
//! - **Namespace**: dotted and symbolic package/class resolution with a
//!   per-package cache (`namespace` module)
//! - **Proxy**: singleton class handles and object handles (`proxy` module)
//! - **Adapters**: guest protocols (`each`, `[]`, `<=>`, ...) over foreign
//!   collection, map, comparable, throwable and stream interfaces
//!   (`adapter` module)
//! - **Errors**: foreign exceptions and load failures mapped onto guest error
//!   categories (`error` module)
//! - **Host**: the `HostRuntime` trait and an in-memory JDK-like reference
//!   host (`host` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use crossway_core::{Bridge, Value};
//! use crossway_core::host::memory::MemoryHost;
//! use std::sync::Arc;
//!
//! let bridge = Bridge::new(Arc::new(MemoryHost::new()));
//! let tokenizer = bridge.lookup_class("java.util.StringTokenizer")?;
//! let tokens = bridge.new_object(&tokenizer, &[Value::str("a b c")])?;
//! let words = bridge.call(&tokens, "to_a", &[], None)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Guest protocol adapters keyed by foreign capability
pub mod adapter;

/// Bridge facade: resolution, dispatch and interface implementation
pub mod bridge;

/// Bridge configuration (`crossway.toml`)
pub mod config;

/// Guest error taxonomy and foreign exception translation
pub mod error;

/// Host runtime boundary
pub mod host;

/// Guest/host value conversion
pub mod marshal;

/// Package and class name resolution
pub mod namespace;

/// Class and object handles
pub mod proxy;

/// Guest values
pub mod value;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapter::{AdapterRegistry, CallContext, Capability, CapabilitySet, ProtocolAdapter};
pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError};
pub use error::{ErrorCategory, ErrorTranslator, GuestError, GuestResult};
pub use host::{ForeignException, HostRuntime, HostValue};
pub use marshal::MarshalError;
pub use namespace::{ImportScope, NamespacePath, NamespaceResolver, PackageHandle, ResolutionOutcome};
pub use proxy::{ClassTable, ProxyClass, ProxyObject};
pub use value::{Block, Value};
