//! Subcommand implementations.
//!
//! Each command renders its report into a `String` so it can be tested
//! without capturing stdout; `main` prints the result.

pub mod capabilities;
pub mod describe;
pub mod resolve;

use anyhow::Context;
use crossway_core::host::memory::{HostManifest, MemoryHost};
use crossway_core::{Bridge, BridgeConfig, ProxyClass};
use std::path::Path;
use std::sync::Arc;

/// Load `crossway.toml`, or the defaults when no file is given
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(BridgeConfig::default()),
    }
}

/// Build a bridge over the reference host, extended by an optional manifest
pub fn build_bridge(manifest: Option<&Path>, config: BridgeConfig) -> anyhow::Result<Bridge> {
    let host = match manifest {
        Some(path) => {
            let manifest = HostManifest::from_file(path)
                .with_context(|| format!("failed to load host manifest {}", path.display()))?;
            tracing::debug!(
                classes = manifest.classes.len(),
                archives = manifest.archives.len(),
                "loaded host manifest"
            );
            MemoryHost::from_manifest(&manifest)
        }
        None => MemoryHost::new(),
    };
    Bridge::with_config(Arc::new(host), config).context("failed to apply configured classpath")
}

/// Resolve a class by dotted name, failing on packages and missing names
pub(crate) fn class_named(bridge: &Bridge, name: &str) -> anyhow::Result<Arc<ProxyClass>> {
    bridge
        .lookup_class(name)
        .with_context(|| format!("cannot resolve class {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[[class]]
name = "com.example.Widget"

[[archive]]
location = "lib/extra"

[[archive.class]]
name = "org.acme.Tool"
"#;

    #[test]
    fn test_config_classpath_reaches_manifest_archives() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("host.toml");
        let config = dir.path().join("crossway.toml");
        std::fs::write(&manifest, MANIFEST).unwrap();
        std::fs::write(&config, "classpath = [\"lib/extra\"]\n").unwrap();

        let config = load_config(Some(&config)).unwrap();
        let bridge = build_bridge(Some(&manifest), config).unwrap();
        assert_eq!(class_named(&bridge, "org.acme.Tool").unwrap().name(), "org.acme.Tool");
        assert!(class_named(&bridge, "com.example.Widget").is_ok());
    }

    #[test]
    fn test_defaults_without_files() {
        let config = load_config(None).unwrap();
        assert_eq!(config, BridgeConfig::default());
        let bridge = build_bridge(None, config).unwrap();
        assert!(class_named(&bridge, "org.acme.Tool").is_err());
    }

    #[test]
    fn test_missing_manifest_is_reported() {
        let err = build_bridge(Some(Path::new("/nonexistent/host.toml")), BridgeConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/host.toml"));
    }
}
