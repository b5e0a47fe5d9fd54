//! Host manifest parsing
//!
//! A host manifest describes the classes an in-memory host exposes, in TOML:
//!
//! ```toml
//! [properties]
//! "java.vendor" = "crossway"
//!
//! [[class]]
//! name = "com.example.Widget"
//! interfaces = ["java.lang.Comparable"]
//!
//! [[archive]]
//! location = "target/test-classes"
//!
//! [[archive.class]]
//! name = "DefaultPackageClass"
//! ```
//!
//! Top-level classes are on the classpath immediately; archive classes become
//! loadable once their location is appended to the classpath.

use super::classes::ClassDef;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during manifest parsing
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("Failed to read host manifest: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse host manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid host manifest: {0}")]
    ValidationError(String),
}

/// Classes bundled under one classpath location
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ArchiveDef {
    /// Directory or archive path
    pub location: PathBuf,
    /// Classes the location provides
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassDef>,
}

/// Host manifest
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HostManifest {
    /// System properties
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Classes on the classpath from the start
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassDef>,
    /// Classes behind classpath locations
    #[serde(default, rename = "archive")]
    pub archives: Vec<ArchiveDef>,
}

impl HostManifest {
    /// Parse a manifest from TOML text
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: HostManifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest from a file
    ///
    /// Relative archive locations are resolved against the file's directory,
    /// the same way configuration classpath entries are.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        let mut manifest = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            for archive in &mut manifest.archives {
                if archive.location.is_relative() {
                    archive.location = base.join(&archive.location);
                }
            }
        }
        Ok(manifest)
    }

    /// Validate class names
    pub fn validate(&self) -> Result<(), ManifestError> {
        let all = self
            .classes
            .iter()
            .chain(self.archives.iter().flat_map(|a| a.classes.iter()));
        for class in all {
            if class.name.is_empty()
                || class.name.starts_with('.')
                || class.name.ends_with('.')
                || class.name.contains("..")
            {
                return Err(ManifestError::ValidationError(format!(
                    "malformed class name '{}'",
                    class.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::classes::{Behavior, Literal};

    #[test]
    fn test_parse_manifest() {
        let manifest = HostManifest::from_str(
            r#"
            [properties]
            "user.name" = "duke"

            [[class]]
            name = "com.example.Widget"
            modifiers = ["public", "final"]
            interfaces = ["java.lang.Comparable"]
            behavior = "boxed"

            [[class.methods]]
            name = "label"
            returns = "java.lang.String"
            value = "widget"

            [[archive]]
            location = "target/test-classes"

            [[archive.class]]
            name = "BadStaticInit"
            init_error = "boom"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.properties["user.name"], "duke");
        assert_eq!(manifest.classes.len(), 1);
        let widget = &manifest.classes[0];
        assert_eq!(widget.behavior, Behavior::Boxed);
        assert_eq!(widget.methods[0].value, Some(Literal::Str("widget".into())));
        assert_eq!(widget.methods[0].modifiers, vec!["public".to_string()]);

        assert_eq!(manifest.archives.len(), 1);
        assert_eq!(manifest.archives[0].classes[0].init_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_rejects_malformed_names() {
        let result = HostManifest::from_str(
            r#"
            [[class]]
            name = "com..Widget"
            "#,
        );
        assert!(matches!(result, Err(ManifestError::ValidationError(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = HostManifest::from_str("[[class]]\nname = 3");
        assert!(matches!(result, Err(ManifestError::ParseError(_))));
    }

    #[test]
    fn test_archive_locations_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.toml");
        std::fs::write(
            &path,
            "[[archive]]\nlocation = \"lib/extra\"\n\n[[archive.class]]\nname = \"org.acme.Tool\"\n",
        )
        .unwrap();

        let manifest = HostManifest::from_file(&path).unwrap();
        assert_eq!(manifest.archives[0].location, dir.path().join("lib/extra"));
        assert_eq!(manifest.archives[0].classes[0].name, "org.acme.Tool");
    }
}
