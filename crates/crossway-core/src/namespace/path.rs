//! Namespace paths and guest naming
//!
//! A [`NamespacePath`] is the dotted form of a foreign package (`java.util`).
//! Guests spell the same path symbolically as a CamelCase constant under the
//! root module (`Java::JavaUtil`); [`decode_camel`] and [`encode_camel`]
//! convert between the two.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a dotted path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// An empty segment (`java..util`, leading or trailing dot)
    #[error("Empty segment in namespace path '{0}'")]
    EmptySegment(String),

    /// A segment that is not an identifier
    #[error("Invalid identifier '{segment}' in namespace path '{path}'")]
    InvalidSegment {
        /// Offending segment
        segment: String,
        /// Whole path
        path: String,
    },
}

/// Ordered identifier segments; the empty path is the root namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NamespacePath {
    segments: Vec<String>,
}

impl NamespacePath {
    /// The root namespace
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path; the empty string is the root
    ///
    /// # Arguments
    /// * `dotted` - Path such as `java.util.zip`
    ///
    /// # Returns
    /// * `Ok(NamespacePath)` - The parsed path
    /// * `Err(PathError)` - Empty or non-identifier segment
    pub fn parse(dotted: &str) -> Result<Self, PathError> {
        if dotted.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in dotted.split('.') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(dotted.to_string()));
            }
            if !is_identifier(segment) {
                return Err(PathError::InvalidSegment {
                    segment: segment.to_string(),
                    path: dotted.to_string(),
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Build a path from segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Check if this is the root namespace
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if there are no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Enclosing path, `None` for the root
    pub fn parent(&self) -> Option<NamespacePath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Path extended by one segment
    pub fn child(&self, segment: &str) -> NamespacePath {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// Dotted form
    pub fn to_dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Fully-qualified dotted name of `segment` inside this path
    pub fn qualify(&self, segment: &str) -> String {
        if self.is_root() {
            segment.to_string()
        } else {
            format!("{}.{}", self.to_dotted(), segment)
        }
    }

    /// Guest constant name, e.g. `Java::JavaUtilZip`
    pub fn guest_name(&self, root_module: &str) -> String {
        if self.is_root() {
            root_module.to_string()
        } else {
            format!("{}::{}", root_module, encode_camel(self))
        }
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dotted())
    }
}

impl FromStr for NamespacePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check for a host identifier (`$` allowed for nested classes)
pub fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// A segment that may name an implicit package
///
/// Host packages are conventionally lowercase, so a lowercase or
/// underscore-initial segment with no class behind it is a package.
pub fn is_package_like(segment: &str) -> bool {
    segment
        .chars()
        .next()
        .is_some_and(|c| c.is_lowercase() || c == '_')
}

/// A segment spelled as a guest constant
pub fn is_constant_like(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase)
}

/// Decode a CamelCase constant into a package path
///
/// Each uppercase letter starts a new lowercase segment:
/// `JavaUtilZip` is `java.util.zip`, `ComBlahV8Something` is
/// `com.blah.v8.something`, `X_Y_` is `x_.y_`.
pub fn decode_camel(constant: &str) -> NamespacePath {
    let mut segments: Vec<String> = Vec::new();
    for c in constant.chars() {
        if c.is_uppercase() || segments.is_empty() {
            segments.push(String::new());
        }
        if let Some(current) = segments.last_mut() {
            current.extend(c.to_lowercase());
        }
    }
    NamespacePath { segments }
}

/// Encode a package path as a CamelCase constant
pub fn encode_camel(path: &NamespacePath) -> String {
    path.segments()
        .iter()
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Guest name of a foreign class, e.g. `Java::JavaUtil::StringTokenizer`
///
/// Nested classes (`Map$Entry`) become nested constants
/// (`Java::JavaUtil::Map::Entry`); default-package classes sit directly under
/// the root module.
pub fn guest_class_name(root_module: &str, class_name: &str) -> String {
    let (package, simple) = match class_name.rfind('.') {
        Some(dot) => (&class_name[..dot], &class_name[dot + 1..]),
        None => ("", class_name),
    };
    let simple = simple.replace('$', "::");
    let package = NamespacePath::from_segments(package.split('.').filter(|s| !s.is_empty()));
    if package.is_root() {
        format!("{}::{}", root_module, simple)
    } else {
        format!("{}::{}::{}", root_module, encode_camel(&package), simple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let path = NamespacePath::parse("java.util.zip").unwrap();
        assert_eq!(path.segments(), &["java", "util", "zip"]);
        assert_eq!(path.to_string(), "java.util.zip");
        assert_eq!(path.parent().unwrap().to_dotted(), "java.util");
        assert!(NamespacePath::parse("").unwrap().is_root());
    }

    #[test]
    fn test_parse_rejects_bad_segments() {
        assert!(matches!(
            NamespacePath::parse("java..util"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            NamespacePath::parse("java.1util"),
            Err(PathError::InvalidSegment { .. })
        ));
    }

    #[test]
    fn test_decode_camel() {
        assert_eq!(decode_camel("JavaUtilZip").to_dotted(), "java.util.zip");
        assert_eq!(decode_camel("ComBlahV8Something").to_dotted(), "com.blah.v8.something");
        assert_eq!(decode_camel("X_Y_").to_dotted(), "x_.y_");
        assert_eq!(decode_camel("JavaLang").to_dotted(), "java.lang");
    }

    #[test]
    fn test_encode_camel() {
        let path = NamespacePath::parse("java.util.zip").unwrap();
        assert_eq!(encode_camel(&path), "JavaUtilZip");
        assert_eq!(path.guest_name("Java"), "Java::JavaUtilZip");
        assert_eq!(NamespacePath::root().guest_name("Java"), "Java");
    }

    #[test]
    fn test_guest_class_name() {
        assert_eq!(
            guest_class_name("Java", "java.util.StringTokenizer"),
            "Java::JavaUtil::StringTokenizer"
        );
        assert_eq!(guest_class_name("Java", "java.util.Map$Entry"), "Java::JavaUtil::Map::Entry");
        assert_eq!(guest_class_name("Java", "DefaultPackageClass"), "Java::DefaultPackageClass");
    }

    #[test]
    fn test_segment_kinds() {
        assert!(is_package_like("util"));
        assert!(is_package_like("_internal"));
        assert!(!is_package_like("StringTokenizer"));
        assert!(is_constant_like("StringTokenizer"));
        assert!(is_identifier("Map$Entry"));
        assert!(!is_identifier("a-b"));
    }
}
