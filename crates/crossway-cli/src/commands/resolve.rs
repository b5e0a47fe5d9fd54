//! `crossway resolve`: Resolve dotted or guest-path names.

use crossway_core::{Bridge, GuestError, ResolutionOutcome, Value};
use std::fmt::Write;

/// Outcome report for a batch of names
#[derive(Debug, Default)]
pub struct Report {
    pub text: String,
    pub failures: usize,
}

pub fn execute(bridge: &Bridge, names: &[String]) -> anyhow::Result<()> {
    let report = render(bridge, names);
    print!("{}", report.text);
    if report.failures > 0 {
        anyhow::bail!("{} of {} names did not resolve", report.failures, names.len());
    }
    Ok(())
}

/// Resolve every name, one line each
///
/// Dotted names (`java.util.zip`) go through the resolver; guest paths
/// (`Java::JavaUtil::StringTokenizer`) walk constants from the root.
pub fn render(bridge: &Bridge, names: &[String]) -> Report {
    let mut report = Report::default();
    for name in names {
        let line = if name.contains("::") {
            guest_path(bridge, name)
        } else {
            dotted(bridge, name)
        };
        match line {
            Ok(line) => {
                let _ = writeln!(report.text, "{:<40} {}", name, line);
            }
            Err(line) => {
                report.failures += 1;
                let _ = writeln!(report.text, "{:<40} {}", name, line);
            }
        }
    }
    report
}

fn dotted(bridge: &Bridge, name: &str) -> Result<String, String> {
    let outcome = bridge.resolve(name).map_err(|e| format!("error: {}", e))?;
    match outcome {
        ResolutionOutcome::Package(package) => Ok(format!("package {}", package.guest_name())),
        ResolutionOutcome::Class(class) => Ok(format!("class   {}", class.guest_name())),
        ResolutionOutcome::NotFound => Err("not found".to_string()),
        ResolutionOutcome::LoadError(failure) => Err(format!("load error: {}", failure.exception)),
    }
}

fn guest_path(bridge: &Bridge, name: &str) -> Result<String, String> {
    let root = bridge.config().root_module.as_str();
    let path = name
        .strip_prefix(root)
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(name);
    match bridge.const_get(&bridge.root(), path, true) {
        Ok(Value::Package(package)) => Ok(format!("package {}", package.path())),
        Ok(Value::Class(class)) => Ok(format!("class   {}", class.name())),
        Ok(other) => Ok(other.to_string()),
        Err(GuestError::NotFound { .. }) => Err("not found".to_string()),
        Err(err) => Err(format!("error: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossway_core::host::memory::{ClassDef, MemoryHost};
    use std::sync::Arc;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dotted_names() {
        let bridge = Bridge::new(Arc::new(MemoryHost::new()));
        let report = render(&bridge, &names(&["java.util.zip", "java.util.StringTokenizer"]));

        assert_eq!(report.failures, 0);
        assert!(report.text.contains("package Java::JavaUtilZip"));
        assert!(report.text.contains("class   Java::JavaUtil::StringTokenizer"));
    }

    #[test]
    fn test_guest_paths() {
        let bridge = Bridge::new(Arc::new(MemoryHost::new()));
        let report = render(&bridge, &names(&["Java::JavaUtil::StringTokenizer", "JavaUtilZip::Nope"]));

        assert_eq!(report.failures, 1);
        assert!(report.text.contains("class   java.util.StringTokenizer"));
        assert!(report.text.contains("not found"));
    }

    #[test]
    fn test_failures_are_counted() {
        let host = Arc::new(MemoryHost::new());
        host.define_class(ClassDef::new("com.example.Broken").failing_init("boom"));
        let bridge = Bridge::new(host);

        let report = render(&bridge, &names(&["com.example.Broken", "java.util.Missing"]));
        assert_eq!(report.failures, 2);
        assert!(report.text.contains("load error: java.lang.ExceptionInInitializerError: boom"));
        assert!(execute(&bridge, &names(&["java.util.Missing"])).is_err());
    }
}
