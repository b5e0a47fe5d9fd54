//! Integration tests for the `crossway` binary.
//!
//! Runs the built executable against manifests and configs written to a
//! temporary directory.

use std::path::Path;
use std::process::{Command, Output};

const MANIFEST: &str = r#"
[[class]]
name = "com.example.Circle"
modifiers = ["public", "final"]
interfaces = ["java.lang.Comparable"]

[[class.methods]]
name = "radius"
returns = "int"
value = 1

[[class]]
name = "com.example.Broken"
init_error = "no config"

[[archive]]
location = "lib/extra"

[[archive.class]]
name = "org.acme.Tool"
"#;

fn crossway(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_crossway"))
        .current_dir(dir)
        .env_remove("CROSSWAY_LOG")
        .args(args)
        .output()
        .expect("failed to run crossway")
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("host.toml"), MANIFEST).unwrap();
    std::fs::write(dir.path().join("crossway.toml"), "classpath = [\"lib/extra\"]\n").unwrap();
    dir
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// resolve
// ============================================================================

#[test]
fn test_resolve_builtin_names() {
    let dir = tempfile::tempdir().unwrap();
    let output = crossway(dir.path(), &["resolve", "java.util.zip", "Java::JavaUtil::StringTokenizer"]);

    assert!(output.status.success(), "{:?}", output);
    let text = stdout(&output);
    assert!(text.contains("package Java::JavaUtilZip"));
    assert!(text.contains("class   java.util.StringTokenizer"));
}

#[test]
fn test_resolve_with_manifest_and_config() {
    let dir = workspace();
    let output = crossway(
        dir.path(),
        &["-m", "host.toml", "-c", "crossway.toml", "resolve", "org.acme.Tool", "com.example.Circle"],
    );

    assert!(output.status.success(), "{:?}", output);
    let text = stdout(&output);
    assert!(text.contains("Java::OrgAcme::Tool"));
    assert!(text.contains("Java::ComExample::Circle"));
}

#[test]
fn test_resolve_failure_exits_nonzero() {
    let dir = workspace();
    let output = crossway(dir.path(), &["-m", "host.toml", "resolve", "com.example.Broken"]);

    assert!(!output.status.success());
    assert!(stdout(&output).contains("load error"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("did not resolve"));
}

// ============================================================================
// describe / capabilities
// ============================================================================

#[test]
fn test_describe_manifest_class() {
    let dir = workspace();
    let output = crossway(dir.path(), &["describe", "com.example.Circle", "--manifest", "host.toml"]);

    assert!(output.status.success(), "{:?}", output);
    let text = stdout(&output);
    assert!(text.contains("modifiers:    public final"));
    assert!(text.contains("int radius()"));
}

#[test]
fn test_capabilities_of_builtin_map() {
    let dir = tempfile::tempdir().unwrap();
    let output = crossway(dir.path(), &["capabilities", "java.util.LinkedHashMap"]);

    assert!(output.status.success(), "{:?}", output);
    let text = stdout(&output);
    assert!(text.contains("  Map: "));
    assert!(text.contains("each_pair"));
}

#[test]
fn test_bad_log_level_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = crossway(dir.path(), &["--log-level", "loud", "resolve", "java"]);
    assert!(!output.status.success());
}
