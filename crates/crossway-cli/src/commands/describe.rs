//! `crossway describe`: Show a class the way the guest sees it.

use super::class_named;
use crossway_core::host::MethodInfo;
use crossway_core::Bridge;
use std::fmt::Write;

pub fn execute(bridge: &Bridge, name: &str) -> anyhow::Result<()> {
    print!("{}", render(bridge, name)?);
    Ok(())
}

pub fn render(bridge: &Bridge, name: &str) -> anyhow::Result<String> {
    let class = class_named(bridge, name)?;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", class.name(), class.guest_name());
    let modifiers = class.modifiers().to_string();
    if !modifiers.is_empty() {
        let _ = writeln!(out, "  modifiers:    {}", modifiers);
    }
    if let Some(superclass) = class.superclass() {
        let _ = writeln!(out, "  superclass:   {}", superclass.name());
    }
    if !class.interfaces().is_empty() {
        let names: Vec<_> = class.interfaces().iter().map(|i| i.name()).collect();
        let _ = writeln!(out, "  interfaces:   {}", names.join(", "));
    }
    if class.has_annotations() {
        let _ = writeln!(out, "  annotations:  {}", class.annotations().join(", "));
    }
    let _ = writeln!(out, "  capabilities: {}", class.capabilities());

    section(&mut out, class.name(), "class methods", &class.java_class_methods());
    section(&mut out, class.name(), "instance methods", &class.java_instance_methods());

    let guest = class.guest_method_names();
    if !guest.is_empty() {
        let _ = writeln!(out, "  guest methods:");
        for method in guest {
            let _ = writeln!(out, "    {}", method);
        }
    }
    Ok(out)
}

fn section(out: &mut String, owner: &str, title: &str, methods: &[MethodInfo]) {
    if methods.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {}:", title);
    for method in methods {
        let _ = write!(
            out,
            "    {} {}({})",
            method.return_type.as_deref().unwrap_or("void"),
            method.name,
            method.parameter_types.join(", "),
        );
        if method.declaring_class != owner {
            let _ = write!(out, " from {}", method.declaring_class);
        }
        out.push('\n');
    }
}
