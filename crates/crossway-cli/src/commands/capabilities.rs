//! `crossway capabilities`: List the guest protocols a class gains.

use super::class_named;
use crossway_core::Bridge;
use std::fmt::Write;

pub fn execute(bridge: &Bridge, name: &str) -> anyhow::Result<()> {
    print!("{}", render(bridge, name)?);
    Ok(())
}

/// One block per capability, in dispatch precedence order
pub fn render(bridge: &Bridge, name: &str) -> anyhow::Result<String> {
    let class = class_named(bridge, name)?;
    let capabilities = class.capabilities();
    let mut out = String::new();

    if capabilities.is_empty() {
        let _ = writeln!(out, "{}: no guest protocols", class.name());
        return Ok(out);
    }
    let _ = writeln!(out, "{}: {}", class.name(), capabilities);
    for capability in capabilities.iter() {
        match bridge.adapters().get(capability) {
            Some(adapter) => {
                let _ = writeln!(out, "  {}: {}", capability, adapter.methods().join(" "));
            }
            None => {
                let _ = writeln!(out, "  {}: (no adapter registered)", capability);
            }
        }
    }
    Ok(out)
}
