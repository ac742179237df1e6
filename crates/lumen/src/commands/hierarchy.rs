//! Hierarchy command handlers.

use std::fmt::Write as _;
use std::path::Path;

use lumen_core::normalize::normalize_document;
use lumen_core::{Hierarchy, Session};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

/// Indented tree, one entity per line.
fn tree(h: &Hierarchy) -> String {
    let mut out = String::new();
    if h.zones.is_empty() {
        out.push_str("(empty hierarchy)");
        return out;
    }
    for zone in &h.zones {
        let _ = writeln!(out, "{} (zone {})", zone.zone_name, zone.zone_id);
        for group in &zone.groups {
            let _ = writeln!(out, "  {} (group {})", group.group_name, group.group_id);
            for location in &group.location {
                let _ = writeln!(
                    out,
                    "    {} (location {})",
                    location.location_name, location.location_id
                );
                for device in &location.device {
                    let _ = writeln!(
                        out,
                        "      {} (device {})  {}",
                        device.device_name,
                        device.device_id,
                        device.device_ip.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }
    out.trim_end().to_owned()
}

fn device_paths(h: &Hierarchy) -> String {
    h.devices()
        .map(|(path, _)| path.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn show(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = session.store().snapshot();
    let out = match global.output {
        OutputFormat::Table => tree(&snapshot),
        OutputFormat::Plain => device_paths(&snapshot),
        // Structured formats get the canonical document, unknown fields included.
        _ => output::render_single(
            &global.output,
            &snapshot.encode()?,
            |_| String::new(),
            |_| String::new(),
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Print the canonical form of a hierarchy document read from disk.
pub fn normalize_file(path: &Path, global: &GlobalOpts) -> Result<(), CliError> {
    let raw = util::read_json_file(path)?;
    let normalized = normalize_document(&raw);
    let out = output::render_single(
        &global.output,
        &normalized,
        |doc| serde_json::to_string_pretty(doc).unwrap_or_default(),
        |doc| doc.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
