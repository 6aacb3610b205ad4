//! Read-only commands describing the managed resource types

use anyhow::Result;
use colored::Colorize;
use reconcile::{Field, Mapping, OneOf, ResourceSchema};

use crate::Context;
use crate::resource::Registry;
use crate::ui;

/// List registered resource types
pub fn resources(ctx: &Context) -> Result<()> {
    let registry = Registry::new();
    ui::header("Resource Types");
    for resource in registry.iter() {
        println!("  {:<22} {}", resource.type_name().bold(), resource.description());
        if ctx.verbose > 0 {
            ui::dim(&format!("{:<22} {}", "", resource.api_path()));
        }
    }
    Ok(())
}

/// Print the fields of one resource type
pub fn schema(ctx: &Context, type_name: &str) -> Result<()> {
    let registry = Registry::new();
    let resource = registry.require(type_name)?;

    ui::header(resource.type_name());
    if !resource.description().is_empty() {
        ui::dim(resource.description());
    }
    ui::kv("API path", resource.api_path());

    ui::section("Fields");
    for line in field_lines(resource.schema(), 1, ctx.verbose > 0) {
        println!("{line}");
    }

    if let Some(group) = resource.one_of() {
        ui::section("Variants");
        for line in one_of_lines(group) {
            println!("{line}");
        }
    }
    Ok(())
}

/// One line per field, nested blocks indented below their parent
fn field_lines(schema: &ResourceSchema, depth: usize, remote_keys: bool) -> Vec<String> {
    let indent = "  ".repeat(depth);
    let mut lines = Vec::new();
    for field in schema.fields() {
        let mut line = format!(
            "{indent}{:<24} {:<12} {}",
            field.name,
            field.ty.describe(),
            field.presence.label()
        );
        let flags = flags(field);
        if !flags.is_empty() {
            line.push_str(&format!("  [{}]", flags.join(", ")));
        }
        if remote_keys && field.is_generic() {
            line.push_str(&format!("  <- {}", field.remote_key()));
        }
        if !field.description.is_empty() {
            line.push_str(&format!("  {}", field.description.dimmed()));
        }
        lines.push(line);

        if let Some(nested) = field.nested() {
            lines.extend(field_lines(nested, depth + 1, remote_keys));
        }
    }
    lines
}

fn flags(field: &Field) -> Vec<String> {
    let mut flags = Vec::new();
    if let Some(default) = &field.default {
        flags.push(format!("default {}", default.render()));
    }
    if field.force_new {
        flags.push("forces replacement".to_string());
    }
    if field.sensitive {
        flags.push("sensitive".to_string());
    }
    match (field.min_items, field.max_items) {
        (Some(min), Some(max)) => flags.push(format!("{min}..{max} items")),
        (None, Some(max)) => flags.push(format!("at most {max}")),
        (Some(min), None) => flags.push(format!("at least {min}")),
        (None, None) => {}
    }
    if !field.conflicts_with.is_empty() {
        flags.push(format!("conflicts with {}", field.conflicts_with.join(", ")));
    }
    if field.mapping == Mapping::Custom {
        flags.push("custom mapping".to_string());
    }
    flags
}

fn one_of_lines(group: &OneOf) -> Vec<String> {
    let mut lines = vec![format!(
        "  discriminant {}{}",
        group.discriminant.bold(),
        if group.immutable { " (fixed at creation; switching replaces)" } else { "" }
    )];
    lines.extend(
        group
            .branches()
            .iter()
            .map(|b| format!("    {:<10} -> {} ({})", b.tag, b.field, b.remote_key)),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lines_cover_nested_blocks() {
        let registry = Registry::new();
        let rule = registry.get("access_rule").unwrap();
        let lines = field_lines(rule.schema(), 1, false);

        let operands = lines.iter().find(|l| l.contains("operands")).unwrap();
        assert!(operands.starts_with("    "));
        assert!(operands.contains("1..100 items"));

        let sources = lines.iter().find(|l| l.trim_start().starts_with("source_ids")).unwrap();
        assert!(sources.contains("conflicts with apply_to_everyone"));
    }

    #[test]
    fn test_remote_keys_in_verbose_mode() {
        let registry = Registry::new();
        let group = registry.get("segment_group").unwrap();
        let lines = field_lines(group.schema(), 1, true);
        let apps = lines.iter().find(|l| l.contains("application_ids")).unwrap();
        assert!(apps.contains("<- appIds"));
        let keep_alive = lines.iter().find(|l| l.contains("tcp_keep_alive")).unwrap();
        assert!(keep_alive.contains("custom mapping"));
        assert!(!keep_alive.contains("<-"));
    }

    #[test]
    fn test_one_of_lines() {
        let registry = Registry::new();
        let profile = registry.get("auth_profile").unwrap();
        let lines = one_of_lines(profile.one_of().unwrap());
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("switching replaces"));
        assert!(lines[1].contains("SAML"));
        assert!(lines[2].contains("oidcConfig"));
    }
}
