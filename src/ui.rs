use colored::{ColoredString, Colorize};
use reconcile::{DiffSummary, ExecuteSummary, ExecutionPlan, PlannedAction, PlannedChange};
use validation::{Diagnostic, Diagnostics};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Plans
// ============================================================================

fn action_symbol(action: PlannedAction) -> ColoredString {
    let symbol = action.symbol();
    match action {
        PlannedAction::Create => symbol.green(),
        PlannedAction::Update => symbol.yellow(),
        PlannedAction::Replace => symbol.magenta(),
        PlannedAction::Delete => symbol.red(),
        PlannedAction::NoOp => symbol.dimmed(),
    }
}

/// Lines describing one planned change: the instance, then changed attributes
pub fn change_lines(change: &PlannedChange) -> Vec<String> {
    let mut lines = vec![format!(
        "  {:>3} {}",
        action_symbol(change.action),
        change.address.to_string().bold()
    )];
    if matches!(change.action, PlannedAction::Update | PlannedAction::Replace) {
        lines.extend(change.changes.iter().map(|c| format!("        {}", c.render())));
    }
    lines
}

pub fn summary_line(summary: &DiffSummary) -> String {
    format!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
        summary.additions, summary.modifications, summary.replacements, summary.removals
    )
}

/// Print every pending change of a plan and its totals
pub fn print_plan(plan: &ExecutionPlan) {
    let summary = plan.summary();
    if !summary.has_changes() {
        println!();
        println!("  {} No changes. Remote objects match the configuration.", "✓".green());
        return;
    }

    println!();
    for change in plan.pending() {
        for line in change_lines(change) {
            println!("{line}");
        }
    }
    println!();
    println!("{}", summary_line(&summary).bold());
}

// ============================================================================
// Diagnostics
// ============================================================================

pub fn diagnostic_line(diag: &Diagnostic) -> String {
    let (symbol, label) = if diag.is_error() {
        ("✗".red(), "Error".red().bold())
    } else {
        ("⚠".yellow(), "Warning".yellow().bold())
    };
    let at = diag
        .attribute
        .as_deref()
        .map(|a| format!(" ({a})"))
        .unwrap_or_default();
    format!("  {symbol} {label}: {}{}\n      {}", diag.summary, at.dimmed(), diag.detail)
}

/// Print diagnostics for one instance
pub fn print_diagnostics(address: &str, diags: &Diagnostics) {
    println!("{}", address.bold());
    for diag in diags.iter() {
        println!("{}", diagnostic_line(diag));
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Print final execution summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    let counts = [
        (summary.created, "created"),
        (summary.modified, "modified"),
        (summary.replaced, "replaced"),
        (summary.removed, "removed"),
        (summary.skipped, "skipped"),
    ];
    for (n, what) in counts {
        if n > 0 {
            println!("    • {n} resources {what}");
        }
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Registry;
    use reconcile::{Address, AttributeStore, Instance};

    fn instance(registry: &Registry, name: &str, id: Option<&str>) -> Instance {
        let mut attributes = AttributeStore::new();
        attributes.set("name", name.into());
        if let Some(id) = id {
            attributes.set_id(id);
        }
        Instance {
            address: Address::new("segment_group", "web"),
            resource: registry.get("segment_group").unwrap(),
            attributes,
        }
    }

    #[test]
    fn test_update_lists_changed_attributes() {
        let registry = Registry::new();
        let mut prior = instance(&registry, "old", Some("1"));
        prior.resource.schema().apply_defaults(&mut prior.attributes);
        let plan = ExecutionPlan::build(vec![instance(&registry, "new", None)], vec![prior]);

        let lines = change_lines(&plan.changes[0]);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("segment_group.web"));
        assert!(lines[1].contains(r#"name: "old" -> "new""#));
    }

    #[test]
    fn test_summary_line() {
        let summary = DiffSummary {
            additions: 2,
            modifications: 1,
            replacements: 0,
            removals: 3,
            unchanged: 4,
        };
        assert_eq!(
            summary_line(&summary),
            "Plan: 2 to add, 1 to change, 0 to replace, 3 to destroy."
        );
    }

    #[test]
    fn test_diagnostic_line_names_attribute() {
        let diag = Diagnostic::error("invalid CIDR", "\"10.0.0.0\" is missing a /prefix").at("source_cidrs[0]");
        let line = diagnostic_line(&diag);
        assert!(line.contains("invalid CIDR"));
        assert!(line.contains("source_cidrs[0]"));
        assert!(line.contains("is missing a /prefix"));
    }
}
