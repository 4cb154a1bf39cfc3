//! Terminal output helpers and plan rendering.

use colored::Colorize;
use reconcile::{ApplyOutcome, Plan, PlanReport, Registry};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.len()).dimmed());
}

/// Display a plan in a user-friendly format
pub fn display_plan(registry: &Registry, plan: &Plan) {
    if plan.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        display_report(&plan.report);
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    for changes in &plan.changeset.sections {
        let schema = registry.section(&changes.section);
        println!("│ {}", changes.section.bold());

        for op in &changes.creates {
            println!(
                "│   {} {:<30} {}",
                "+".green(),
                op.name,
                "(will create)".dimmed()
            );
        }
        for op in &changes.updates {
            let deltas = op
                .deltas
                .iter()
                .map(|delta| match schema.and_then(|s| s.resource.field(&delta.field)) {
                    Some(field) => format!(
                        "{}: {} → {}",
                        delta.field,
                        field.display(&delta.old),
                        field.display(&delta.new)
                    ),
                    None => delta.field.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            println!("│   {} {:<30} {}", "~".yellow(), op.name, deltas.dimmed());
        }
        for op in &changes.deletes {
            println!(
                "│   {} {:<30} {}",
                "-".red(),
                op.name,
                "(will delete)".dimmed()
            );
        }
        println!("│");
    }

    let creates: usize = plan
        .changeset
        .sections
        .iter()
        .map(|s| s.creates.len())
        .sum();
    let updates: usize = plan
        .changeset
        .sections
        .iter()
        .map(|s| s.updates.len())
        .sum();
    let deletes: usize = plan
        .changeset
        .sections
        .iter()
        .map(|s| s.deletes.len())
        .sum();

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} create, {} update, {} delete)",
        plan.changeset.total_ops().to_string().bold(),
        creates.to_string().green(),
        updates.to_string().yellow(),
        deletes.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");

    display_report(&plan.report);
}

/// Display planning issues (skipped fields and entries)
pub fn display_report(report: &PlanReport) {
    if report.is_clean() {
        return;
    }
    println!();
    warn(&format!(
        "{} unit(s) could not be planned:",
        report.issues.len()
    ));
    for issue in &report.issues {
        let scope = match (&issue.entry, &issue.field) {
            (Some(entry), Some(field)) => format!("{}['{}'].{}", issue.section, entry, field),
            (Some(entry), None) => format!("{}['{}']", issue.section, entry),
            (None, Some(field)) => format!("{}.{}", issue.section, field),
            (None, None) => issue.section.clone(),
        };
        println!("  {} {}: {}", "•".yellow(), scope, issue.message.dimmed());
    }
}

/// Display the result of applying a changeset
pub fn display_outcome(outcome: &ApplyOutcome) {
    println!();
    if outcome.is_success() {
        success(&format!(
            "Applied {} operation(s): {} created, {} updated, {} deleted",
            outcome.total(),
            outcome.created,
            outcome.updated,
            outcome.deleted
        ));
        return;
    }

    error(&format!(
        "{} of {} operation(s) failed",
        outcome.failed,
        outcome.total()
    ));
    for record in outcome.records.iter().filter(|r| !r.is_success()) {
        if let Some(err) = &record.error {
            println!(
                "  {} {} '{}' in {}: {}",
                "✗".red(),
                record.kind.verb(),
                record.name,
                record.section,
                err
            );
        }
    }
    println!();
    info("Re-running apply will retry the failed operations.");
}
