//! Output formatting for CLI commands.
//!
//! This module renders plans, drift reports and state summaries either as
//! human-readable text or as JSON for scripting. Sensitive attribute values
//! are masked in both forms.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::planner::{Change, ChangeType, Diagnostic};
use crate::provider::ProviderRegistry;
use crate::reconciler::{DriftReport, PlanReport};
use crate::resource::ResourceIdentity;
use crate::state::StateSnapshot;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Kind row for table display.
#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Immutable")]
    immutable: String,
    #[tabled(rename = "Sensitive")]
    sensitive: String,
    #[tabled(rename = "Tags")]
    taggable: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a plan report for display.
    #[must_use]
    pub fn format_plan(&self, report: &PlanReport, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => to_json(&PlanJson::from(report)),
            OutputFormat::Text => Self::format_plan_text(report, detailed),
        }
    }

    fn format_plan_text(report: &PlanReport, detailed: bool) -> String {
        let change_set = &report.change_set;
        let mut output = String::new();

        if change_set.is_empty() {
            let _ = writeln!(
                output,
                "{} No changes. {}/{} matches its declaration.",
                "✓".green(),
                change_set.stack(),
                change_set.environment()
            );
        } else {
            let _ = writeln!(
                output,
                "\nChange set for {}/{}",
                change_set.stack(),
                change_set.environment()
            );
            let _ = writeln!(output, "   Desired hash: {}", short(change_set.desired_hash()));
            let _ = writeln!(output, "   Fingerprint:  {}\n", short(&change_set.fingerprint()));

            let rows: Vec<ChangeRow> = change_set
                .changes()
                .iter()
                .enumerate()
                .map(|(i, c)| ChangeRow {
                    index: i + 1,
                    action: Self::format_change_type(c.change_type),
                    resource: c.identity.to_string(),
                    id: truncate(&c.resource_id, 16),
                    reason: truncate(&c.reason, 48),
                })
                .collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');

            if detailed {
                for change in change_set.by_display_precedence() {
                    Self::write_attribute_changes(&mut output, change);
                }
            }

            let summary = change_set.summary();
            let _ = writeln!(
                output,
                "\nPlan: {} to create, {} to update, {} to replace, {} to delete, {} unchanged",
                summary.create.to_string().green(),
                summary.update.to_string().yellow(),
                summary.recreate.to_string().magenta(),
                summary.delete.to_string().red(),
                summary.no_change
            );
        }

        if !report.errors.is_empty() {
            let _ = writeln!(
                output,
                "\n{} {} resource(s) could not be planned:",
                "✗".red(),
                report.errors.len()
            );
            for error in &report.errors {
                let _ = writeln!(output, "   - {error}");
            }
        }

        if !report.violations.is_empty() {
            let _ = writeln!(output, "\n{} Guardrail violations:", "⚠".yellow());
            for violation in &report.violations {
                let _ = writeln!(output, "   - {violation}");
            }
        }

        output
    }

    fn write_attribute_changes(output: &mut String, change: &Change) {
        if change.attribute_changes.is_empty() {
            return;
        }
        let _ = writeln!(
            output,
            "\n{} {}",
            Self::format_change_type(change.change_type),
            change.identity.to_string().bold()
        );
        for attribute in &change.attribute_changes {
            let line = format!("     {attribute}");
            if attribute.force_recreate {
                let _ = writeln!(output, "{}", line.red());
            } else {
                let _ = writeln!(output, "{line}");
            }
        }
    }

    /// Formats a drift report.
    #[must_use]
    pub fn format_drift(&self, report: &DriftReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => {
                let mut output = if report.has_drift() {
                    let mut output = format!("{} Drift detected:\n\n", "⚠".yellow());
                    for change in &report.drifted {
                        let _ = writeln!(
                            output,
                            "   {} {}",
                            Self::format_change_type(change.change_type),
                            change.identity
                        );
                        for attribute in &change.attribute_changes {
                            let _ = writeln!(output, "       {attribute}");
                        }
                    }
                    let _ = writeln!(
                        output,
                        "\n{}/{} deployed resource(s) have drifted.",
                        report.drifted.len(),
                        report.checked
                    );
                    output
                } else {
                    format!(
                        "{} No drift detected across {} deployed resource(s).\n",
                        "✓".green(),
                        report.checked
                    )
                };

                for error in &report.errors {
                    let _ = writeln!(output, "{} {error}", "✗".red());
                }
                output
            }
        }
    }

    /// Formats validation findings.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "valid": result.is_valid(),
                "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid.\n", "✓".green())
                } else {
                    let mut output = format!(
                        "{} Configuration has {} error(s):\n",
                        "✗".red(),
                        result.error_count()
                    );
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                    output
                };

                if result.warning_count() > 0 {
                    let _ = writeln!(output, "\n{} Warnings:", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats creation and deletion orders.
    #[must_use]
    pub fn format_graph(
        &self,
        creation: &[ResourceIdentity],
        deletion: &[ResourceIdentity],
        diagnostics: &[Diagnostic],
    ) -> String {
        let names = |ids: &[ResourceIdentity]| ids.iter().map(ToString::to_string).collect::<Vec<_>>();
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "creation_order": names(creation),
                "deletion_order": names(deletion),
                "warnings": diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })),
            OutputFormat::Text => {
                let mut output = String::from("\nCreation order:\n");
                for (i, identity) in creation.iter().enumerate() {
                    let _ = writeln!(output, "   {:>3}. {identity}", i + 1);
                }
                output.push_str("\nDeletion order:\n");
                for (i, identity) in deletion.iter().enumerate() {
                    let _ = writeln!(output, "   {:>3}. {identity}", i + 1);
                }
                for diagnostic in diagnostics {
                    let _ = writeln!(output, "{} {diagnostic}", "⚠".yellow());
                }
                output
            }
        }
    }

    /// Formats the registered kinds.
    #[must_use]
    pub fn format_kinds(&self, registry: &ProviderRegistry) -> String {
        match self.format {
            OutputFormat::Json => {
                let kinds: Vec<_> = registry
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "kind": c.kind(),
                            "label": c.label(),
                            "immutable": c.recreate_policy().immutable_paths().iter().collect::<Vec<_>>(),
                            "sensitive": c.sensitive_paths().iter().collect::<Vec<_>>(),
                            "taggable": c.taggable(),
                        })
                    })
                    .collect();
                to_json(&kinds)
            }
            OutputFormat::Text => {
                let rows: Vec<KindRow> = registry
                    .iter()
                    .map(|c| KindRow {
                        kind: c.kind().to_string(),
                        label: c.label().to_string(),
                        immutable: c.recreate_policy().immutable_paths().iter().collect::<Vec<_>>().join(", "),
                        sensitive: c.sensitive_paths().iter().collect::<Vec<_>>().join(", "),
                        taggable: if c.taggable() { "yes" } else { "no" }.to_string(),
                    })
                    .collect();
                format!("{}\n", Table::new(rows))
            }
        }
    }

    /// Formats a recorded snapshot. Attribute values are not shown.
    #[must_use]
    pub fn format_state(&self, snapshot: Option<&StateSnapshot>, backend: &str) -> String {
        let Some(snapshot) = snapshot else {
            return match self.format {
                OutputFormat::Json => to_json(&serde_json::json!({ "backend": backend, "state": null })),
                OutputFormat::Text => format!("No state recorded ({backend} backend).\n"),
            };
        };

        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "backend": backend,
                "version": snapshot.version,
                "stack": snapshot.stack,
                "environment": snapshot.environment,
                "tenant": snapshot.tenant,
                "last_updated": snapshot.last_updated,
                "resources": snapshot.resources.iter().map(|r| serde_json::json!({
                    "identity": r.identity.to_string(),
                    "resource_id": r.resource_id,
                })).collect::<Vec<_>>(),
            })),
            OutputFormat::Text => {
                let mut output = format!("\nState: {} ({backend} backend)\n\n", snapshot.stack_label());
                let _ = writeln!(output, "   Version: {}", snapshot.version);
                let _ = writeln!(output, "   Tenant: {}", snapshot.tenant);
                let _ = writeln!(
                    output,
                    "   Last updated: {}",
                    snapshot.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
                );
                let _ = writeln!(output, "   Resources: {}", snapshot.resources.len());
                for resource in &snapshot.resources {
                    let _ = writeln!(output, "     {} ({})", resource.identity, resource.resource_id);
                }
                output
            }
        }
    }

    /// Formats a change type with color.
    fn format_change_type(change_type: ChangeType) -> String {
        let label = format!("{} {change_type}", change_type.symbol());
        match change_type {
            ChangeType::Create => label.green().to_string(),
            ChangeType::Update => label.yellow().to_string(),
            ChangeType::Recreate => label.magenta().to_string(),
            ChangeType::Delete => label.red().to_string(),
            ChangeType::NoChange => label.dimmed().to_string(),
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

/// Truncates a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct PlanJson<'a> {
    change_set: &'a crate::planner::ChangeSet,
    fingerprint: String,
    errors: Vec<String>,
    violations: &'a [crate::planner::Violation],
}

impl<'a> From<&'a PlanReport> for PlanJson<'a> {
    fn from(report: &'a PlanReport) -> Self {
        Self {
            change_set: &report.change_set,
            fingerprint: report.change_set.fingerprint(),
            errors: report.errors.iter().map(ToString::to_string).collect(),
            violations: &report.violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{AttributeChange, ChangeSet, StackRef};
    use serde_json::json;

    fn report() -> PlanReport {
        let identity = ResourceIdentity::new("Database", "orders-db", "acme", "core");
        let change = Change {
            identity: identity.clone(),
            resource_id: String::from("db-123"),
            resource_kind: String::from("Database"),
            resource_name: String::from("orders-db"),
            change_type: ChangeType::Update,
            attribute_changes: vec![AttributeChange {
                path: String::from("spec.masterPassword"),
                old_value: Some(json!("hunter2")),
                new_value: Some(json!("correct-horse")),
                sensitive: true,
                force_recreate: false,
            }],
            reason: String::from("1 attribute(s) changed"),
            requires_recreate: false,
            depends_on: vec![],
        };
        PlanReport {
            change_set: ChangeSet::new(
                StackRef {
                    stack: String::from("shop"),
                    environment: String::from("prod"),
                    tenant: String::from("acme"),
                },
                "0123456789abcdef",
                vec![change],
                0,
            ),
            errors: vec![],
            violations: vec![],
        }
    }

    #[test]
    fn test_text_plan_masks_sensitive_values() {
        let output = OutputFormatter::new(OutputFormat::Text).format_plan(&report(), true);

        assert!(output.contains("Database/acme/core/orders-db"));
        assert!(output.contains("spec.masterPassword"));
        assert!(!output.contains("hunter2"));
        assert!(!output.contains("correct-horse"));
    }

    #[test]
    fn test_json_plan_omits_sensitive_values() {
        let output = OutputFormatter::new(OutputFormat::Json).format_plan(&report(), false);
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid json");

        let attribute = &value["change_set"]["changes"][0]["attribute_changes"][0];
        assert_eq!(attribute["sensitive"], json!(true));
        assert!(attribute.get("old_value").is_none());
        assert!(!output.contains("hunter2"));
        assert_eq!(value["fingerprint"].as_str().map(str::len), Some(64));
    }

    #[test]
    fn test_empty_state_message() {
        let output = OutputFormatter::new(OutputFormat::Text).format_state(None, "local");
        assert_eq!(output, "No state recorded (local backend).\n");
    }

    #[test]
    fn test_kinds_table_lists_builtins() {
        let output = OutputFormatter::new(OutputFormat::Text)
            .format_kinds(&ProviderRegistry::with_builtin_kinds());
        assert!(output.contains("SecurityGroup"));
        assert!(output.contains("spec.masterPassword"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-much-longer-reason", 10), "a-much-...");
    }
}
