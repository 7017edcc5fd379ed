//! Human-readable import summaries
//!
//! One headline, one count line with zero-count clauses omitted, then
//! itemized detail for rejections and conflicts. The whole report is shown
//! to the user as a single blocking notice; rejection and conflict detail
//! live inside it rather than in separate prompts.

use crate::importers::RejectedRow;
use crate::roster::MergeOutcome;

/// Render the outcome of one import into the multi-line summary the user
/// acknowledges.
pub fn format_import_report(outcome: &MergeOutcome, rejected: &[RejectedRow]) -> String {
    let mut lines = vec!["Import finished.".to_string()];

    let mut clauses = Vec::new();
    if !outcome.added.is_empty() {
        clauses.push(count_clause(
            outcome.added.len(),
            "employee added",
            "employees added",
        ));
    }
    if !outcome.updated.is_empty() {
        clauses.push(count_clause(
            outcome.updated.len(),
            "employee updated",
            "employees updated",
        ));
    }
    if !rejected.is_empty() {
        clauses.push(count_clause(
            rejected.len(),
            "invalid row ignored",
            "invalid rows ignored",
        ));
    }
    if !outcome.conflicts.is_empty() {
        clauses.push(count_clause(outcome.conflicts.len(), "conflict", "conflicts"));
    }
    if clauses.is_empty() {
        clauses.push("no changes".to_string());
    }
    lines.push(clauses.join(" · "));

    if !rejected.is_empty() {
        lines.push("Rejected rows:".to_string());
        for row in rejected {
            lines.push(format!("  {}", row.describe()));
        }
    }

    if !outcome.conflicts.is_empty() {
        lines.push("Conflicts (same name, different CPF):".to_string());
        for conflict in &outcome.conflicts {
            lines.push(format!(
                "  {}: existing CPF {} differs from imported {}",
                conflict.name, conflict.existing_cpf, conflict.imported_cpf
            ));
        }
    }

    lines.join("\n")
}

fn count_clause(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {singular}")
    } else {
        format!("{count} {plural}")
    }
}
