//! Row validation for imported rosters
//!
//! Collects every failing condition per row instead of stopping at the
//! first, so the final report can tell the user everything that is wrong
//! with their sheet in one pass. A row either becomes a complete
//! [`Employee`] or a [`RejectedRow`]; there is no partially-accepted state.

use crate::documents::{format_cpf, validate_cpf};
use crate::importers::RawRosterRow;
use crate::models::Employee;
use crate::normalize::{is_date_br, normalize_date_str};

/// A rejected data row: its 1-based sheet position and every reason it
/// failed.
#[derive(Debug, Clone)]
pub struct RejectedRow {
    pub row: usize,
    pub reasons: Vec<String>,
}

impl RejectedRow {
    pub fn describe(&self) -> String {
        format!("row {}: {}", self.row, self.reasons.join("; "))
    }
}

/// Normalize and validate every raw row, partitioning into accepted
/// employees (in sheet order) and rejected rows.
pub fn validate_rows(raw_rows: &[RawRosterRow]) -> (Vec<Employee>, Vec<RejectedRow>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for raw in raw_rows {
        match validate_row(raw) {
            Ok(employee) => accepted.push(employee),
            Err(reasons) => rejected.push(RejectedRow {
                row: raw.row,
                reasons,
            }),
        }
    }

    (accepted, rejected)
}

/// Extract-and-normalize one row: either a complete record or the full list
/// of reasons it was refused.
fn validate_row(raw: &RawRosterRow) -> Result<Employee, Vec<String>> {
    let name = raw.name.trim().to_string();
    let cpf = format_cpf(&raw.cpf);
    let birth_date = normalize_date_str(&raw.birth_date);
    let mother_name = raw.mother_name.trim().to_string();

    let mut reasons = Vec::new();
    if name.is_empty() {
        reasons.push("empty name".to_string());
    }
    if cpf.is_empty() || !validate_cpf(&cpf) {
        reasons.push("invalid CPF".to_string());
    }
    if birth_date.is_empty() || !is_date_br(&birth_date) {
        reasons.push("invalid birth date (expected DD/MM/YYYY)".to_string());
    }

    if !reasons.is_empty() {
        return Err(reasons);
    }

    Ok(Employee {
        name,
        cpf,
        birth_date,
        mother_name,
    })
}
