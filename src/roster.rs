//! The employee roster and the identity-resolving merge
//!
//! The roster is the session's single piece of state: the list of employees
//! being enrolled, persisted as a JSON file between invocations. Imported
//! records are reconciled against it with a two-key strategy — CPF is the
//! strong key, the normalized full name the fallback — producing a new
//! roster value plus a structured outcome (added / updated / conflicting).
//!
//! Merge rules, in order, for each accepted record:
//! 1. CPF matches an existing entry: merge field-by-field, existing
//!    non-empty values win.
//! 2. Normalized name matches: merge only when the existing entry has no
//!    CPF, the CPFs are equal, or the imported record has no CPF. Two
//!    different CPFs under the same name is a conflict and touches nothing.
//! 3. No match: append as a new entry.
//!
//! CPF precedence is strict, records are processed in input order, and each
//! step sees the results of the previous ones (a later row can match an
//! earlier row's merge result).

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::{format_cpf, mask_date, only_digits};
use crate::models::Employee;
use crate::normalize::{normalize_date_str, normalize_name};

/// The in-session employee list. A roster holding exactly one all-empty
/// record is the seeded placeholder and counts as empty for merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub employees: Vec<Employee>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

/// Which key matched an updated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey {
    Cpf,
    Name,
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::Cpf => write!(f, "CPF"),
            MatchKey::Name => write!(f, "name"),
        }
    }
}

/// An existing entry refreshed by the import, annotated with the key that
/// identified it.
#[derive(Debug, Clone)]
pub struct UpdatedEmployee {
    pub employee: Employee,
    pub matched_by: MatchKey,
}

/// Same normalized name, two different CPFs: the record is neither merged
/// nor added.
#[derive(Debug, Clone)]
pub struct NameConflict {
    pub name: String,
    pub existing_cpf: String,
    pub imported_cpf: String,
}

/// Result of merging one import into the roster. Owns the new roster; the
/// caller decides whether to persist it.
#[derive(Debug)]
pub struct MergeOutcome {
    pub roster: Roster,
    pub added: Vec<Employee>,
    pub updated: Vec<UpdatedEmployee>,
    pub conflicts: Vec<NameConflict>,
}

impl Roster {
    /// A fresh session: one blank record, mirroring the empty form card the
    /// user starts from.
    pub fn new() -> Self {
        Self {
            employees: vec![Employee::default()],
        }
    }

    /// True when the roster is still the untouched placeholder.
    pub fn is_placeholder_only(&self) -> bool {
        self.employees.len() == 1 && self.employees[0].is_blank()
    }

    /// Load the roster session from a JSON file; a missing file yields a
    /// fresh placeholder roster.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no roster file at {:?}, starting a fresh session", path);
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read roster file {:?}", path))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse roster file {:?}", path))
    }

    /// Persist the roster session as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).context("failed to serialize roster")?;
        fs::write(path, text).with_context(|| format!("failed to write roster file {:?}", path))
    }

    /// Append one manually-entered employee. The CPF and birth date pass
    /// through the same masks the form applies while typing, and the record
    /// must come out complete; this is the CLI analogue of "fill in the
    /// current card before adding another".
    pub fn add(&mut self, employee: Employee) -> Result<Employee> {
        let employee = Employee {
            name: employee.name.trim().to_string(),
            cpf: format_cpf(&employee.cpf),
            birth_date: mask_date(&normalize_date_str(&employee.birth_date)),
            mother_name: employee.mother_name.trim().to_string(),
        };

        if !employee.is_complete() {
            return Err(anyhow!(
                "employee record is incomplete: name, a valid CPF and a DD/MM/YYYY birth date are required"
            ));
        }

        if self.is_placeholder_only() {
            self.employees.clear();
        }
        self.employees.push(employee.clone());
        Ok(employee)
    }

    /// Remove the employee at a 1-based position, returning it.
    pub fn remove(&mut self, position: usize) -> Result<Employee> {
        if position == 0 || position > self.employees.len() {
            return Err(anyhow!(
                "no employee at position {} (roster has {})",
                position,
                self.employees.len()
            ));
        }
        Ok(self.employees.remove(position - 1))
    }
}

/// Merge accepted import records into the current roster, building a new
/// employee list rather than mutating the input.
pub fn merge(current: &Roster, accepted: Vec<Employee>) -> MergeOutcome {
    let mut base: Vec<Employee> = if current.is_placeholder_only() {
        Vec::new()
    } else {
        current.employees.clone()
    };

    let mut cpf_index: HashMap<String, usize> = HashMap::new();
    let mut name_index: HashMap<String, usize> = HashMap::new();
    for (i, employee) in base.iter().enumerate() {
        let cpf_key = only_digits(&employee.cpf);
        if !cpf_key.is_empty() {
            cpf_index.insert(cpf_key, i);
        }
        name_index.insert(normalize_name(&employee.name), i);
    }

    let mut added = Vec::new();
    let mut updated = Vec::new();
    let mut conflicts = Vec::new();

    for new in accepted {
        let cpf_key = only_digits(&new.cpf);
        let name_key = normalize_name(&new.name);

        // 1. Strong key: CPF.
        if !cpf_key.is_empty() {
            if let Some(&idx) = cpf_index.get(&cpf_key) {
                let merged = merge_fields(&base[idx], &new);
                base[idx] = merged.clone();
                updated.push(UpdatedEmployee {
                    employee: merged,
                    matched_by: MatchKey::Cpf,
                });
                continue;
            }
        }

        // 2. Fallback key: normalized name.
        if let Some(&idx) = name_index.get(&name_key) {
            let existing_cpf_key = only_digits(&base[idx].cpf);
            if existing_cpf_key.is_empty() || existing_cpf_key == cpf_key || cpf_key.is_empty() {
                let merged = merge_fields(&base[idx], &new);
                base[idx] = merged.clone();
                if existing_cpf_key.is_empty() && !cpf_key.is_empty() {
                    // The entry just gained a CPF; make it findable by it.
                    cpf_index.insert(cpf_key, idx);
                }
                updated.push(UpdatedEmployee {
                    employee: merged,
                    matched_by: MatchKey::Name,
                });
            } else {
                conflicts.push(NameConflict {
                    name: new.name.clone(),
                    existing_cpf: base[idx].cpf.clone(),
                    imported_cpf: new.cpf.clone(),
                });
            }
            continue;
        }

        // 3. Unknown on both keys: a new entry.
        let idx = base.len();
        if !cpf_key.is_empty() {
            cpf_index.insert(cpf_key, idx);
        }
        name_index.insert(name_key, idx);
        base.push(new.clone());
        added.push(new);
    }

    MergeOutcome {
        roster: Roster { employees: base },
        added,
        updated,
        conflicts,
    }
}

/// Field-by-field merge where the existing non-empty value always wins and
/// the imported value only fills gaps.
fn merge_fields(existing: &Employee, imported: &Employee) -> Employee {
    Employee {
        name: keep_or_fill(&existing.name, &imported.name),
        cpf: keep_or_fill(&existing.cpf, &imported.cpf),
        birth_date: keep_or_fill(&existing.birth_date, &imported.birth_date),
        mother_name: keep_or_fill(&existing.mother_name, &imported.mother_name),
    }
}

fn keep_or_fill(existing: &str, imported: &str) -> String {
    if existing.is_empty() {
        imported.to_string()
    } else {
        existing.to_string()
    }
}
