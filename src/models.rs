//! Domain models: the enrolling company and its employees
//!
//! Fields are plain strings with `""` meaning "not filled in". That is
//! deliberate: the merge rules compare empty against non-empty fields, and a
//! roster seeded with a single all-empty record stands for "nothing entered
//! yet". Validation is a separate step, not a constructor invariant.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::documents::{is_valid_phone, validate_cnpj, validate_cpf};
use crate::normalize::is_date_br;
use crate::registry::RegistryInfo;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r".+@.+\..+").expect("static regex"));

/// The enrolling legal entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub legal_name: String,
    pub cnpj: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    pub contact_name: String,
}

impl Company {
    /// Collect every validation failure instead of stopping at the first,
    /// so the caller can surface all of them at once.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.legal_name.trim().is_empty() {
            errors.push("legal name is required".to_string());
        }
        if !validate_cnpj(&self.cnpj) {
            errors.push("invalid CNPJ".to_string());
        }
        if !EMAIL.is_match(&self.email) {
            errors.push("invalid company email".to_string());
        }
        if !is_valid_phone(&self.phone) {
            errors.push("invalid phone (area code plus number)".to_string());
        }
        if self.contact_name.trim().is_empty() {
            errors.push("contact name is required".to_string());
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Fold a registry lookup result into the company record. Legal name,
    /// city and state take the registry value whenever it is non-empty
    /// (they may correct an earlier auto-fill); the postal code only fills
    /// an empty field; the email is never touched.
    pub fn apply_registry_info(&mut self, info: &RegistryInfo) {
        if let Some(legal_name) = non_empty(&info.legal_name) {
            self.legal_name = legal_name;
        }
        if let Some(city) = non_empty(&info.city) {
            self.city = city;
        }
        if let Some(state) = non_empty(&info.state) {
            self.state = state;
        }
        if self.postal_code.trim().is_empty() {
            if let Some(postal_code) = non_empty(&info.postal_code) {
                self.postal_code = postal_code;
            }
        }
    }
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// One person to be enrolled ("colaborador").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub cpf: String,
    /// Birth date in textual `DD/MM/YYYY` form; empty when not filled in.
    pub birth_date: String,
    #[serde(default)]
    pub mother_name: String,
}

impl Employee {
    /// A record is complete when the name is present, the CPF passes its
    /// checksum and the birth date is a real calendar date.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && validate_cpf(&self.cpf) && is_date_br(&self.birth_date)
    }

    /// True for the all-empty placeholder record.
    pub fn is_blank(&self) -> bool {
        self.name.is_empty()
            && self.cpf.is_empty()
            && self.birth_date.is_empty()
            && self.mother_name.is_empty()
    }
}
