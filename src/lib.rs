//! Adesão - company benefits-enrollment pipeline
//!
//! This library implements the data-integrity core of the enrollment form:
//! Brazilian document validation, roster spreadsheet import with tolerant
//! header matching, per-row validation, identity-resolving merge, and the
//! delivery edges (registry enrichment, template generation, back-office
//! e-mail submission).

pub mod config;
pub mod documents;
pub mod hours;
pub mod importers;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod report;
pub mod roster;
pub mod submission;
pub mod template;
