//! Roster import pipeline
//!
//! Turns an uploaded worksheet into validated [`Employee`] records: the
//! reader handles the container format and header variation, the row
//! validator normalizes and checks every row. Structural problems abort the
//! whole import as an [`ImportError`]; per-row problems only reject that row.

pub mod roster_excel;
pub mod validation;

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::models::Employee;

pub use roster_excel::RawRosterRow;
pub use validation::RejectedRow;

/// Structural import failures. These abort the import before any merge;
/// per-row failures are data ([`RejectedRow`]), not errors.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("could not read the spreadsheet: {0}")]
    Unreadable(String),

    #[error("the worksheet is empty")]
    EmptyWorksheet,

    #[error("missing required headers: Nome, CPF, Data de Nascimento (Nome da Mãe is optional)")]
    MissingHeaders,

    #[error("no valid rows found")]
    NoValidRows { rejected: Vec<RejectedRow> },
}

/// Outcome of reading and validating one worksheet, before merging.
#[derive(Debug)]
pub struct RosterImport {
    pub accepted: Vec<Employee>,
    pub rejected: Vec<RejectedRow>,
}

/// Read the first sheet of `path`, validate every data row, and partition
/// into accepted employees and rejected rows. An import where every row is
/// rejected is a structural failure carrying all the rejections.
pub fn import_roster_file<P: AsRef<Path>>(path: P) -> Result<RosterImport, ImportError> {
    let path = path.as_ref();
    info!("importing roster from {:?}", path);

    let raw_rows = roster_excel::read_roster_sheet(path)?;
    let (accepted, rejected) = validation::validate_rows(&raw_rows);

    info!(
        "validated {} rows: {} accepted, {} rejected",
        raw_rows.len(),
        accepted.len(),
        rejected.len()
    );

    if accepted.is_empty() {
        return Err(ImportError::NoValidRows { rejected });
    }

    Ok(RosterImport { accepted, rejected })
}
