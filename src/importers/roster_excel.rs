//! Worksheet reader for employee rosters
//!
//! Reads the first sheet of an `.xlsx`/`.xls` workbook: the first row is the
//! header, everything below is data. Column headers are matched tolerantly
//! ("Nome da Mãe", "nome_da_mae" and "Mae" all resolve to the mother's-name
//! column) so the sheet does not have to be a byte-exact copy of the
//! template.

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Reader};
use tracing::debug;

use crate::importers::ImportError;
use crate::normalize::{excel_serial_to_br_date, normalize_key};

/// Accepted spellings for each roster column, first entry being canonical.
const NAME_HEADERS: &[&str] = &["Nome"];
const CPF_HEADERS: &[&str] = &["CPF"];
const BIRTH_DATE_HEADERS: &[&str] = &["Data de Nascimento", "Nascimento", "DataNascimento"];
const MOTHER_NAME_HEADERS: &[&str] = &["Nome da Mãe", "Nome da Mae", "Mae"];

/// One data row, stringified but not yet validated. `row` is the 1-based
/// sheet position, so the first data row reports as row 2.
#[derive(Debug, Clone)]
pub struct RawRosterRow {
    pub row: usize,
    pub name: String,
    pub cpf: String,
    pub birth_date: String,
    pub mother_name: String,
}

/// Resolved column positions for the fields we care about.
#[derive(Debug)]
struct RosterColumns {
    name: usize,
    cpf: usize,
    birth_date: usize,
    mother_name: Option<usize>,
}

impl RosterColumns {
    /// Resolve columns from the header row. Matching is on normalized keys:
    /// exact equality first, then prefix ("CPF Nº" normalizes to `cpfn`,
    /// which only a prefix match ties back to `cpf`). Exact-first keeps
    /// "Nome" from being captured by a "Nome da Mãe" column.
    fn resolve(header: &[Data]) -> Result<Self, ImportError> {
        let keys: Vec<String> = header
            .iter()
            .map(|cell| normalize_key(&cell.to_string()))
            .collect();

        let name = find_column(&keys, NAME_HEADERS);
        let cpf = find_column(&keys, CPF_HEADERS);
        let birth_date = find_column(&keys, BIRTH_DATE_HEADERS);
        let mother_name = find_column(&keys, MOTHER_NAME_HEADERS);

        debug!(
            "resolved header columns: name={:?} cpf={:?} birth_date={:?} mother={:?}",
            name, cpf, birth_date, mother_name
        );

        match (name, cpf, birth_date) {
            (Some(name), Some(cpf), Some(birth_date)) => Ok(RosterColumns {
                name,
                cpf,
                birth_date,
                mother_name,
            }),
            _ => Err(ImportError::MissingHeaders),
        }
    }
}

fn find_column(header_keys: &[String], wanted: &[&str]) -> Option<usize> {
    for w in wanted {
        let wk = normalize_key(w);
        if let Some(i) = header_keys.iter().position(|k| *k == wk) {
            return Some(i);
        }
    }
    for w in wanted {
        let wk = normalize_key(w);
        if wk.is_empty() {
            continue;
        }
        if let Some(i) = header_keys.iter().position(|k| k.starts_with(&wk)) {
            return Some(i);
        }
    }
    None
}

/// Read the first sheet of the workbook into raw roster rows. A workbook
/// whose first sheet has no data rows is reported as empty, not as a
/// zero-row success.
pub fn read_roster_sheet<P: AsRef<Path>>(path: P) -> Result<Vec<RawRosterRow>, ImportError> {
    let mut workbook = open_workbook_auto(path.as_ref())
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    // First-sheet convention: extra sheets are ignored.
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Unreadable("workbook has no sheets".to_string()))?
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(ImportError::EmptyWorksheet)?;
    let columns = RosterColumns::resolve(header)?;

    let mut raw_rows = Vec::new();
    for (idx, row) in rows.enumerate() {
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        raw_rows.push(RawRosterRow {
            row: idx + 2, // 1-based, after the header row
            name: cell_text(row, columns.name),
            cpf: cell_text(row, columns.cpf),
            birth_date: birth_date_text(row, columns.birth_date),
            mother_name: columns
                .mother_name
                .map(|i| cell_text(row, i))
                .unwrap_or_default(),
        });
    }

    if raw_rows.is_empty() {
        return Err(ImportError::EmptyWorksheet);
    }

    Ok(raw_rows)
}

/// Missing and empty cells both read as the empty string.
fn cell_text(row: &[Data], idx: usize) -> String {
    match row.get(idx) {
        None | Some(Data::Empty) => String::new(),
        Some(cell) => cell.to_string(),
    }
}

/// Birth-date cells need special handling: spreadsheets frequently store
/// dates as 1900-epoch day serials rather than text.
fn birth_date_text(row: &[Data], idx: usize) -> String {
    match row.get(idx) {
        None | Some(Data::Empty) => String::new(),
        Some(Data::Float(serial)) => {
            excel_serial_to_br_date(*serial).unwrap_or_else(|| serial.to_string())
        }
        Some(Data::Int(serial)) => {
            excel_serial_to_br_date(*serial as f64).unwrap_or_else(|| serial.to_string())
        }
        Some(Data::DateTime(dt)) => {
            excel_serial_to_br_date(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string())
        }
        Some(cell) => cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<Data> {
        cells.iter().map(|c| Data::String(c.to_string())).collect()
    }

    #[test]
    fn test_resolve_canonical_headers() {
        let cols =
            RosterColumns::resolve(&header(&["Nome", "CPF", "Data de Nascimento", "Nome da Mãe"]))
                .unwrap();
        assert_eq!(cols.name, 0);
        assert_eq!(cols.cpf, 1);
        assert_eq!(cols.birth_date, 2);
        assert_eq!(cols.mother_name, Some(3));
    }

    #[test]
    fn test_resolve_header_variants() {
        let cols =
            RosterColumns::resolve(&header(&["nome", "cpf", "Nascimento", "nome_da_mae"])).unwrap();
        assert_eq!(cols.birth_date, 2);
        assert_eq!(cols.mother_name, Some(3));
    }

    #[test]
    fn test_resolve_cpf_with_suffix_by_prefix_match() {
        let cols =
            RosterColumns::resolve(&header(&["Nome", "CPF Nº", "DataNascimento"])).unwrap();
        assert_eq!(cols.cpf, 1);
    }

    #[test]
    fn test_resolve_name_not_captured_by_mother_column() {
        let cols =
            RosterColumns::resolve(&header(&["Nome da Mãe", "Nome", "CPF", "Nascimento"])).unwrap();
        assert_eq!(cols.name, 1);
        assert_eq!(cols.mother_name, Some(0));
    }

    #[test]
    fn test_resolve_missing_required_header() {
        let err = RosterColumns::resolve(&header(&["Nome", "Data de Nascimento"])).unwrap_err();
        assert!(matches!(err, ImportError::MissingHeaders));
    }

    #[test]
    fn test_mother_name_column_is_optional() {
        let cols = RosterColumns::resolve(&header(&["Nome", "CPF", "Nascimento"])).unwrap();
        assert_eq!(cols.mother_name, None);
    }

    #[test]
    fn test_birth_date_text_from_serial() {
        let row = vec![Data::Float(25569.0)];
        assert_eq!(birth_date_text(&row, 0), "01/01/1970");
        let row = vec![Data::Int(32874)];
        assert_eq!(birth_date_text(&row, 0), "01/01/1990");
    }

    #[test]
    fn test_cell_text_defaults_to_empty() {
        let row = vec![Data::String("x".to_string())];
        assert_eq!(cell_text(&row, 5), "");
        assert_eq!(cell_text(&[Data::Empty], 0), "");
    }
}
