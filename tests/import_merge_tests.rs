//! Integration tests for the roster import pipeline
//!
//! Each test writes a real workbook with rust_xlsxwriter into a temp
//! directory and runs it through the same reader/validator/merger the CLI
//! uses, so the scenarios cover the pipeline end to end:
//! - mixed valid/invalid/duplicate rows
//! - idempotent re-imports
//! - name conflicts that must not touch the roster
//! - tolerant header matching and structural failures

use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

use adesao::importers::{import_roster_file, ImportError};
use adesao::models::Employee;
use adesao::report::format_import_report;
use adesao::roster::{merge, MatchKey, Roster};

const HEADERS: [&str; 4] = ["Nome", "CPF", "Data de Nascimento", "Nome da Mãe"];

/// Write a workbook whose first sheet has the given header and string rows.
fn write_sheet(dir: &TempDir, name: &str, header: &[&str], rows: &[&[&str]]) -> PathBuf {
    let path = dir.path().join(name);
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Colaboradores").unwrap();

    for (col, text) in header.iter().enumerate() {
        worksheet.write_string(0, col as u16, *text).unwrap();
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col, text) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32 + 1, col as u16, *text)
                .unwrap();
        }
    }

    workbook.save(&path).unwrap();
    path
}

fn employee(name: &str, cpf: &str, birth_date: &str) -> Employee {
    Employee {
        name: name.to_string(),
        cpf: cpf.to_string(),
        birth_date: birth_date.to_string(),
        mother_name: String::new(),
    }
}

fn import_and_merge(current: &Roster, path: &Path) -> (adesao::roster::MergeOutcome, Vec<adesao::importers::RejectedRow>) {
    let import = import_roster_file(path).unwrap();
    let rejected = import.rejected;
    (merge(current, import.accepted), rejected)
}

#[test]
fn end_to_end_mixed_sheet() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        &dir,
        "mixed.xlsx",
        &HEADERS,
        &[
            // row 2: bad checksum, rejected
            &["PESSOA INVALIDA", "123.456.789-00", "01/02/1990", ""],
            // row 3: valid and new
            &["JOÃO DA SILVA", "529.982.247-25", "01/02/1990", "MARIA DA SILVA"],
            // row 4: valid, matches the existing entry by name only
            &["Fulano de Tal", "111.444.777-35", "05/05/1985", ""],
        ],
    );

    let current = Roster {
        employees: vec![employee("FULANO DE TAL", "", "")],
    };
    let (outcome, rejected) = import_and_merge(&current, &path);

    assert_eq!(outcome.added.len(), 1);
    assert_eq!(outcome.updated.len(), 1);
    assert_eq!(outcome.updated[0].matched_by, MatchKey::Name);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].row, 2);
    assert!(outcome.conflicts.is_empty());

    // original size + 1
    assert_eq!(outcome.roster.employees.len(), 2);
    // the name-matched entry kept its name and gained the imported CPF
    assert_eq!(outcome.roster.employees[0].name, "FULANO DE TAL");
    assert_eq!(outcome.roster.employees[0].cpf, "111.444.777-35");
    assert_eq!(outcome.roster.employees[0].birth_date, "05/05/1985");

    let report = format_import_report(&outcome, &rejected);
    assert!(report.contains("1 employee added · 1 employee updated · 1 invalid row ignored"));
    assert!(report.contains("row 2: invalid CPF"));
}

#[test]
fn reimporting_the_same_sheet_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        &dir,
        "roster.xlsx",
        &HEADERS,
        &[
            &["JOÃO DA SILVA", "529.982.247-25", "01/02/1990", "MARIA DA SILVA"],
            &["ANA LIMA", "390.533.447-05", "15/03/1988", ""],
        ],
    );

    let (first, first_rejected) = import_and_merge(&Roster::new(), &path);
    assert!(first_rejected.is_empty());
    assert_eq!(first.added.len(), 2);

    let (second, _) = import_and_merge(&first.roster, &path);
    assert!(second.added.is_empty());
    assert_eq!(second.updated.len(), 2);
    assert!(second
        .updated
        .iter()
        .all(|u| u.matched_by == MatchKey::Cpf));
    // existing non-empty fields win, so nothing changed
    assert_eq!(second.roster.employees, first.roster.employees);
}

#[test]
fn name_conflict_leaves_roster_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        &dir,
        "conflict.xlsx",
        &HEADERS,
        &[&["Maria Silva", "390.533.447-05", "02/02/1982", ""]],
    );

    let current = Roster {
        employees: vec![employee("Maria Silva", "111.111.111-11", "01/01/1980")],
    };
    let before = current.employees.clone();
    let (outcome, rejected) = import_and_merge(&current, &path);

    assert!(rejected.is_empty());
    assert_eq!(outcome.conflicts.len(), 1);
    assert!(outcome.added.is_empty());
    assert!(outcome.updated.is_empty());
    assert_eq!(outcome.roster.employees, before);

    let report = format_import_report(&outcome, &rejected);
    assert!(report.contains("1 conflict"));
    assert!(report.contains("existing CPF 111.111.111-11 differs from imported 390.533.447-05"));
}

#[test]
fn header_matching_tolerates_variants() {
    let dir = TempDir::new().unwrap();
    // "CPF Nº" fails an exact match but still resolves to the CPF column
    let path = write_sheet(
        &dir,
        "variants.xlsx",
        &["nome", "CPF Nº", "nascimento", "nome_da_mae"],
        &[&["JOÃO DA SILVA", "52998224725", "01/02/1990", "MARIA"]],
    );

    let import = import_roster_file(&path).unwrap();
    assert!(import.rejected.is_empty());
    assert_eq!(import.accepted.len(), 1);
    assert_eq!(import.accepted[0].cpf, "529.982.247-25");
    assert_eq!(import.accepted[0].mother_name, "MARIA");
}

#[test]
fn date_formats_and_serials_normalize() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dates.xlsx");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, text) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *text).unwrap();
    }
    worksheet.write_string(1, 0, "JOÃO DA SILVA").unwrap();
    worksheet.write_string(1, 1, "529.982.247-25").unwrap();
    worksheet.write_string(1, 2, "1990-02-01").unwrap(); // ISO text
    worksheet.write_string(2, 0, "ANA LIMA").unwrap();
    worksheet.write_string(2, 1, "390.533.447-05").unwrap();
    worksheet.write_number(2, 2, 25569.0).unwrap(); // Excel serial
    workbook.save(&path).unwrap();

    let import = import_roster_file(&path).unwrap();
    assert!(import.rejected.is_empty());
    assert_eq!(import.accepted[0].birth_date, "01/02/1990");
    assert_eq!(import.accepted[1].birth_date, "01/01/1970");
}

#[test]
fn header_only_sheet_aborts_as_empty() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(&dir, "empty.xlsx", &HEADERS, &[]);

    let err = import_roster_file(&path).unwrap_err();
    assert!(matches!(err, ImportError::EmptyWorksheet));
}

#[test]
fn missing_required_header_aborts_up_front() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        &dir,
        "noheader.xlsx",
        &["Nome", "Data de Nascimento"],
        &[&["JOÃO DA SILVA", "01/02/1990"]],
    );

    let err = import_roster_file(&path).unwrap_err();
    assert!(matches!(err, ImportError::MissingHeaders));
    assert!(err.to_string().contains("Nome, CPF, Data de Nascimento"));
}

#[test]
fn sheet_with_no_valid_rows_aborts_with_details() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        &dir,
        "invalid.xlsx",
        &HEADERS,
        &[
            &["", "529.982.247-25", "01/02/1990", ""],
            &["MARIA", "111.111.111-11", "31/02/2000", ""],
        ],
    );

    let err = import_roster_file(&path).unwrap_err();
    match err {
        ImportError::NoValidRows { rejected } => {
            assert_eq!(rejected.len(), 2);
            assert_eq!(rejected[0].row, 2);
            assert_eq!(rejected[0].reasons, vec!["empty name".to_string()]);
            assert_eq!(
                rejected[1].reasons,
                vec![
                    "invalid CPF".to_string(),
                    "invalid birth date (expected DD/MM/YYYY)".to_string()
                ]
            );
        }
        other => panic!("expected NoValidRows, got {other:?}"),
    }
}

#[test]
fn only_first_sheet_is_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("multi.xlsx");

    let mut workbook = Workbook::new();
    let first = workbook.add_worksheet();
    for (col, text) in HEADERS.iter().enumerate() {
        first.write_string(0, col as u16, *text).unwrap();
    }
    first.write_string(1, 0, "JOÃO DA SILVA").unwrap();
    first.write_string(1, 1, "529.982.247-25").unwrap();
    first.write_string(1, 2, "01/02/1990").unwrap();

    let second = workbook.add_worksheet();
    second.write_string(0, 0, "unrelated").unwrap();
    second.write_string(1, 0, "data").unwrap();
    workbook.save(&path).unwrap();

    let import = import_roster_file(&path).unwrap();
    assert_eq!(import.accepted.len(), 1);
}

#[test]
fn merged_roster_survives_a_session_roundtrip() {
    let dir = TempDir::new().unwrap();
    let sheet = write_sheet(
        &dir,
        "roster.xlsx",
        &HEADERS,
        &[&["JOÃO DA SILVA", "529.982.247-25", "01/02/1990", ""]],
    );
    let session = dir.path().join("colaboradores.json");

    let (outcome, _) = import_and_merge(&Roster::load(&session).unwrap(), &sheet);
    outcome.roster.save(&session).unwrap();

    // a second import against the saved session updates instead of adding
    let (second, _) = import_and_merge(&Roster::load(&session).unwrap(), &sheet);
    assert!(second.added.is_empty());
    assert_eq!(second.updated.len(), 1);
}
