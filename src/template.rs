//! Model worksheet generator
//!
//! Writes the spreadsheet users download, fill in and re-upload: the
//! canonical header row plus one example employee so the expected formats
//! are obvious.

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use tracing::info;

/// Canonical roster header row, in template column order.
pub const TEMPLATE_HEADERS: [&str; 4] = ["Nome", "CPF", "Data de Nascimento", "Nome da Mãe"];

/// Example data row shipped with the template.
pub const TEMPLATE_EXAMPLE: [&str; 4] = [
    "JOÃO DA SILVA",
    "529.982.247-25",
    "01/02/1990",
    "MARIA DA SILVA",
];

const COLUMN_WIDTHS: [f64; 4] = [30.0, 16.0, 20.0, 30.0];

/// Write the roster template workbook to `path`.
pub fn write_roster_template<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Colaboradores")
        .context("failed to name the template sheet")?;

    for (col, header) in TEMPLATE_HEADERS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .context("failed to write template header")?;
    }
    for (col, value) in TEMPLATE_EXAMPLE.iter().enumerate() {
        worksheet
            .write_string(1, col as u16, *value)
            .context("failed to write template example row")?;
    }
    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, *width)
            .context("failed to set template column width")?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to write template to {:?}", path))?;

    info!("wrote roster template to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::import_roster_file;

    #[test]
    fn test_template_reimports_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelo_colaboradores.xlsx");
        write_roster_template(&path).unwrap();

        // the example row must survive our own import pipeline
        let imported = import_roster_file(&path).unwrap();
        assert!(imported.rejected.is_empty());
        assert_eq!(imported.accepted.len(), 1);
        assert_eq!(imported.accepted[0].name, "JOÃO DA SILVA");
        assert_eq!(imported.accepted[0].cpf, "529.982.247-25");
        assert_eq!(imported.accepted[0].birth_date, "01/02/1990");
        assert_eq!(imported.accepted[0].mother_name, "MARIA DA SILVA");
    }
}
