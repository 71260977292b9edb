//! Tutory exporter - contest study map → partner spreadsheet (.xlsx)
//!
//! One header row plus one row per study-map entry, ordered by entry order.
//! Entries without metadata export the partner format's defaults.

use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::error::{MapaError, MapaResult};
use crate::store::Store;
use crate::types::{Contest, StudyMapRow, StudyMetadata};

/// MIME type of the exported workbook
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Excel's worksheet name limit
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Column headers of the Tutory format, in order
pub const TUTORY_HEADERS: [&str; 19] = [
    "Disciplina",
    "Assunto",
    "Páginas ou Minutos de Vídeo",
    "Minutos Expresso",
    "Minutos Regular",
    "Minutos Calma",
    "Dica",
    "Dica de Revisões",
    "Dica de Questões",
    "Referência",
    "Ordenação",
    "Peso de Resumos",
    "Peso de Revisões",
    "Peso de Questões",
    "Número de Questões",
    "Link de Estudo",
    "Link de Resumo",
    "Link de Questões",
    "Suplementar",
];

/// A single exported cell
#[derive(Debug, Clone, PartialEq)]
pub enum TutoryCell {
    Text(String),
    Number(f64),
}

impl TutoryCell {
    fn text(value: &str) -> Self {
        TutoryCell::Text(value.to_string())
    }

    fn number(value: impl Into<f64>) -> Self {
        TutoryCell::Number(value.into())
    }
}

/// The 19 values of one exported entry
#[derive(Debug, Clone, PartialEq)]
pub struct TutoryRow {
    pub cells: Vec<TutoryCell>,
}

impl TutoryRow {
    pub fn from_row(row: &StudyMapRow) -> Self {
        let defaults = StudyMetadata::default();
        let m = row.metadata.as_ref().unwrap_or(&defaults);

        let cells = vec![
            TutoryCell::text(row.discipline_name.as_deref().unwrap_or_default()),
            TutoryCell::Text(row.display_name()),
            TutoryCell::number(m.pages_or_minutes),
            TutoryCell::number(m.minutes_express),
            TutoryCell::number(m.minutes_regular),
            TutoryCell::number(m.minutes_calm),
            TutoryCell::text(&m.tip),
            TutoryCell::text(&m.review_tip),
            TutoryCell::text(&m.questions_tip),
            TutoryCell::text(&m.reference),
            TutoryCell::number(row.order),
            TutoryCell::number(m.summary_weight),
            TutoryCell::number(m.review_weight),
            TutoryCell::number(m.questions_weight),
            TutoryCell::number(m.question_count),
            TutoryCell::text(&m.study_link),
            TutoryCell::text(&m.summary_link),
            TutoryCell::text(&m.questions_link),
            TutoryCell::number(m.supplementary_flag()),
        ];
        Self { cells }
    }
}

/// Worksheet title for a contest code: the first 31 characters, or `None`
/// for a blank code (the workbook default is kept).
pub fn sheet_name(code: &str) -> Option<String> {
    let name: String = code.chars().take(MAX_SHEET_NAME_LEN).collect();
    if name.trim().is_empty() {
        None
    } else {
        Some(name)
    }
}

/// `<sigla>_tutory.xlsx`
pub fn download_file_name(contest: &Contest) -> String {
    format!("{}_tutory.xlsx", contest.code)
}

/// An exported workbook and its download name
#[derive(Debug, Clone)]
pub struct TutoryExport {
    pub contest: Contest,
    pub file_name: String,
    pub rows: usize,
    pub bytes: Vec<u8>,
}

/// Writes a contest's study map in the Tutory format
pub struct TutoryExporter;

impl TutoryExporter {
    /// Export one contest from the store.
    pub fn export_contest(store: &Store, contest_id: i64) -> MapaResult<TutoryExport> {
        let contest = store.get_contest(contest_id)?;
        let rows = store.study_map_rows(contest_id)?;
        let bytes = Self::render(&contest, &rows)?;
        info!(
            contest = %contest.code,
            rows = rows.len(),
            bytes = bytes.len(),
            "exported Tutory workbook"
        );
        Ok(TutoryExport {
            file_name: download_file_name(&contest),
            rows: rows.len(),
            contest,
            bytes,
        })
    }

    /// Render already-loaded rows; `rows` must be in export order.
    pub fn render(contest: &Contest, rows: &[StudyMapRow]) -> MapaResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        if let Some(name) = sheet_name(&contest.code) {
            worksheet.set_name(&name).map_err(|e| {
                MapaError::Export(format!("Invalid worksheet name '{}': {}", name, e))
            })?;
        }

        for (col, header) in TUTORY_HEADERS.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, *header)
                .map_err(|e| MapaError::Export(format!("Failed to write header: {}", e)))?;
        }

        for (idx, row) in rows.iter().enumerate() {
            write_row(worksheet, idx as u32 + 1, &TutoryRow::from_row(row))?;
        }

        workbook
            .save_to_buffer()
            .map_err(|e| MapaError::Export(format!("Failed to build Excel file: {}", e)))
    }
}

fn write_row(worksheet: &mut Worksheet, row: u32, values: &TutoryRow) -> MapaResult<()> {
    for (col, cell) in values.cells.iter().enumerate() {
        let col = col as u16;
        let written = match cell {
            TutoryCell::Text(value) => worksheet.write_string(row, col, value),
            TutoryCell::Number(value) => worksheet.write_number(row, col, *value),
        };
        written.map_err(|e| {
            MapaError::Export(format!(
                "Failed to write cell at row {}, col {}: {}",
                row, col, e
            ))
        })?;
    }
    Ok(())
}
