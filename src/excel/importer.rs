//! Subject matrix importer - Excel (.xlsx / .xls) → Discipline / Subject / Sub-subject
//!
//! Workbook layout (one sheet per discipline):
//! - Row 1: blank, row 2: header, row 3: blank, data from row 4
//! - A: subject, B: first sub-subject, C: second sub-subject,
//!   D: "Aula dos Resumos OneNote" link, E: "Caderno TEC Concursos - Cebraspe" link,
//!   G: "Caderno de Questões FGV" link, H: tip
//!
//! Column F is skipped. Nothing documents what it held; if the partner
//! spreadsheet ever shifts a column this is the first place to look.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{MapaError, MapaResult};
use crate::store::{matrix, Store};
use crate::types::SubjectLinks;

/// First data row, 1-based
pub const FIRST_DATA_ROW: u32 = 4;

/// Label that marks a repeated header row
const HEADER_LABEL: &str = "assunto";

/// 0-based column positions of a matrix row
mod col {
    pub const SUBJECT: usize = 0;
    pub const FIRST_SUB_SUBJECT: usize = 1;
    pub const SECOND_SUB_SUBJECT: usize = 2;
    pub const SUMMARY_LINK: usize = 3;
    pub const CEBRASPE_LINK: usize = 4;
    // 5 (column F) is not read
    pub const FGV_LINK: usize = 6;
    pub const TIP: usize = 7;

    pub const WIDTH: usize = 8;
}

//==============================================================================
// Row decoding
//==============================================================================

/// One data row of a discipline sheet, decoded once from its cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixRow {
    pub subject: Option<String>,
    pub first_sub_subject: Option<String>,
    pub second_sub_subject: Option<String>,
    pub summary_link: Option<String>,
    pub cebraspe_link: Option<String>,
    pub fgv_link: Option<String>,
    pub tip: Option<String>,
}

impl MatrixRow {
    /// Parsed links and tip, absent values as empty strings
    pub fn links(&self) -> SubjectLinks {
        SubjectLinks {
            summary_link: self.summary_link.clone().unwrap_or_default(),
            cebraspe_link: self.cebraspe_link.clone().unwrap_or_default(),
            fgv_link: self.fgv_link.clone().unwrap_or_default(),
            tip: self.tip.clone().unwrap_or_default(),
        }
    }

    fn has_sub_subject(&self) -> bool {
        self.first_sub_subject.is_some() || self.second_sub_subject.is_some()
    }
}

/// Classification of a sheet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    /// No non-empty cell
    Blank,
    /// First cell reads "Assunto" (a repeated header)
    Header,
    Data(MatrixRow),
}

/// A discipline sheet decoded into rows, before anything touches the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixSheet {
    /// Discipline name (the sheet title)
    pub name: String,
    /// 1-based position in the workbook
    pub order: u32,
    /// (1-based row number, row)
    pub rows: Vec<(u32, RowKind)>,
}

/// Result of decoding a workbook: readable sheets plus per-sheet read errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedWorkbook {
    pub sheets: Vec<MatrixSheet>,
    pub errors: Vec<String>,
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Trimmed cell text; empty or whitespace-only cells are absent.
pub fn clean_text(cell: Option<&Data>) -> Option<String> {
    let cell = cell?;
    if matches!(cell, Data::Empty) {
        return None;
    }
    let text = cell.to_string();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Classify one row of cells (column A first).
pub fn decode_row(cells: &[Data]) -> RowKind {
    if cells.iter().all(is_blank) {
        return RowKind::Blank;
    }

    let text = |idx: usize| clean_text(cells.get(idx));
    let subject = text(col::SUBJECT);
    if subject
        .as_deref()
        .is_some_and(|s| s.to_lowercase() == HEADER_LABEL)
    {
        return RowKind::Header;
    }

    RowKind::Data(MatrixRow {
        subject,
        first_sub_subject: text(col::FIRST_SUB_SUBJECT),
        second_sub_subject: text(col::SECOND_SUB_SUBJECT),
        summary_link: text(col::SUMMARY_LINK),
        cebraspe_link: text(col::CEBRASPE_LINK),
        fgv_link: text(col::FGV_LINK),
        tip: text(col::TIP),
    })
}

/// Decode the data rows of one worksheet range.
///
/// calamine ranges start at the first used cell, so rows and columns are
/// addressed by absolute position.
fn decode_range(range: &Range<Data>) -> Vec<(u32, RowKind)> {
    let Some((last_row, last_col)) = range.end() else {
        return Vec::new();
    };
    let width = (last_col as usize + 1).max(col::WIDTH);

    (FIRST_DATA_ROW - 1..=last_row)
        .map(|row| {
            let cells: Vec<Data> = (0..width)
                .map(|c| {
                    range
                        .get_value((row, c as u32))
                        .cloned()
                        .unwrap_or(Data::Empty)
                })
                .collect();
            (row + 1, decode_row(&cells))
        })
        .collect()
}

/// Parse workbook bytes into decoded sheets.
///
/// Fails with [`MapaError::InvalidWorkbook`] when the bytes are not a
/// readable spreadsheet. A sheet that cannot be read (e.g. a chart sheet) is
/// reported in [`DecodedWorkbook::errors`] and skipped.
pub fn decode_workbook(bytes: &[u8]) -> MapaResult<DecodedWorkbook> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| MapaError::InvalidWorkbook(e.to_string()))?;

    let mut decoded = DecodedWorkbook::default();
    for (idx, name) in workbook.sheet_names().into_iter().enumerate() {
        let order = idx as u32 + 1;
        match workbook.worksheet_range(&name) {
            Ok(range) => decoded.sheets.push(MatrixSheet {
                rows: decode_range(&range),
                name,
                order,
            }),
            Err(e) => decoded
                .errors
                .push(format!("Aba '{}': não foi possível ler a planilha ({})", name, e)),
        }
    }
    Ok(decoded)
}

//==============================================================================
// Import
//==============================================================================

/// Counters reported by an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    #[serde(rename = "disciplinas_criadas")]
    pub disciplines_created: usize,
    #[serde(rename = "assuntos_criados")]
    pub subjects_created: usize,
    #[serde(rename = "subassuntos_criados")]
    pub sub_subjects_created: usize,
    #[serde(rename = "linhas_processadas")]
    pub rows_processed: usize,
    #[serde(rename = "linhas_ignoradas")]
    pub rows_skipped: usize,
}

/// Outcome of an import; `success` is true iff `errors` is empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    #[serde(rename = "sucesso")]
    pub success: bool,
    #[serde(rename = "estatisticas")]
    pub stats: ImportStats,
    #[serde(rename = "erros")]
    pub errors: Vec<String>,
    #[serde(rename = "avisos")]
    pub warnings: Vec<String>,
}

/// Imports a subject matrix workbook into the store.
///
/// Import methods consume the importer: counters and warnings belong to a
/// single run.
#[derive(Debug, Default)]
pub struct MatrixImporter {
    clear_existing: bool,
    stats: ImportStats,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl MatrixImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wipe the matrix inside the import transaction before applying sheets.
    ///
    /// The workbook is still decoded first, so an unreadable file leaves the
    /// existing matrix alone.
    pub fn clear_existing(mut self, clear: bool) -> Self {
        self.clear_existing = clear;
        self
    }

    /// Import a workbook file
    pub fn import_file<P: AsRef<Path>>(
        self,
        store: &mut Store,
        path: P,
    ) -> MapaResult<ImportReport> {
        let bytes = std::fs::read(path.as_ref())?;
        self.import_bytes(store, &bytes)
    }

    /// Import an in-memory workbook (e.g. an uploaded file)
    pub fn import_bytes(self, store: &mut Store, bytes: &[u8]) -> MapaResult<ImportReport> {
        let decoded = decode_workbook(bytes)?;
        self.import_decoded(store, decoded)
    }

    /// Apply decoded sheets inside one transaction.
    ///
    /// Any store error rolls back every sheet of the run and is returned as-is.
    pub fn import_decoded(
        mut self,
        store: &mut Store,
        decoded: DecodedWorkbook,
    ) -> MapaResult<ImportReport> {
        info!(sheets = decoded.sheets.len(), "importing subject matrix");
        self.errors.extend(decoded.errors);

        let clear_existing = self.clear_existing;
        store.transaction(|tx| {
            if clear_existing {
                let removed = matrix::clear_matrix(tx)?;
                info!(
                    disciplines = removed.disciplines,
                    subjects = removed.subjects,
                    sub_subjects = removed.sub_subjects,
                    "cleared existing matrix"
                );
            }
            for sheet in &decoded.sheets {
                self.apply_sheet(tx, sheet)?;
            }
            Ok(())
        })?;

        for error in &self.errors {
            warn!("{}", error);
        }
        info!(
            disciplines = self.stats.disciplines_created,
            subjects = self.stats.subjects_created,
            sub_subjects = self.stats.sub_subjects_created,
            processed = self.stats.rows_processed,
            skipped = self.stats.rows_skipped,
            warnings = self.warnings.len(),
            "subject matrix imported"
        );

        Ok(ImportReport {
            success: self.errors.is_empty(),
            stats: self.stats,
            errors: self.errors,
            warnings: self.warnings,
        })
    }

    fn apply_sheet(&mut self, conn: &Connection, sheet: &MatrixSheet) -> MapaResult<()> {
        let (discipline, created) =
            matrix::get_or_create_discipline(conn, &sheet.name, sheet.order)?;
        if created {
            self.stats.disciplines_created += 1;
        }

        let mut subject_order = 0;
        for (row_number, kind) in &sheet.rows {
            self.stats.rows_processed += 1;

            let row = match kind {
                RowKind::Blank | RowKind::Header => {
                    self.stats.rows_skipped += 1;
                    continue;
                }
                RowKind::Data(row) => row,
            };

            match &row.subject {
                Some(subject_name) => {
                    subject_order += 1;
                    self.apply_subject(conn, discipline.id, subject_name, subject_order, row)?;
                }
                None if row.has_sub_subject() => {
                    let message = format!(
                        "Linha {} em '{}': Subassunto sem assunto pai",
                        row_number, sheet.name
                    );
                    warn!("{}", message);
                    self.warnings.push(message);
                }
                None => {}
            }
        }
        Ok(())
    }

    fn apply_subject(
        &mut self,
        conn: &Connection,
        discipline_id: i64,
        name: &str,
        order: u32,
        row: &MatrixRow,
    ) -> MapaResult<()> {
        let parsed = row.links();
        let (subject, created) =
            matrix::get_or_create_subject(conn, discipline_id, name, order, &parsed)?;

        if created {
            self.stats.subjects_created += 1;
        } else {
            let current = subject.links();
            let merged = merge_links(&current, &parsed);
            if merged != current {
                matrix::update_subject_links(conn, subject.id, &merged)?;
            }
        }

        let slots = [(&row.first_sub_subject, 1), (&row.second_sub_subject, 2)];
        for (sub_name, sub_order) in slots {
            if let Some(sub_name) = sub_name {
                let (_, created) =
                    matrix::get_or_create_sub_subject(conn, subject.id, sub_name, sub_order)?;
                if created {
                    self.stats.sub_subjects_created += 1;
                }
            }
        }
        Ok(())
    }
}

/// Fill empty stored fields from the parsed row; stored values always win.
pub fn merge_links(current: &SubjectLinks, parsed: &SubjectLinks) -> SubjectLinks {
    let pick = |stored: &String, incoming: &String| {
        if stored.is_empty() && !incoming.is_empty() {
            incoming.clone()
        } else {
            stored.clone()
        }
    };
    SubjectLinks {
        summary_link: pick(&current.summary_link, &parsed.summary_link),
        cebraspe_link: pick(&current.cebraspe_link, &parsed.cebraspe_link),
        fgv_link: pick(&current.fgv_link, &parsed.fgv_link),
        tip: pick(&current.tip, &parsed.tip),
    }
}
