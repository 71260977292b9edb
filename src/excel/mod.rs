//! Spreadsheet import/export
//!
//! - Import: subject matrix workbook (.xlsx / .xls) → store
//! - Export: contest study map → Tutory partner workbook (.xlsx)

mod exporter;
mod importer;
mod upload;

pub use exporter::{
    download_file_name, sheet_name, TutoryCell, TutoryExport, TutoryExporter, TutoryRow,
    TUTORY_HEADERS, XLSX_MIME,
};
pub use importer::{
    clean_text, decode_row, decode_workbook, merge_links, DecodedWorkbook, ImportReport,
    ImportStats, MatrixImporter, MatrixRow, MatrixSheet, RowKind, FIRST_DATA_ROW,
};
pub use upload::{check_upload, MAX_UPLOAD_BYTES};
