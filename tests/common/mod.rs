//! Shared helpers: matrix workbooks built in memory and read back with calamine.

#![allow(dead_code)]

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::Workbook;

/// One discipline sheet: title plus data rows written from row 4 on.
/// An empty string leaves the cell unwritten; an empty row is a blank line.
pub struct Sheet<'a> {
    pub name: &'a str,
    pub rows: Vec<Vec<&'a str>>,
}

pub fn sheet<'a>(name: &'a str, rows: Vec<Vec<&'a str>>) -> Sheet<'a> {
    Sheet { name, rows }
}

/// Build a matrix workbook with the reserved layout: blank row 1, header
/// row 2, blank row 3, data from row 4.
pub fn matrix_workbook(sheets: &[Sheet<'_>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for s in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(s.name).unwrap();

        let header = [
            "Assunto",
            "Subassunto 1",
            "Subassunto 2",
            "Aula dos Resumos OneNote",
            "Caderno TEC Concursos - Cebraspe",
            "",
            "Caderno de Questões FGV",
            "Dica",
        ];
        for (col, title) in header.iter().enumerate() {
            if !title.is_empty() {
                worksheet.write_string(1, col as u16, *title).unwrap();
            }
        }

        for (idx, row) in s.rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    worksheet
                        .write_string(3 + idx as u32, col as u16, *value)
                        .unwrap();
                }
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// A subject row: subject, sub-subjects, summary link, Cebraspe link, FGV link, tip
pub fn subject_row<'a>(
    subject: &'a str,
    sub1: &'a str,
    sub2: &'a str,
    summary: &'a str,
    cebraspe: &'a str,
    fgv: &'a str,
    tip: &'a str,
) -> Vec<&'a str> {
    vec![subject, sub1, sub2, summary, cebraspe, "", fgv, tip]
}

/// First sheet of an xlsx buffer: (sheet name, rows of cells)
pub fn read_first_sheet(bytes: &[u8]) -> (String, Vec<Vec<Data>>) {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).unwrap();
    let name = workbook.sheet_names()[0].clone();
    let range = workbook.worksheet_range(&name).unwrap();
    let rows = range.rows().map(|r| r.to_vec()).collect();
    (name, rows)
}

/// Cell as text; empty cells read as ""
pub fn text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Cell as number; panics on text
pub fn number(cell: &Data) -> f64 {
    match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        other => panic!("expected number, got {:?}", other),
    }
}
