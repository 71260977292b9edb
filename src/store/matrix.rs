//! Discipline / Subject / Sub-subject queries.
//!
//! Functions take a plain [`Connection`] so they run equally on the store's
//! connection or inside a [`rusqlite::Transaction`].

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension as _};
use tracing::debug;

use super::encode::{
    discipline_from_row, sub_subject_from_row, subject_from_row, DISCIPLINE_COLUMNS,
    SUBJECT_COLUMNS, SUB_SUBJECT_COLUMNS,
};
use crate::error::MapaResult;
use crate::types::{
    Discipline, DisciplineNode, MatrixCounts, SubSubject, Subject, SubjectLinks, SubjectNode,
};

/// Fetch a discipline by name, creating it with `order` when absent.
///
/// Returns the row and whether it was created. An existing row keeps its order.
pub fn get_or_create_discipline(
    conn: &Connection,
    name: &str,
    order: u32,
) -> MapaResult<(Discipline, bool)> {
    let sql = format!("SELECT {} FROM disciplines WHERE name = ?1", DISCIPLINE_COLUMNS);
    if let Some(existing) = conn
        .query_row(&sql, params![name], discipline_from_row)
        .optional()?
    {
        return Ok((existing, false));
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO disciplines (name, sort_order, active, created_at, updated_at)
         VALUES (?1, ?2, 1, ?3, ?3)",
        params![name, order, now],
    )?;
    debug!(discipline = name, order, "created discipline");

    Ok((
        Discipline {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            order,
            active: true,
            created_at: now,
            updated_at: now,
        },
        true,
    ))
}

pub fn find_discipline(conn: &Connection, name: &str) -> MapaResult<Option<Discipline>> {
    let sql = format!("SELECT {} FROM disciplines WHERE name = ?1", DISCIPLINE_COLUMNS);
    Ok(conn
        .query_row(&sql, params![name], discipline_from_row)
        .optional()?)
}

/// Fetch a subject by exact name within a discipline.
pub fn find_subject(
    conn: &Connection,
    discipline_id: i64,
    name: &str,
) -> MapaResult<Option<Subject>> {
    let sql = format!(
        "SELECT {} FROM subjects WHERE discipline_id = ?1 AND name = ?2",
        SUBJECT_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![discipline_id, name], subject_from_row)
        .optional()?)
}

pub fn get_subject(conn: &Connection, id: i64) -> MapaResult<Option<Subject>> {
    let sql = format!("SELECT {} FROM subjects WHERE id = ?1", SUBJECT_COLUMNS);
    Ok(conn.query_row(&sql, params![id], subject_from_row).optional()?)
}

/// Fetch a subject, creating it with `order` and `links` when absent.
///
/// An existing subject is returned untouched; merging its links is the
/// caller's decision (see [`update_subject_links`]).
pub fn get_or_create_subject(
    conn: &Connection,
    discipline_id: i64,
    name: &str,
    order: u32,
    links: &SubjectLinks,
) -> MapaResult<(Subject, bool)> {
    if let Some(existing) = find_subject(conn, discipline_id, name)? {
        return Ok((existing, false));
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO subjects (
             discipline_id, name, sort_order, active,
             summary_link, cebraspe_link, fgv_link, tip,
             created_at, updated_at
         ) VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            discipline_id,
            name,
            order,
            links.summary_link,
            links.cebraspe_link,
            links.fgv_link,
            links.tip,
            now,
        ],
    )?;
    debug!(subject = name, order, "created subject");

    Ok((
        Subject {
            id: conn.last_insert_rowid(),
            discipline_id,
            name: name.to_string(),
            order,
            active: true,
            summary_link: links.summary_link.clone(),
            cebraspe_link: links.cebraspe_link.clone(),
            fgv_link: links.fgv_link.clone(),
            tip: links.tip.clone(),
            created_at: now,
            updated_at: now,
        },
        true,
    ))
}

/// Overwrite the four matrix fields of a subject.
pub fn update_subject_links(
    conn: &Connection,
    subject_id: i64,
    links: &SubjectLinks,
) -> MapaResult<()> {
    conn.execute(
        "UPDATE subjects
            SET summary_link = ?2, cebraspe_link = ?3, fgv_link = ?4, tip = ?5, updated_at = ?6
          WHERE id = ?1",
        params![
            subject_id,
            links.summary_link,
            links.cebraspe_link,
            links.fgv_link,
            links.tip,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub fn find_sub_subject(
    conn: &Connection,
    subject_id: i64,
    name: &str,
) -> MapaResult<Option<SubSubject>> {
    let sql = format!(
        "SELECT {} FROM sub_subjects WHERE subject_id = ?1 AND name = ?2",
        SUB_SUBJECT_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![subject_id, name], sub_subject_from_row)
        .optional()?)
}

pub fn get_sub_subject(conn: &Connection, id: i64) -> MapaResult<Option<SubSubject>> {
    let sql = format!("SELECT {} FROM sub_subjects WHERE id = ?1", SUB_SUBJECT_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], sub_subject_from_row)
        .optional()?)
}

pub fn get_or_create_sub_subject(
    conn: &Connection,
    subject_id: i64,
    name: &str,
    order: u32,
) -> MapaResult<(SubSubject, bool)> {
    if let Some(existing) = find_sub_subject(conn, subject_id, name)? {
        return Ok((existing, false));
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO sub_subjects (subject_id, name, sort_order, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?4)",
        params![subject_id, name, order, now],
    )?;
    debug!(sub_subject = name, order, "created sub-subject");

    Ok((
        SubSubject {
            id: conn.last_insert_rowid(),
            subject_id,
            name: name.to_string(),
            order,
            active: true,
            created_at: now,
            updated_at: now,
        },
        true,
    ))
}

/// Delete every sub-subject, subject and discipline, in that order.
pub fn clear_matrix(conn: &Connection) -> MapaResult<MatrixCounts> {
    let sub_subjects = conn.execute("DELETE FROM sub_subjects", [])?;
    let subjects = conn.execute("DELETE FROM subjects", [])?;
    let disciplines = conn.execute("DELETE FROM disciplines", [])?;
    Ok(MatrixCounts {
        disciplines,
        subjects,
        sub_subjects,
    })
}

pub fn matrix_counts(conn: &Connection) -> MapaResult<MatrixCounts> {
    let count = |table: &str| -> MapaResult<usize> {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get(0)
        })?;
        Ok(n as usize)
    };
    Ok(MatrixCounts {
        disciplines: count("disciplines")?,
        subjects: count("subjects")?,
        sub_subjects: count("sub_subjects")?,
    })
}

/// The whole matrix, disciplines by (order, name) with nested subjects and
/// sub-subjects in the same ordering.
pub fn matrix_tree(conn: &Connection) -> MapaResult<Vec<DisciplineNode>> {
    let sql = format!(
        "SELECT {} FROM sub_subjects ORDER BY subject_id, sort_order, name",
        SUB_SUBJECT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut sub_by_subject: HashMap<i64, Vec<SubSubject>> = HashMap::new();
    for sub in stmt.query_map([], sub_subject_from_row)? {
        let sub = sub?;
        sub_by_subject.entry(sub.subject_id).or_default().push(sub);
    }

    let sql = format!(
        "SELECT {} FROM subjects ORDER BY discipline_id, sort_order, name",
        SUBJECT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut subjects_by_discipline: HashMap<i64, Vec<SubjectNode>> = HashMap::new();
    for subject in stmt.query_map([], subject_from_row)? {
        let subject = subject?;
        let sub_subjects = sub_by_subject.remove(&subject.id).unwrap_or_default();
        subjects_by_discipline
            .entry(subject.discipline_id)
            .or_default()
            .push(SubjectNode {
                subject,
                sub_subjects,
            });
    }

    let sql = format!(
        "SELECT {} FROM disciplines ORDER BY sort_order, name",
        DISCIPLINE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let disciplines = stmt
        .query_map([], discipline_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(disciplines
        .into_iter()
        .map(|discipline| {
            let subjects = subjects_by_discipline
                .remove(&discipline.id)
                .unwrap_or_default();
            DisciplineNode {
                discipline,
                subjects,
            }
        })
        .collect())
}
