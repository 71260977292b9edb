//! Contest, study-map entry and metadata queries.

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension as _};
use tracing::debug;

use super::encode::{
    contest_from_row, entry_from_row, metadata_from_row, CONTEST_COLUMNS, ENTRY_COLUMNS,
    METADATA_COLUMNS,
};
use super::matrix;
use crate::error::{MapaError, MapaResult};
use crate::types::{Contest, NewContest, NewEntry, StudyMapEntry, StudyMapRow, StudyMetadata};

/// Map a uniqueness violation to a validation error carrying `message`.
fn unique_violation(err: rusqlite::Error, message: &str) -> MapaError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            MapaError::Validation(message.to_string())
        }
        _ => MapaError::Database(err),
    }
}

pub fn create_contest(conn: &Connection, new: &NewContest) -> MapaResult<Contest> {
    new.validate()?;

    let now = Utc::now();
    conn.execute(
        "INSERT INTO contests (
             name, code, sort_order, kind, course, active, created_by, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?7)",
        params![
            new.name,
            new.code,
            new.order,
            new.kind,
            new.course,
            new.created_by,
            now
        ],
    )
    .map_err(|e| {
        unique_violation(e, &format!("concurso '{}' ({}) já existe", new.name, new.code))
    })?;
    debug!(contest = %new.name, code = %new.code, "created contest");

    Ok(Contest {
        id: conn.last_insert_rowid(),
        name: new.name.clone(),
        code: new.code.clone(),
        order: new.order,
        kind: new.kind,
        course: new.course.clone(),
        active: true,
        created_by: new.created_by.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_contest(conn: &Connection, id: i64) -> MapaResult<Contest> {
    let sql = format!("SELECT {} FROM contests WHERE id = ?1", CONTEST_COLUMNS);
    conn.query_row(&sql, params![id], contest_from_row)
        .optional()?
        .ok_or_else(|| MapaError::NotFound(format!("concurso {}", id)))
}

/// The most recently created contest with the given short code.
pub fn find_contest_by_code(conn: &Connection, code: &str) -> MapaResult<Option<Contest>> {
    let sql = format!(
        "SELECT {} FROM contests WHERE code = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
        CONTEST_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![code], contest_from_row)
        .optional()?)
}

/// All contests by display order, newest first within the same order.
pub fn list_contests(conn: &Connection) -> MapaResult<Vec<Contest>> {
    let sql = format!(
        "SELECT {} FROM contests ORDER BY sort_order, created_at DESC, id DESC",
        CONTEST_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let contests = stmt
        .query_map([], contest_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(contests)
}

/// Add a study-map entry to a contest.
///
/// Enforces the extra/subject invariants and that a referenced sub-subject
/// belongs to the referenced subject.
pub fn add_entry(conn: &Connection, contest_id: i64, new: &NewEntry) -> MapaResult<StudyMapEntry> {
    new.validate()?;
    get_contest(conn, contest_id)?;

    if let Some(subject_id) = new.subject_id {
        if matrix::get_subject(conn, subject_id)?.is_none() {
            return Err(MapaError::Validation(format!(
                "assunto: {} não existe",
                subject_id
            )));
        }
    }
    if let Some(sub_id) = new.sub_subject_id {
        let sub = matrix::get_sub_subject(conn, sub_id)?.ok_or_else(|| {
            MapaError::Validation(format!("subassunto: {} não existe", sub_id))
        })?;
        if Some(sub.subject_id) != new.subject_id {
            return Err(MapaError::Validation(format!(
                "subassunto: '{}' não pertence ao assunto informado",
                sub.name
            )));
        }
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO study_map_entries (
             contest_id, subject_id, sub_subject_id, sort_order,
             edital_item, is_extra, extra_name, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            contest_id,
            new.subject_id,
            new.sub_subject_id,
            new.order,
            new.edital_item,
            new.is_extra,
            new.extra_name,
            now,
        ],
    )
    .map_err(|e| unique_violation(e, "assunto já está no mapa deste concurso"))?;

    Ok(StudyMapEntry {
        id: conn.last_insert_rowid(),
        contest_id,
        subject_id: new.subject_id,
        sub_subject_id: new.sub_subject_id,
        order: new.order,
        edital_item: new.edital_item.clone(),
        is_extra: new.is_extra,
        extra_name: new.extra_name.clone(),
    })
}

pub fn list_entries(conn: &Connection, contest_id: i64) -> MapaResult<Vec<StudyMapEntry>> {
    let sql = format!(
        "SELECT {} FROM study_map_entries WHERE contest_id = ?1 ORDER BY sort_order, id",
        ENTRY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params![contest_id], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Create or replace the metadata of an entry after validating it.
pub fn set_metadata(conn: &Connection, entry_id: i64, metadata: &StudyMetadata) -> MapaResult<()> {
    metadata.validate()?;
    let m = metadata.clone().normalized();

    let exists = conn
        .query_row(
            "SELECT 1 FROM study_map_entries WHERE id = ?1",
            params![entry_id],
            |_| Ok(()),
        )
        .optional()?;
    if exists.is_none() {
        return Err(MapaError::NotFound(format!("item do mapa {}", entry_id)));
    }

    conn.execute(
        "INSERT INTO study_metadata (
             entry_id, pages_or_minutes, minutes_express, minutes_regular, minutes_calm,
             tip, review_tip, questions_tip, reference,
             summary_weight, review_weight, questions_weight, question_count,
             study_link, summary_link, questions_link, pdf_link, video_link, direction_link,
             relevance, supplementary, created_at, updated_at
         ) VALUES (
             ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
             ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?22
         )
         ON CONFLICT (entry_id) DO UPDATE SET
             pages_or_minutes = excluded.pages_or_minutes,
             minutes_express  = excluded.minutes_express,
             minutes_regular  = excluded.minutes_regular,
             minutes_calm     = excluded.minutes_calm,
             tip              = excluded.tip,
             review_tip       = excluded.review_tip,
             questions_tip    = excluded.questions_tip,
             reference        = excluded.reference,
             summary_weight   = excluded.summary_weight,
             review_weight    = excluded.review_weight,
             questions_weight = excluded.questions_weight,
             question_count   = excluded.question_count,
             study_link       = excluded.study_link,
             summary_link     = excluded.summary_link,
             questions_link   = excluded.questions_link,
             pdf_link         = excluded.pdf_link,
             video_link       = excluded.video_link,
             direction_link   = excluded.direction_link,
             relevance        = excluded.relevance,
             supplementary    = excluded.supplementary,
             updated_at       = excluded.updated_at",
        params![
            entry_id,
            m.pages_or_minutes,
            m.minutes_express,
            m.minutes_regular,
            m.minutes_calm,
            m.tip,
            m.review_tip,
            m.questions_tip,
            m.reference,
            m.summary_weight,
            m.review_weight,
            m.questions_weight,
            m.question_count,
            m.study_link,
            m.summary_link,
            m.questions_link,
            m.pdf_link,
            m.video_link,
            m.direction_link,
            m.relevance,
            m.supplementary,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub fn get_metadata(conn: &Connection, entry_id: i64) -> MapaResult<Option<StudyMetadata>> {
    let sql = format!(
        "SELECT {} FROM study_metadata m WHERE m.entry_id = ?1",
        METADATA_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![entry_id], metadata_from_row)
        .optional()?
        .flatten())
}

/// Copy a contest with all of its entries and their metadata.
///
/// The copy keeps the short code; its name defaults to `"<name> (Cópia)"`.
/// Callers wrap this in a transaction.
pub fn duplicate_contest(
    conn: &Connection,
    contest_id: i64,
    new_name: Option<&str>,
) -> MapaResult<Contest> {
    let source = get_contest(conn, contest_id)?;
    let name = match new_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{} (Cópia)", source.name),
    };

    let copy = create_contest(
        conn,
        &NewContest {
            name,
            code: source.code.clone(),
            order: source.order,
            kind: source.kind,
            course: source.course.clone(),
            created_by: source.created_by.clone(),
        },
    )?;

    for entry in list_entries(conn, contest_id)? {
        let new_entry = add_entry(
            conn,
            copy.id,
            &NewEntry {
                subject_id: entry.subject_id,
                sub_subject_id: entry.sub_subject_id,
                order: entry.order,
                edital_item: entry.edital_item.clone(),
                is_extra: entry.is_extra,
                extra_name: entry.extra_name.clone(),
            },
        )?;
        if let Some(metadata) = get_metadata(conn, entry.id)? {
            set_metadata(conn, new_entry.id, &metadata)?;
        }
    }

    debug!(from = contest_id, to = copy.id, "duplicated contest");
    Ok(copy)
}

/// One contest's entries joined with matrix names and metadata, in export order.
pub fn study_map_rows(conn: &Connection, contest_id: i64) -> MapaResult<Vec<StudyMapRow>> {
    let sql = format!(
        "SELECT e.id AS entry_id, e.sort_order, e.is_extra, e.extra_name,
                d.name AS discipline_name,
                s.name AS subject_name,
                ss.name AS sub_subject_name,
                {}
           FROM study_map_entries e
           LEFT JOIN subjects s      ON s.id = e.subject_id
           LEFT JOIN disciplines d   ON d.id = s.discipline_id
           LEFT JOIN sub_subjects ss ON ss.id = e.sub_subject_id
           LEFT JOIN study_metadata m ON m.entry_id = e.id
          WHERE e.contest_id = ?1
          ORDER BY e.sort_order, e.id",
        METADATA_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![contest_id], |row| {
            Ok(StudyMapRow {
                entry_id: row.get("entry_id")?,
                order: row.get("sort_order")?,
                is_extra: row.get("is_extra")?,
                extra_name: row.get("extra_name")?,
                discipline_name: row.get("discipline_name")?,
                subject_name: row.get("subject_name")?,
                sub_subject_name: row.get("sub_subject_name")?,
                metadata: metadata_from_row(row)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
