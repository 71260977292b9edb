//! Row decoding and SQL conversions for the domain enums.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;

use crate::types::{
    Contest, ContestKind, Discipline, Relevance, StudyMapEntry, StudyMetadata, SubSubject, Subject,
};

impl ToSql for ContestKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ContestKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Relevance {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Relevance {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

pub(crate) const DISCIPLINE_COLUMNS: &str =
    "id, name, sort_order, active, created_at, updated_at";

pub(crate) const SUBJECT_COLUMNS: &str = "id, discipline_id, name, sort_order, active, \
     summary_link, cebraspe_link, fgv_link, tip, created_at, updated_at";

pub(crate) const SUB_SUBJECT_COLUMNS: &str =
    "id, subject_id, name, sort_order, active, created_at, updated_at";

pub(crate) const CONTEST_COLUMNS: &str =
    "id, name, code, sort_order, kind, course, active, created_by, created_at, updated_at";

pub(crate) const ENTRY_COLUMNS: &str =
    "id, contest_id, subject_id, sub_subject_id, sort_order, edital_item, is_extra, extra_name";

/// Metadata columns qualified with the `m` alias used by every metadata query.
pub(crate) const METADATA_COLUMNS: &str = "m.id AS metadata_id, m.pages_or_minutes, \
     m.minutes_express, m.minutes_regular, m.minutes_calm, m.tip, m.review_tip, \
     m.questions_tip, m.reference, m.summary_weight, m.review_weight, m.questions_weight, \
     m.question_count, m.study_link, m.summary_link, m.questions_link, m.pdf_link, \
     m.video_link, m.direction_link, m.relevance, m.supplementary";

pub(crate) fn discipline_from_row(row: &Row<'_>) -> rusqlite::Result<Discipline> {
    Ok(Discipline {
        id: row.get("id")?,
        name: row.get("name")?,
        order: row.get("sort_order")?,
        active: row.get("active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn subject_from_row(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get("id")?,
        discipline_id: row.get("discipline_id")?,
        name: row.get("name")?,
        order: row.get("sort_order")?,
        active: row.get("active")?,
        summary_link: row.get("summary_link")?,
        cebraspe_link: row.get("cebraspe_link")?,
        fgv_link: row.get("fgv_link")?,
        tip: row.get("tip")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn sub_subject_from_row(row: &Row<'_>) -> rusqlite::Result<SubSubject> {
    Ok(SubSubject {
        id: row.get("id")?,
        subject_id: row.get("subject_id")?,
        name: row.get("name")?,
        order: row.get("sort_order")?,
        active: row.get("active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn contest_from_row(row: &Row<'_>) -> rusqlite::Result<Contest> {
    Ok(Contest {
        id: row.get("id")?,
        name: row.get("name")?,
        code: row.get("code")?,
        order: row.get("sort_order")?,
        kind: row.get("kind")?,
        course: row.get("course")?,
        active: row.get("active")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<StudyMapEntry> {
    Ok(StudyMapEntry {
        id: row.get("id")?,
        contest_id: row.get("contest_id")?,
        subject_id: row.get("subject_id")?,
        sub_subject_id: row.get("sub_subject_id")?,
        order: row.get("sort_order")?,
        edital_item: row.get("edital_item")?,
        is_extra: row.get("is_extra")?,
        extra_name: row.get("extra_name")?,
    })
}

/// Decodes [`METADATA_COLUMNS`]; `None` when the left join found no metadata row.
pub(crate) fn metadata_from_row(row: &Row<'_>) -> rusqlite::Result<Option<StudyMetadata>> {
    let id: Option<i64> = row.get("metadata_id")?;
    if id.is_none() {
        return Ok(None);
    }
    Ok(Some(StudyMetadata {
        pages_or_minutes: row.get("pages_or_minutes")?,
        minutes_express: row.get("minutes_express")?,
        minutes_regular: row.get("minutes_regular")?,
        minutes_calm: row.get("minutes_calm")?,
        tip: row.get("tip")?,
        review_tip: row.get("review_tip")?,
        questions_tip: row.get("questions_tip")?,
        reference: row.get("reference")?,
        summary_weight: row.get("summary_weight")?,
        review_weight: row.get("review_weight")?,
        questions_weight: row.get("questions_weight")?,
        question_count: row.get("question_count")?,
        study_link: row.get("study_link")?,
        summary_link: row.get("summary_link")?,
        questions_link: row.get("questions_link")?,
        pdf_link: row.get("pdf_link")?,
        video_link: row.get("video_link")?,
        direction_link: row.get("direction_link")?,
        relevance: row.get("relevance")?,
        supplementary: row.get("supplementary")?,
    }))
}
