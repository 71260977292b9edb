//! SQL schema for the study-map store.
//!
//! Applied at every open; `CREATE ... IF NOT EXISTS` keeps it idempotent.
//! The version is stamped in `PRAGMA user_version`; a store written by a newer
//! schema is refused at open.

/// Version stamped into `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS disciplines (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL UNIQUE,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    discipline_id  INTEGER NOT NULL REFERENCES disciplines(id) ON DELETE CASCADE,
    name           TEXT    NOT NULL,
    sort_order     INTEGER NOT NULL DEFAULT 0,
    active         INTEGER NOT NULL DEFAULT 1,
    summary_link   TEXT    NOT NULL DEFAULT '',
    cebraspe_link  TEXT    NOT NULL DEFAULT '',
    fgv_link       TEXT    NOT NULL DEFAULT '',
    tip            TEXT    NOT NULL DEFAULT '',
    created_at     TEXT    NOT NULL,
    updated_at     TEXT    NOT NULL,
    UNIQUE (discipline_id, name)
);

CREATE TABLE IF NOT EXISTS sub_subjects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id  INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    name        TEXT    NOT NULL,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL,
    UNIQUE (subject_id, name)
);

CREATE TABLE IF NOT EXISTS contests (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    code        TEXT    NOT NULL,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    kind        TEXT    NOT NULL DEFAULT 'GRAD' CHECK (kind IN ('GRAD', 'POS')),
    course      TEXT    NOT NULL DEFAULT '',
    active      INTEGER NOT NULL DEFAULT 1,
    created_by  TEXT,
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL,
    UNIQUE (name, code)
);

CREATE TABLE IF NOT EXISTS study_map_entries (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    contest_id      INTEGER NOT NULL REFERENCES contests(id) ON DELETE CASCADE,
    subject_id      INTEGER REFERENCES subjects(id) ON DELETE CASCADE,
    sub_subject_id  INTEGER REFERENCES sub_subjects(id) ON DELETE CASCADE,
    sort_order      INTEGER NOT NULL DEFAULT 0,
    edital_item     TEXT    NOT NULL DEFAULT '',
    is_extra        INTEGER NOT NULL DEFAULT 0,
    extra_name      TEXT    NOT NULL DEFAULT '',
    created_at      TEXT    NOT NULL,
    updated_at      TEXT    NOT NULL,
    UNIQUE (contest_id, subject_id, sub_subject_id)
);

-- One-to-one with study_map_entries.
CREATE TABLE IF NOT EXISTS study_metadata (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id          INTEGER NOT NULL UNIQUE REFERENCES study_map_entries(id) ON DELETE CASCADE,
    pages_or_minutes  INTEGER NOT NULL DEFAULT 0,
    minutes_express   REAL    NOT NULL DEFAULT 0,
    minutes_regular   REAL    NOT NULL DEFAULT 0,
    minutes_calm      REAL    NOT NULL DEFAULT 0,
    tip               TEXT    NOT NULL DEFAULT '',
    review_tip        TEXT    NOT NULL DEFAULT '',
    questions_tip     TEXT    NOT NULL DEFAULT '',
    reference         TEXT    NOT NULL DEFAULT '',
    summary_weight    INTEGER NOT NULL DEFAULT 1 CHECK (summary_weight BETWEEN 1 AND 4),
    review_weight     INTEGER NOT NULL DEFAULT 1 CHECK (review_weight BETWEEN 1 AND 4),
    questions_weight  INTEGER NOT NULL DEFAULT 1 CHECK (questions_weight BETWEEN 1 AND 4),
    question_count    INTEGER NOT NULL DEFAULT 0,
    study_link        TEXT    NOT NULL DEFAULT '',
    summary_link      TEXT    NOT NULL DEFAULT '',
    questions_link    TEXT    NOT NULL DEFAULT '',
    pdf_link          TEXT    NOT NULL DEFAULT '',
    video_link        TEXT    NOT NULL DEFAULT '',
    direction_link    TEXT    NOT NULL DEFAULT '',
    relevance         TEXT    NOT NULL DEFAULT 'media',
    supplementary     INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT    NOT NULL,
    updated_at        TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS subjects_discipline_idx  ON subjects(discipline_id);
CREATE INDEX IF NOT EXISTS sub_subjects_subject_idx ON sub_subjects(subject_id);
CREATE INDEX IF NOT EXISTS entries_contest_idx      ON study_map_entries(contest_id, sort_order);
";
