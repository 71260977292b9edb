use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FieldErrors, MapaError, MapaResult};

/// Maximum length (in characters) of tips, references and links.
pub const MAX_TEXT_LEN: usize = 500;

/// Maximum length of a contest short code.
pub const MAX_CODE_LEN: usize = 50;

/// Upper bound (exclusive) for the decimal time estimates: six digits, two decimals.
pub const MAX_MINUTES: f64 = 10_000.0;

//==============================================================================
// Subject Matrix
//==============================================================================

/// Top-level subject-matter category, one per imported sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discipline {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "ordem")]
    pub order: u32,
    #[serde(rename = "ativa")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A topic within a discipline, with the reference links and tip imported from the matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub id: i64,
    #[serde(rename = "disciplina")]
    pub discipline_id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "ordem")]
    pub order: u32,
    #[serde(rename = "ativo")]
    pub active: bool,
    /// "Aula dos Resumos OneNote"
    #[serde(rename = "link_resumos")]
    pub summary_link: String,
    /// "Caderno TEC Concursos - Cebraspe"
    #[serde(rename = "link_questoes_cebraspe")]
    pub cebraspe_link: String,
    /// "Caderno de Questões FGV"
    #[serde(rename = "link_questoes_fgv")]
    pub fgv_link: String,
    #[serde(rename = "dica")]
    pub tip: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The four matrix fields carried by a subject row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectLinks {
    pub summary_link: String,
    pub cebraspe_link: String,
    pub fgv_link: String,
    pub tip: String,
}

impl Subject {
    pub fn links(&self) -> SubjectLinks {
        SubjectLinks {
            summary_link: self.summary_link.clone(),
            cebraspe_link: self.cebraspe_link.clone(),
            fgv_link: self.fgv_link.clone(),
            tip: self.tip.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubSubject {
    pub id: i64,
    #[serde(rename = "assunto")]
    pub subject_id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "ordem")]
    pub order: u32,
    #[serde(rename = "ativo")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subject with its sub-subjects, as listed by [`crate::store::Store::matrix_tree`]
#[derive(Debug, Clone, Serialize)]
pub struct SubjectNode {
    #[serde(flatten)]
    pub subject: Subject,
    #[serde(rename = "subassuntos")]
    pub sub_subjects: Vec<SubSubject>,
}

/// A discipline with its subjects
#[derive(Debug, Clone, Serialize)]
pub struct DisciplineNode {
    #[serde(flatten)]
    pub discipline: Discipline,
    #[serde(rename = "assuntos")]
    pub subjects: Vec<SubjectNode>,
}

/// Row counts of the three matrix tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatrixCounts {
    pub disciplines: usize,
    pub subjects: usize,
    pub sub_subjects: usize,
}

//==============================================================================
// Contests
//==============================================================================

/// Contest kind: undergraduate or postgraduate level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContestKind {
    #[default]
    #[serde(rename = "GRAD")]
    Undergraduate,
    #[serde(rename = "POS")]
    Postgraduate,
}

impl ContestKind {
    /// Stored code
    pub fn as_str(&self) -> &'static str {
        match self {
            ContestKind::Undergraduate => "GRAD",
            ContestKind::Postgraduate => "POS",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ContestKind::Undergraduate => "Graduação",
            ContestKind::Postgraduate => "Pós-graduação",
        }
    }
}

impl FromStr for ContestKind {
    type Err = MapaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GRAD" => Ok(ContestKind::Undergraduate),
            "POS" => Ok(ContestKind::Postgraduate),
            other => Err(MapaError::Validation(format!(
                "tipo: '{}' is not one of GRAD, POS",
                other
            ))),
        }
    }
}

impl fmt::Display for ContestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An exam for which a study map is built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contest {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    /// Short code ("sigla"); names the export sheet and download file
    #[serde(rename = "sigla")]
    pub code: String,
    #[serde(rename = "ordem")]
    pub order: u32,
    #[serde(rename = "tipo")]
    pub kind: ContestKind,
    #[serde(rename = "cursinho")]
    pub course: String,
    #[serde(rename = "ativo")]
    pub active: bool,
    #[serde(rename = "criado_por")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`crate::store::Store::create_contest`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewContest {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "sigla")]
    pub code: String,
    #[serde(rename = "ordem", default)]
    pub order: u32,
    #[serde(rename = "tipo", default)]
    pub kind: ContestKind,
    #[serde(rename = "cursinho", default)]
    pub course: String,
    #[serde(rename = "criado_por", default)]
    pub created_by: Option<String>,
}

impl NewContest {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MapaResult<()> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.add("nome", "obrigatório");
        }
        if self.code.trim().is_empty() {
            errors.add("sigla", "obrigatória");
        }
        if self.code.chars().count() > MAX_CODE_LEN {
            errors.add("sigla", format!("Máximo de {} caracteres", MAX_CODE_LEN));
        }
        errors.into_result()
    }
}

//==============================================================================
// Study Map
//==============================================================================

/// One line of a contest's study plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyMapEntry {
    pub id: i64,
    #[serde(rename = "concurso")]
    pub contest_id: i64,
    #[serde(rename = "assunto")]
    pub subject_id: Option<i64>,
    #[serde(rename = "subassunto")]
    pub sub_subject_id: Option<i64>,
    #[serde(rename = "ordem")]
    pub order: u32,
    #[serde(rename = "item_edital")]
    pub edital_item: String,
    #[serde(rename = "extra_cursinho")]
    pub is_extra: bool,
    #[serde(rename = "nome_extra")]
    pub extra_name: String,
}

/// Input for [`crate::store::Store::add_entry`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEntry {
    pub subject_id: Option<i64>,
    pub sub_subject_id: Option<i64>,
    pub order: u32,
    pub edital_item: String,
    pub is_extra: bool,
    pub extra_name: String,
}

impl NewEntry {
    /// Entry referencing a matrix subject (and optionally one of its sub-subjects)
    pub fn subject(subject_id: i64, sub_subject_id: Option<i64>, order: u32) -> Self {
        Self {
            subject_id: Some(subject_id),
            sub_subject_id,
            order,
            ..Self::default()
        }
    }

    /// Free-text entry that is not part of the matrix
    pub fn extra(name: impl Into<String>, order: u32) -> Self {
        Self {
            is_extra: true,
            extra_name: name.into(),
            order,
            ..Self::default()
        }
    }

    pub fn with_edital_item(mut self, item: impl Into<String>) -> Self {
        self.edital_item = item.into();
        self
    }

    /// Checks the extra/subject invariants. Sub-subject ownership needs the
    /// store and is checked there.
    pub fn validate(&self) -> MapaResult<()> {
        let mut errors = FieldErrors::new();
        if self.is_extra && self.extra_name.trim().is_empty() {
            errors.add("nome_extra", "Assuntos extras devem ter um nome definido");
        }
        if !self.is_extra && self.subject_id.is_none() {
            errors.add(
                "assunto",
                "Assuntos não-extras devem estar vinculados a um assunto da matriz",
            );
        }
        if self.sub_subject_id.is_some() && self.subject_id.is_none() {
            errors.add("subassunto", "Subassunto exige um assunto");
        }
        errors.into_result()
    }
}

/// How relevant a subject is for a particular contest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relevance {
    #[serde(rename = "muito_alta")]
    VeryHigh,
    #[serde(rename = "alta")]
    High,
    #[default]
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "baixa")]
    Low,
    #[serde(rename = "muito_baixa")]
    VeryLow,
}

impl Relevance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relevance::VeryHigh => "muito_alta",
            Relevance::High => "alta",
            Relevance::Medium => "media",
            Relevance::Low => "baixa",
            Relevance::VeryLow => "muito_baixa",
        }
    }
}

impl FromStr for Relevance {
    type Err = MapaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "muito_alta" => Ok(Relevance::VeryHigh),
            "alta" => Ok(Relevance::High),
            "media" => Ok(Relevance::Medium),
            "baixa" => Ok(Relevance::Low),
            "muito_baixa" => Ok(Relevance::VeryLow),
            other => Err(MapaError::Validation(format!(
                "relevancia: '{}' is not a known relevance",
                other
            ))),
        }
    }
}

/// Per-entry planning attributes in the Tutory partner format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudyMetadata {
    #[serde(rename = "paginas_minutos")]
    pub pages_or_minutes: u32,
    #[serde(rename = "minutos_expresso")]
    pub minutes_express: f64,
    #[serde(rename = "minutos_regular")]
    pub minutes_regular: f64,
    #[serde(rename = "minutos_calma")]
    pub minutes_calm: f64,
    #[serde(rename = "dica")]
    pub tip: String,
    #[serde(rename = "dica_revisoes")]
    pub review_tip: String,
    #[serde(rename = "dica_questoes")]
    pub questions_tip: String,
    #[serde(rename = "referencia")]
    pub reference: String,
    #[serde(rename = "peso_resumos")]
    pub summary_weight: u8,
    #[serde(rename = "peso_revisoes")]
    pub review_weight: u8,
    #[serde(rename = "peso_questoes")]
    pub questions_weight: u8,
    #[serde(rename = "numero_questoes")]
    pub question_count: u32,
    #[serde(rename = "link_estudo")]
    pub study_link: String,
    #[serde(rename = "link_resumo")]
    pub summary_link: String,
    #[serde(rename = "link_questoes")]
    pub questions_link: String,
    #[serde(rename = "link_pdf")]
    pub pdf_link: String,
    #[serde(rename = "link_video")]
    pub video_link: String,
    #[serde(rename = "link_direcao")]
    pub direction_link: String,
    #[serde(rename = "relevancia")]
    pub relevance: Relevance,
    #[serde(rename = "suplementar")]
    pub supplementary: bool,
}

impl Default for StudyMetadata {
    fn default() -> Self {
        Self {
            pages_or_minutes: 0,
            minutes_express: 0.0,
            minutes_regular: 0.0,
            minutes_calm: 0.0,
            tip: String::new(),
            review_tip: String::new(),
            questions_tip: String::new(),
            reference: String::new(),
            summary_weight: 1,
            review_weight: 1,
            questions_weight: 1,
            question_count: 0,
            study_link: String::new(),
            summary_link: String::new(),
            questions_link: String::new(),
            pdf_link: String::new(),
            video_link: String::new(),
            direction_link: String::new(),
            relevance: Relevance::Medium,
            supplementary: false,
        }
    }
}

impl StudyMetadata {
    /// Supplementary flag as the partner format expects it
    pub fn supplementary_flag(&self) -> u8 {
        u8::from(self.supplementary)
    }

    pub fn validate(&self) -> MapaResult<()> {
        let mut errors = FieldErrors::new();

        let texts = [
            ("dica", &self.tip),
            ("dica_revisoes", &self.review_tip),
            ("dica_questoes", &self.questions_tip),
            ("referencia", &self.reference),
            ("link_estudo", &self.study_link),
            ("link_resumo", &self.summary_link),
            ("link_questoes", &self.questions_link),
            ("link_pdf", &self.pdf_link),
            ("link_video", &self.video_link),
            ("link_direcao", &self.direction_link),
        ];
        for (field, value) in texts {
            if value.chars().count() > MAX_TEXT_LEN {
                errors.add(field, format!("Máximo de {} caracteres", MAX_TEXT_LEN));
            }
        }

        let weights = [
            ("peso_resumos", self.summary_weight),
            ("peso_revisoes", self.review_weight),
            ("peso_questoes", self.questions_weight),
        ];
        for (field, weight) in weights {
            if !(1..=4).contains(&weight) {
                errors.add(field, "Peso deve ser 1, 2, 3 ou 4");
            }
        }

        let minutes = [
            ("minutos_expresso", self.minutes_express),
            ("minutos_regular", self.minutes_regular),
            ("minutos_calma", self.minutes_calm),
        ];
        for (field, value) in minutes {
            if !value.is_finite() || !(0.0..MAX_MINUTES).contains(&value) {
                errors.add(field, "Valor deve estar entre 0 e 9999.99");
            }
        }

        errors.into_result()
    }

    /// Time estimates rounded to the two stored decimal places.
    pub fn normalized(mut self) -> Self {
        self.minutes_express = round_cents(self.minutes_express);
        self.minutes_regular = round_cents(self.minutes_regular);
        self.minutes_calm = round_cents(self.minutes_calm);
        self
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One study-map entry joined with the matrix names and metadata it exports
#[derive(Debug, Clone, PartialEq)]
pub struct StudyMapRow {
    pub entry_id: i64,
    pub order: u32,
    pub is_extra: bool,
    pub extra_name: String,
    pub discipline_name: Option<String>,
    pub subject_name: Option<String>,
    pub sub_subject_name: Option<String>,
    pub metadata: Option<StudyMetadata>,
}

impl StudyMapRow {
    /// Extra name, `"<subject> - <sub-subject>"`, or the subject name
    pub fn display_name(&self) -> String {
        if self.is_extra {
            return self.extra_name.clone();
        }
        match (&self.subject_name, &self.sub_subject_name) {
            (Some(subject), Some(sub)) => format!("{} - {}", subject, sub),
            (Some(subject), None) => subject.clone(),
            (None, _) => String::new(),
        }
    }
}
