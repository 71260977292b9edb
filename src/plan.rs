//! Study-plan documents
//!
//! A YAML file describing one contest and its ordered study map, resolved
//! against the imported subject matrix:
//!
//! ```yaml
//! concurso:
//!   nome: TRF 1ª Região 2025
//!   sigla: TRF1
//!   tipo: GRAD
//! mapa:
//!   - disciplina: Direito Constitucional
//!     assunto: Direitos Fundamentais
//!     subassunto: Direitos Individuais
//!     item_edital: "1.2"
//!     metadados:
//!       peso_questoes: 3
//!   - extra: Simulado final
//! ```

use std::path::Path;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::error::{MapaError, MapaResult};
use crate::store::{contests, matrix, Store};
use crate::types::{Contest, NewContest, NewEntry, StudyMetadata};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDocument {
    #[serde(rename = "concurso")]
    pub contest: NewContest,
    #[serde(rename = "mapa", default)]
    pub entries: Vec<PlanEntry>,
}

/// What a study-map line points at
#[derive(Debug, Clone, PartialEq)]
pub enum PlanTarget {
    /// Free-text item outside the matrix
    Extra(String),
    /// Matrix reference, resolved by name at load time
    Subject {
        discipline: String,
        subject: String,
        sub_subject: Option<String>,
    },
}

/// One study-map line: a matrix reference or a free-text extra
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawPlanEntry")]
pub struct PlanEntry {
    pub target: PlanTarget,
    pub edital_item: String,
    pub order: Option<u32>,
    pub metadata: Option<StudyMetadata>,
}

/// Entry as written in YAML; both forms share one key set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlanEntry {
    #[serde(default)]
    extra: Option<String>,
    #[serde(rename = "disciplina", default)]
    discipline: Option<String>,
    #[serde(rename = "assunto", default)]
    subject: Option<String>,
    #[serde(rename = "subassunto", default)]
    sub_subject: Option<String>,
    #[serde(rename = "item_edital", default)]
    edital_item: String,
    #[serde(rename = "ordem", default)]
    order: Option<u32>,
    #[serde(rename = "metadados", default)]
    metadata: Option<StudyMetadata>,
}

impl TryFrom<RawPlanEntry> for PlanEntry {
    type Error = String;

    fn try_from(raw: RawPlanEntry) -> Result<Self, Self::Error> {
        let target = match (raw.extra, raw.discipline, raw.subject, raw.sub_subject) {
            (Some(extra), None, None, None) => PlanTarget::Extra(extra),
            (Some(_), _, _, _) => {
                return Err(
                    "'extra' não pode ser combinado com 'disciplina', 'assunto' ou 'subassunto'"
                        .to_string(),
                )
            }
            (None, Some(discipline), Some(subject), sub_subject) => PlanTarget::Subject {
                discipline,
                subject,
                sub_subject,
            },
            (None, None, _, _) => {
                return Err("campo 'disciplina' ausente (ou use 'extra')".to_string())
            }
            (None, Some(_), None, _) => return Err("campo 'assunto' ausente".to_string()),
        };

        Ok(PlanEntry {
            target,
            edital_item: raw.edital_item,
            order: raw.order,
            metadata: raw.metadata,
        })
    }
}

/// What a loaded plan created
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub contest: Contest,
    pub entries: usize,
    pub with_metadata: usize,
}

pub fn parse_plan(yaml: &str) -> MapaResult<PlanDocument> {
    Ok(serde_yaml::from_str(yaml)?)
}

pub fn parse_plan_file<P: AsRef<Path>>(path: P) -> MapaResult<PlanDocument> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_plan(&content)
}

/// Create the contest, its entries and their metadata in one transaction.
///
/// Entries are ordered by position (1-based) unless they carry `ordem`.
pub fn apply_plan(store: &mut Store, plan: &PlanDocument) -> MapaResult<PlanSummary> {
    let summary = store.transaction(|tx| {
        let contest = contests::create_contest(tx, &plan.contest)?;
        let mut with_metadata = 0;

        for (idx, entry) in plan.entries.iter().enumerate() {
            let position = idx + 1;
            let order = entry.order.unwrap_or(position as u32);
            let new_entry = resolve_entry(tx, position, entry, order)?;

            let created = contests::add_entry(tx, contest.id, &new_entry)
                .map_err(|e| at_position(position, e))?;
            if let Some(metadata) = &entry.metadata {
                contests::set_metadata(tx, created.id, metadata)
                    .map_err(|e| at_position(position, e))?;
                with_metadata += 1;
            }
        }

        Ok(PlanSummary {
            contest,
            entries: plan.entries.len(),
            with_metadata,
        })
    })?;

    info!(
        contest = %summary.contest.code,
        entries = summary.entries,
        "study plan loaded"
    );
    Ok(summary)
}

fn at_position(position: usize, err: MapaError) -> MapaError {
    match err {
        MapaError::Validation(msg) => MapaError::Validation(format!("mapa[{}]: {}", position, msg)),
        other => other,
    }
}

fn resolve_entry(
    conn: &Connection,
    position: usize,
    entry: &PlanEntry,
    order: u32,
) -> MapaResult<NewEntry> {
    let not_found = |what: String| MapaError::Validation(format!("mapa[{}]: {}", position, what));

    let new_entry = match &entry.target {
        PlanTarget::Extra(name) => NewEntry::extra(name.trim(), order),
        PlanTarget::Subject {
            discipline,
            subject,
            sub_subject,
        } => {
            let found = matrix::find_discipline(conn, discipline)?
                .ok_or_else(|| not_found(format!("disciplina '{}' não encontrada", discipline)))?;
            let found = matrix::find_subject(conn, found.id, subject)?.ok_or_else(|| {
                not_found(format!(
                    "assunto '{}' não encontrado em '{}'",
                    subject, discipline
                ))
            })?;
            let sub_subject_id = match sub_subject {
                Some(name) => {
                    let sub = matrix::find_sub_subject(conn, found.id, name)?.ok_or_else(|| {
                        not_found(format!(
                            "subassunto '{}' não encontrado em '{}'",
                            name, subject
                        ))
                    })?;
                    Some(sub.id)
                }
                None => None,
            };
            NewEntry::subject(found.id, sub_subject_id, order)
        }
    };
    Ok(new_entry.with_edital_item(&entry.edital_item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContestKind;

    const PLAN: &str = r#"
concurso:
  nome: TRF 1ª Região 2025
  sigla: TRF1
  tipo: POS
mapa:
  - disciplina: Português
    assunto: Crase
    item_edital: "2.1"
    metadados:
      peso_questoes: 3
      minutos_regular: 45.5
  - extra: Simulado final
    ordem: 10
"#;

    #[test]
    fn test_parse_plan_entries() {
        let plan = parse_plan(PLAN).unwrap();
        assert_eq!(plan.contest.code, "TRF1");
        assert_eq!(plan.contest.kind, ContestKind::Postgraduate);
        assert_eq!(plan.entries.len(), 2);

        let first = &plan.entries[0];
        assert_eq!(
            first.target,
            PlanTarget::Subject {
                discipline: "Português".to_string(),
                subject: "Crase".to_string(),
                sub_subject: None,
            }
        );
        assert_eq!(first.edital_item, "2.1");
        let meta = first.metadata.as_ref().unwrap();
        assert_eq!(meta.questions_weight, 3);
        assert_eq!(meta.summary_weight, 1);

        let second = &plan.entries[1];
        assert_eq!(second.target, PlanTarget::Extra("Simulado final".to_string()));
        assert_eq!(second.order, Some(10));
    }

    fn plan_error(yaml: &str) -> String {
        match parse_plan(yaml) {
            Err(MapaError::Yaml(e)) => e.to_string(),
            other => panic!("expected YAML error, got {:?}", other.map(|p| p.entries)),
        }
    }

    #[test]
    fn test_misspelled_metadata_key_is_rejected() {
        let err = plan_error(
            r#"
concurso: { nome: TRF, sigla: TRF1 }
mapa:
  - disciplina: Português
    assunto: Crase
    metadados:
      peso_questao: 3
"#,
        );
        assert!(err.contains("peso_questao"), "{}", err);
        assert!(err.contains("line"), "{}", err);
    }

    #[test]
    fn test_misspelled_entry_key_is_rejected() {
        let err = plan_error(
            r#"
concurso: { nome: TRF, sigla: TRF1 }
mapa:
  - disciplina: Português
    assunto: Crase
    sub_assunto: Uso
"#,
        );
        assert!(err.contains("sub_assunto"), "{}", err);
    }

    #[test]
    fn test_extra_mixed_with_subject_is_rejected() {
        let err = plan_error(
            r#"
concurso: { nome: TRF, sigla: TRF1 }
mapa:
  - extra: Simulado
    disciplina: Português
    assunto: Crase
"#,
        );
        assert!(err.contains("'extra' não pode ser combinado"), "{}", err);
    }

    #[test]
    fn test_entry_without_extra_or_subject_is_rejected() {
        let err = plan_error(
            r#"
concurso: { nome: TRF, sigla: TRF1 }
mapa:
  - disciplina: Português
"#,
        );
        assert!(err.contains("campo 'assunto' ausente"), "{}", err);

        let err = plan_error(
            r#"
concurso: { nome: TRF, sigla: TRF1 }
mapa:
  - item_edital: "1.1"
"#,
        );
        assert!(err.contains("campo 'disciplina' ausente"), "{}", err);
    }

    #[test]
    fn test_bad_weight_type_names_the_field() {
        let err = plan_error(
            r#"
concurso: { nome: TRF, sigla: TRF1 }
mapa:
  - disciplina: Português
    assunto: Crase
    metadados:
      peso_questoes: tres
"#,
        );
        assert!(err.contains("peso_questoes"), "{}", err);
        assert!(!err.contains("untagged"), "{}", err);
    }

    #[test]
    fn test_parse_plan_rejects_missing_contest() {
        assert!(matches!(parse_plan("mapa: []"), Err(MapaError::Yaml(_))));
    }

    #[test]
    fn test_apply_plan_resolves_matrix_and_orders() {
        let mut store = Store::open_in_memory().unwrap();
        {
            let conn = store.connection();
            let (d, _) = matrix::get_or_create_discipline(conn, "Português", 1).unwrap();
            matrix::get_or_create_subject(conn, d.id, "Crase", 1, &Default::default()).unwrap();
        }

        let plan = parse_plan(PLAN).unwrap();
        let summary = apply_plan(&mut store, &plan).unwrap();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.with_metadata, 1);

        let rows = store.study_map_rows(summary.contest.id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].order, 1);
        assert_eq!(rows[0].display_name(), "Crase");
        assert_eq!(rows[0].metadata.as_ref().unwrap().minutes_regular, 45.5);
        assert_eq!(rows[1].order, 10);
        assert_eq!(rows[1].display_name(), "Simulado final");
    }

    #[test]
    fn test_apply_plan_unknown_subject_rolls_back() {
        let mut store = Store::open_in_memory().unwrap();
        let plan = parse_plan(PLAN).unwrap();

        let err = apply_plan(&mut store, &plan).unwrap_err();
        assert!(err.to_string().contains("mapa[1]"));
        assert!(store.list_contests().unwrap().is_empty());
    }
}
