use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::api::{run_api_server, ApiConfig};
use crate::error::{MapaError, MapaResult};
use crate::excel::{ImportReport, MatrixImporter, TutoryExporter};
use crate::plan;
use crate::store::Store;
use crate::types::Contest;

/// Find a contest by short code, falling back to a numeric id
pub fn resolve_contest(store: &Store, target: &str) -> MapaResult<Contest> {
    if let Some(contest) = store.find_contest_by_code(target)? {
        return Ok(contest);
    }
    match target.parse::<i64>() {
        Ok(id) => store.get_contest(id),
        Err(_) => Err(MapaError::NotFound(format!("concurso '{}'", target))),
    }
}

fn print_report(report: &ImportReport) {
    let stats = &report.stats;
    println!("   Disciplinas criadas: {}", stats.disciplines_created);
    println!("   Assuntos criados:    {}", stats.subjects_created);
    println!("   Subassuntos criados: {}", stats.sub_subjects_created);
    println!("   Linhas processadas:  {}", stats.rows_processed);
    println!("   Linhas ignoradas:    {}", stats.rows_skipped);

    if !report.warnings.is_empty() {
        println!("\n{}", format!("⚠️  {} aviso(s):", report.warnings.len()).yellow());
        for warning in &report.warnings {
            println!("   {}", warning.yellow());
        }
    }
    if !report.errors.is_empty() {
        println!("\n{}", format!("❌ {} erro(s):", report.errors.len()).red());
        for error in &report.errors {
            println!("   {}", error.red());
        }
    }
    println!();
}

/// Execute the import command
pub fn import(database: &Path, file: PathBuf, clear: bool, verbose: bool) -> MapaResult<()> {
    println!("{}", "📚 Mapas - Importar Matriz".bold().green());
    println!("   Arquivo: {}", file.display());
    println!("   Banco:   {}", database.display());
    if clear {
        println!("   {}", "Matriz existente será apagada".yellow());
    }
    println!();

    let mut store = Store::open(database)?;

    if verbose {
        println!("{}", "📖 Lendo planilha...".cyan());
    }
    let report = MatrixImporter::new()
        .clear_existing(clear)
        .import_file(&mut store, &file)?;

    if report.success {
        println!("{}", "✅ Importação concluída com sucesso".bold().green());
        print_report(&report);
        Ok(())
    } else {
        println!("{}", "❌ Importação concluída com erros".bold().red());
        print_report(&report);
        Err(MapaError::Validation(format!(
            "{} aba(s) não puderam ser lidas",
            report.errors.len()
        )))
    }
}

/// Execute the export command
pub fn export(
    database: &Path,
    target: String,
    output: Option<PathBuf>,
    verbose: bool,
) -> MapaResult<()> {
    println!("{}", "📚 Mapas - Exportar Tutory".bold().green());

    let store = Store::open(database)?;
    let contest = resolve_contest(&store, &target)?;
    println!("   Concurso: {} ({})", contest.name, contest.code.bright_blue());

    if verbose {
        println!("{}", "📊 Gerando planilha...".cyan());
    }
    let export = TutoryExporter::export_contest(&store, contest.id)?;
    let output = output.unwrap_or_else(|| PathBuf::from(&export.file_name));
    fs::write(&output, &export.bytes)?;

    println!("{}", "✅ Exportação concluída".bold().green());
    println!("   Itens:   {}", export.rows);
    println!("   Arquivo: {}\n", output.display());
    Ok(())
}

/// Execute the wipe command
pub fn wipe(database: &Path, yes: bool) -> MapaResult<()> {
    println!("{}", "🧹 Mapas - Limpar Matriz".bold().green());
    if !yes {
        return Err(MapaError::Validation(
            "confirme com --yes para apagar toda a matriz".to_string(),
        ));
    }

    let mut store = Store::open(database)?;
    let removed = store.clear_matrix()?;

    println!("{}", "✅ Matriz apagada".bold().green());
    println!("   Disciplinas: {}", removed.disciplines);
    println!("   Assuntos:    {}", removed.subjects);
    println!("   Subassuntos: {}\n", removed.sub_subjects);
    Ok(())
}

/// Execute the tree command
pub fn tree(database: &Path) -> MapaResult<()> {
    let store = Store::open(database)?;
    let tree = store.matrix_tree()?;

    if tree.is_empty() {
        println!("{}", "Matriz vazia".yellow());
        return Ok(());
    }

    for node in &tree {
        println!(
            "{} {}",
            format!("{:>2}.", node.discipline.order).dimmed(),
            node.discipline.name.bold()
        );
        for subject in &node.subjects {
            println!(
                "    {} {}",
                format!("{}.", subject.subject.order).dimmed(),
                subject.subject.name
            );
            for sub in &subject.sub_subjects {
                println!("        - {}", sub.name.cyan());
            }
        }
    }

    let counts = store.matrix_counts()?;
    println!(
        "\n   {} disciplinas, {} assuntos, {} subassuntos",
        counts.disciplines, counts.subjects, counts.sub_subjects
    );
    Ok(())
}

/// Execute the plan command
pub fn plan(database: &Path, file: PathBuf, verbose: bool) -> MapaResult<()> {
    println!("{}", "📚 Mapas - Carregar Plano".bold().green());
    println!("   Arquivo: {}\n", file.display());

    let document = plan::parse_plan_file(&file)?;
    if verbose {
        println!(
            "{}",
            format!("📖 {} item(ns) no mapa", document.entries.len()).cyan()
        );
    }

    let mut store = Store::open(database)?;
    let summary = plan::apply_plan(&mut store, &document)?;

    println!("{}", "✅ Plano carregado".bold().green());
    println!(
        "   Concurso: {} ({}) id={}",
        summary.contest.name,
        summary.contest.code.bright_blue(),
        summary.contest.id
    );
    println!("   Itens:    {}", summary.entries);
    println!("   Com metadados: {}\n", summary.with_metadata);
    Ok(())
}

/// Execute the duplicate command
pub fn duplicate(database: &Path, contest_id: i64, name: Option<String>) -> MapaResult<()> {
    println!("{}", "📚 Mapas - Duplicar Concurso".bold().green());

    let mut store = Store::open(database)?;
    let copy = store.duplicate_contest(contest_id, name.as_deref())?;
    let entries = store.list_entries(copy.id)?.len();

    println!("{}", "✅ Concurso duplicado".bold().green());
    println!("   Novo concurso: {} id={}", copy.name, copy.id);
    println!("   Itens copiados: {}\n", entries);
    Ok(())
}

/// Execute the serve command
pub fn serve(database: PathBuf, host: String, port: u16) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_api_server(ApiConfig {
        host,
        port,
        database,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewContest;

    #[test]
    fn test_resolve_contest_by_code_then_id() {
        let store = Store::open_in_memory().unwrap();
        let first = store.create_contest(&NewContest::new("TRF 2024", "TRF")).unwrap();
        let second = store.create_contest(&NewContest::new("TRF 2025", "TRF")).unwrap();

        assert_eq!(resolve_contest(&store, "TRF").unwrap().id, second.id);
        assert_eq!(
            resolve_contest(&store, &first.id.to_string()).unwrap().id,
            first.id
        );
        assert!(matches!(
            resolve_contest(&store, "STF"),
            Err(MapaError::NotFound(_))
        ));
    }

    #[test]
    fn test_wipe_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("mapas.db");
        assert!(matches!(wipe(&db, false), Err(MapaError::Validation(_))));
        assert!(wipe(&db, true).is_ok());
    }
}
