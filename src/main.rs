use std::path::PathBuf;

use clap::{Parser, Subcommand};
use concurso_mapas::cli;

#[derive(Parser)]
#[command(name = "mapas")]
#[command(about = "Subject matrix import and Tutory study-map export for concurso prep")]
#[command(long_about = "Mapas - study maps for concurso preparation

Imports the subject matrix (disciplines, subjects, sub-subjects) from the
partner spreadsheet and exports each contest's study map in the Tutory format.

COMMANDS:
  import     - Import a subject matrix workbook (.xlsx / .xls)
  export     - Export a contest's study map as a Tutory workbook
  wipe       - Delete the whole subject matrix
  tree       - Print the subject matrix
  plan       - Create a contest and its study map from a YAML plan
  duplicate  - Copy a contest with its study map
  serve      - Start the HTTP API

EXAMPLES:
  mapas import matriz.xlsx                 # Create or reuse matrix rows
  mapas import matriz.xlsx --clear         # Replace the matrix
  mapas plan trf1.yaml                     # Load a study plan
  mapas export TRF1 -o trf1.xlsx           # Tutory export by sigla")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(short, long, global = true, default_value = "mapas.db", env = "MAPAS_DATABASE")]
    database: PathBuf,

    /// Show verbose steps and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Import a subject matrix workbook.

Each sheet is a discipline (sheet title = discipline name, workbook position =
order). Rows 1-3 are reserved; data starts at row 4:

  A: subject   B: sub-subject 1   C: sub-subject 2
  D: OneNote summary link   E: Cebraspe questions link
  G: FGV questions link     H: tip

Existing rows are reused by name. An existing subject keeps its order and
only has empty links/tip filled in. The whole import is one transaction.")]
    /// Import a subject matrix workbook
    Import {
        /// Path to the workbook (.xlsx / .xls)
        file: PathBuf,

        /// Delete the existing matrix first (same transaction)
        #[arg(long)]
        clear: bool,
    },

    /// Export a contest's study map as a Tutory workbook
    Export {
        /// Contest sigla (newest match) or id
        contest: String,

        /// Output file (default: <sigla>_tutory.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete every sub-subject, subject and discipline
    Wipe {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Print the subject matrix
    Tree,

    #[command(long_about = "Create a contest and its study map from a YAML plan.

  concurso:
    nome: TRF 1ª Região 2025
    sigla: TRF1
    tipo: GRAD            # or POS
  mapa:
    - disciplina: Português
      assunto: Crase
      item_edital: \"2.1\"
      metadados:
        peso_questoes: 3
    - extra: Simulado final

Subjects must exist in the imported matrix. Entries are ordered by position
unless they set 'ordem'.")]
    /// Create a contest and its study map from a YAML plan
    Plan {
        /// Path to the YAML plan
        file: PathBuf,
    },

    /// Copy a contest with its study map and metadata
    Duplicate {
        /// Contest id
        id: i64,

        /// Name of the copy (default: "<name> (Cópia)")
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Start the HTTP API
    Serve {
        /// Host address to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1", env = "MAPAS_HOST")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8080", env = "MAPAS_PORT")]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "concurso_mapas=debug".into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let db = cli.database;
    match cli.command {
        Commands::Import { file, clear } => cli::import(&db, file, clear, cli.verbose)?,
        Commands::Export { contest, output } => cli::export(&db, contest, output, cli.verbose)?,
        Commands::Wipe { yes } => cli::wipe(&db, yes)?,
        Commands::Tree => cli::tree(&db)?,
        Commands::Plan { file } => cli::plan(&db, file, cli.verbose)?,
        Commands::Duplicate { id, name } => cli::duplicate(&db, id, name)?,
        Commands::Serve { host, port } => cli::serve(db, host, port)?,
    }
    Ok(())
}
