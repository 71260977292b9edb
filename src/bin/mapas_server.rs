//! Mapas API Server binary
//!
//! HTTP API for matrix import and Tutory export.

use std::path::PathBuf;

use clap::Parser;
use concurso_mapas::api::{run_api_server, ApiConfig};

#[derive(Parser, Debug)]
#[command(name = "mapas-server")]
#[command(version)]
#[command(about = "Mapas API Server - subject matrix import and Tutory export over HTTP")]
#[command(long_about = r#"
Mapas API Server

Endpoints:
  - POST /api/v1/matriz/importar         - Import a matrix workbook (multipart)
  - GET  /api/v1/disciplinas             - Subject matrix tree
  - GET  /api/v1/concursos/:id/exportar  - Tutory workbook download
  - POST /api/v1/concursos/:id/duplicar  - Copy a contest with its study map

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                 - API documentation

Example usage:
  mapas-server                                   # localhost:8080, ./mapas.db
  mapas-server --host 0.0.0.0 --port 3000 --database /var/lib/mapas.db

  curl -F arquivo=@matriz.xlsx -F limpar_existente=false \
    http://localhost:8080/api/v1/matriz/importar
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "MAPAS_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "MAPAS_PORT")]
    port: u16,

    /// SQLite database file
    #[arg(short, long, default_value = "mapas.db", env = "MAPAS_DATABASE")]
    database: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        database: args.database,
    };

    run_api_server(config).await
}
