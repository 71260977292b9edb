//! Concurso Mapas - subject matrix and study maps for exam preparation
//!
//! Imports the fixed subject matrix (Discipline → Subject → Sub-subject) from
//! a partner spreadsheet and exports each contest's study map in the Tutory
//! 19-column format.
//!
//! # Example
//!
//! ```no_run
//! use concurso_mapas::excel::{MatrixImporter, TutoryExporter};
//! use concurso_mapas::store::Store;
//!
//! let mut store = Store::open("mapas.db")?;
//! let report = MatrixImporter::new().import_file(&mut store, "matriz.xlsx")?;
//! println!("Subjects created: {}", report.stats.subjects_created);
//!
//! let export = TutoryExporter::export_contest(&store, 1)?;
//! std::fs::write(&export.file_name, &export.bytes)?;
//! # Ok::<(), concurso_mapas::error::MapaError>(())
//! ```

pub mod api;
pub mod cli;
pub mod error;
pub mod excel;
pub mod plan;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{MapaError, MapaResult};
pub use store::Store;
pub use types::{Contest, Discipline, StudyMetadata, SubSubject, Subject};
