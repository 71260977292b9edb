use thiserror::Error;

pub type MapaResult<T> = Result<T, MapaError>;

#[derive(Error, Debug)]
pub enum MapaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database schema version {found} is newer than supported version {supported}")]
    SchemaVersion { found: i32, supported: i32 },

    #[error("Erro ao abrir arquivo Excel: {0}")]
    InvalidWorkbook(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid upload: {0}")]
    Upload(String),
}

impl MapaError {
    /// Errors caused by the caller's input rather than by the system.
    ///
    /// The HTTP boundary maps these to 4xx responses and everything else to 500.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MapaError::Yaml(_)
                | MapaError::InvalidWorkbook(_)
                | MapaError::Validation(_)
                | MapaError::NotFound(_)
                | MapaError::Upload(_)
        )
    }
}

/// Collects per-field validation messages into a single [`MapaError::Validation`].
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<(String, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push((field.into(), message.into()));
    }

    pub fn into_result(self) -> MapaResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let message = self
            .errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(MapaError::Validation(message))
    }
}
