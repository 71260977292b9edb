//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::sync::{Arc, MutexGuard};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use super::server::AppState;
use crate::error::{MapaError, MapaResult};
use crate::excel::{check_upload, ImportStats, MatrixImporter, TutoryExporter, XLSX_MIME};
use crate::store::Store;
use crate::types::{Contest, DisciplineNode};

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }

    /// Failure that still carries a payload (e.g. an import's error list)
    pub fn fail(message: impl Into<String>, data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::err(message)
        }
    }
}

/// Error response: status plus message in the standard wrapper
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<MapaError> for ApiError {
    fn from(err: MapaError) -> Self {
        match &err {
            MapaError::NotFound(_) => ApiError::new(StatusCode::NOT_FOUND, err.to_string()),
            e if e.is_client_error() => ApiError::new(StatusCode::BAD_REQUEST, err.to_string()),
            _ => {
                error!("request failed: {}", err);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Erro interno ao processar a requisição",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}

fn lock_store(state: &AppState) -> Result<MutexGuard<'_, Store>, ApiError> {
    state.store.lock().map_err(|_| {
        error!("store mutex poisoned");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Erro interno ao acessar o banco")
    })
}

/// Run `f` against the locked store on the blocking pool.
///
/// SQLite I/O and workbook decoding/rendering stay off the async workers; the
/// lock is taken and released inside the blocking task.
async fn with_store<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Store) -> MapaResult<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let mut store = lock_store(&state)?;
        f(&mut *store).map_err(ApiError::from)
    })
    .await
    .map_err(|e| {
        error!("store task failed: {}", e);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Erro interno ao processar a requisição",
        )
    })?
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(path: &str, method: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Mapas API Server".to_string(),
        version: state.version.clone(),
        description: "Subject matrix import and Tutory study-map export".to_string(),
        endpoints: vec![
            endpoint("/health", "GET", "Health check endpoint"),
            endpoint("/version", "GET", "Get server version"),
            endpoint(
                "/api/v1/matriz/importar",
                "POST",
                "Import a subject matrix workbook (multipart: arquivo, limpar_existente)",
            ),
            endpoint("/api/v1/disciplinas", "GET", "Subject matrix tree"),
            endpoint(
                "/api/v1/concursos/:id/exportar",
                "GET",
                "Download a contest study map in the Tutory format",
            ),
            endpoint(
                "/api/v1/concursos/:id/duplicar",
                "POST",
                "Copy a contest with its study map",
            ),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: vec![
            "import".to_string(),
            "export".to_string(),
            "duplicate".to_string(),
            "matrix".to_string(),
        ],
    }))
}

/// Successful (or partially failed) import payload
#[derive(Serialize, Default)]
pub struct ImportResponse {
    pub mensagem: String,
    pub estatisticas: ImportStats,
    pub avisos: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub erros: Vec<String>,
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "on" | "sim" | "yes"
    )
}

/// POST /api/v1/matriz/importar - Import a subject matrix workbook
pub async fn import_matrix(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut clear_existing = false;

    let bad_upload = |e: axum::extract::multipart::MultipartError| {
        ApiError::new(StatusCode::BAD_REQUEST, format!("Upload inválido: {}", e))
    };
    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "arquivo" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_upload)?;
                upload = Some((file_name, bytes.to_vec()));
            }
            "limpar_existente" => {
                clear_existing = parse_flag(&field.text().await.map_err(bad_upload)?);
            }
            _ => {}
        }
    }

    let (file_name, bytes) = upload.ok_or_else(|| {
        ApiError::new(StatusCode::BAD_REQUEST, "Nenhum arquivo enviado (campo 'arquivo')")
    })?;
    check_upload(&file_name, bytes.len())?;

    let report = with_store(&state, move |store| {
        MatrixImporter::new()
            .clear_existing(clear_existing)
            .import_bytes(store, &bytes)
    })
    .await?;

    let response = ImportResponse {
        mensagem: String::new(),
        estatisticas: report.stats,
        avisos: report.warnings,
        erros: report.errors,
    };
    if report.success {
        let response = ImportResponse {
            mensagem: "Importação concluída com sucesso".to_string(),
            ..response
        };
        Ok(Json(ApiResponse::ok(response)).into_response())
    } else {
        warn!(errors = response.erros.len(), "matrix import finished with errors");
        let response = ImportResponse {
            mensagem: "Erro na importação".to_string(),
            ..response
        };
        Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::fail("Erro na importação", response)),
        )
            .into_response())
    }
}

/// GET /api/v1/disciplinas - Subject matrix tree
pub async fn disciplines(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<DisciplineNode>>>, ApiError> {
    let tree = with_store(&state, |store| store.matrix_tree()).await?;
    Ok(Json(ApiResponse::ok(tree)))
}

/// `Content-Disposition` for a download, with an ASCII fallback name and the
/// UTF-8 name percent-encoded.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded: String = file_name
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

/// GET /api/v1/concursos/:id/exportar - Tutory workbook download
pub async fn export_tutory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let export =
        with_store(&state, move |store| TutoryExporter::export_contest(store, id)).await?;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&export.file_name),
            ),
        ],
        export.bytes,
    )
        .into_response())
}

/// Duplicate request
#[derive(Deserialize, Default)]
pub struct DuplicateRequest {
    #[serde(default)]
    pub novo_nome: Option<String>,
}

/// POST /api/v1/concursos/:id/duplicar - Copy a contest with its study map
pub async fn duplicate_contest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Option<Json<DuplicateRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Contest>>), ApiError> {
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let copy = with_store(&state, move |store| {
        store.duplicate_contest(id, request.novo_nome.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(copy))))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== ApiResponse Tests ====================

    #[test]
    fn test_api_response_ok_creates_success_response() {
        let response: ApiResponse<String> = ApiResponse::ok("test data".to_string());

        assert!(response.success);
        assert_eq!(response.data, Some("test data".to_string()));
        assert!(response.error.is_none());
        // UUID format (8-4-4-4-12)
        assert_eq!(response.request_id.len(), 36);
    }

    #[test]
    fn test_api_response_fail_keeps_payload() {
        let response = ApiResponse::fail("Erro na importação", vec!["aba ilegível".to_string()]);

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Erro na importação"));
        assert_eq!(response.data.unwrap().len(), 1);
    }

    #[test]
    fn test_api_response_request_id_is_unique() {
        let response1: ApiResponse<String> = ApiResponse::ok("test1".to_string());
        let response2: ApiResponse<String> = ApiResponse::ok("test2".to_string());

        assert_ne!(response1.request_id, response2.request_id);
    }

    // ==================== Error Mapping Tests ====================

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ApiError::from(MapaError::NotFound("concurso 9".to_string()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_client_errors_map_to_400() {
        let err = ApiError::from(MapaError::InvalidWorkbook("zip".to_string()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Erro ao abrir arquivo Excel"));

        let err = ApiError::from(MapaError::Upload("grande".to_string()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_errors_map_to_generic_500() {
        let err = ApiError::from(MapaError::Database(rusqlite::Error::InvalidQuery));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("Database"));
    }

    // ==================== Helper Tests ====================

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("SIM"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("TRF1_tutory.xlsx"),
            "attachment; filename=\"TRF1_tutory.xlsx\"; filename*=UTF-8''TRF1_tutory.xlsx"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition("AÇÃO_tutory.xlsx");
        assert!(value.contains("filename=\"A__O_tutory.xlsx\""));
        assert!(value.contains("filename*=UTF-8''A%C3%87%C3%83O_tutory.xlsx"));
    }
}
