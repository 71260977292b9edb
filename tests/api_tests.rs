//! API integration tests
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use common::{matrix_workbook, read_first_sheet, sheet, subject_row, text};
use concurso_mapas::api::{build_router, AppState};
use concurso_mapas::store::Store;
use concurso_mapas::types::{NewContest, NewEntry};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "mapas-test-boundary";

fn app() -> (Arc<AppState>, Router) {
    let state = Arc::new(AppState::new(Store::open_in_memory().unwrap()));
    let router = build_router(Arc::clone(&state));
    (state, router)
}

/// multipart/form-data body with an optional file part and text fields
fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"arquivo\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn import_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/matriz/importar")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, HeaderMap) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec(), headers)
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes, _) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn workbook() -> Vec<u8> {
    matrix_workbook(&[sheet(
        "Português",
        vec![
            subject_row("Crase", "Uso", "", "https://onenote", "", "", ""),
            subject_row("", "Órfão", "", "", "", "", ""),
        ],
    )])
}

// ═══════════════════════════════════════════════════════════════════════════
// INFO ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let (_, router) = app();
    let (status, json) = send_json(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (_, router) = app();
    let (status, json) = send_json(&router, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let paths: Vec<&str> = json["data"]["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"/api/v1/matriz/importar"));
    assert!(paths.contains(&"/api/v1/concursos/:id/exportar"));
}

#[tokio::test]
async fn test_version() {
    let (_, router) = app();
    let (_, json) = send_json(&router, get("/version")).await;
    assert_eq!(json["data"]["version"], env!("CARGO_PKG_VERSION"));
}

// ═══════════════════════════════════════════════════════════════════════════
// MATRIX IMPORT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_import_success_returns_stats_and_warnings() {
    let (state, router) = app();
    let body = multipart_body(Some(("matriz.xlsx", workbook().as_slice())), &[]);
    let (status, json) = send_json(&router, import_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["mensagem"], "Importação concluída com sucesso");
    assert_eq!(data["estatisticas"]["disciplinas_criadas"], 1);
    assert_eq!(data["estatisticas"]["assuntos_criados"], 1);
    assert_eq!(data["estatisticas"]["subassuntos_criados"], 1);
    assert_eq!(data["estatisticas"]["linhas_processadas"], 2);
    assert_eq!(data["estatisticas"]["linhas_ignoradas"], 0);
    assert_eq!(
        data["avisos"][0],
        "Linha 5 em 'Português': Subassunto sem assunto pai"
    );

    let store = state.store.lock().unwrap();
    assert_eq!(store.matrix_counts().unwrap().subjects, 1);
}

#[tokio::test]
async fn test_import_with_clear_flag_replaces_matrix() {
    let (state, router) = app();
    let body = multipart_body(Some(("matriz.xlsx", workbook().as_slice())), &[]);
    send(&router, import_request(body)).await;

    let other = matrix_workbook(&[sheet(
        "Informática",
        vec![subject_row("Redes", "", "", "", "", "", "")],
    )]);
    let body = multipart_body(
        Some(("matriz.xlsx", other.as_slice())),
        &[("limpar_existente", "true")],
    );
    let (status, _, _) = send(&router, import_request(body)).await;
    assert_eq!(status, StatusCode::OK);

    let store = state.store.lock().unwrap();
    let tree = store.matrix_tree().unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].discipline.name, "Informática");
}

#[tokio::test]
async fn test_import_rejects_wrong_extension() {
    let (_, router) = app();
    let body = multipart_body(Some(("matriz.csv", &b"a,b,c"[..])), &[]);
    let (status, json) = send_json(&router, import_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains(".xlsx"));
}

#[tokio::test]
async fn test_import_rejects_unreadable_workbook() {
    let (_, router) = app();
    let body = multipart_body(Some(("matriz.xlsx", &b"not a workbook"[..])), &[]);
    let (status, json) = send_json(&router, import_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Erro ao abrir arquivo Excel"));
}

#[tokio::test]
async fn test_import_without_file_is_bad_request() {
    let (_, router) = app();
    let body = multipart_body(None, &[("limpar_existente", "false")]);
    let (status, _) = send_json(&router, import_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_store_failure_is_internal_error() {
    let (state, router) = app();
    state
        .store
        .lock()
        .unwrap()
        .connection()
        .execute_batch(
            "CREATE TRIGGER fail_all BEFORE INSERT ON disciplines
             BEGIN SELECT RAISE(ABORT, 'forced failure'); END;",
        )
        .unwrap();

    let body = multipart_body(Some(("matriz.xlsx", workbook().as_slice())), &[]);
    let (status, json) = send_json(&router, import_request(body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!json["error"].as_str().unwrap().contains("forced"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_busy_store_does_not_stall_other_requests() {
    let (state, router) = app();
    let guard = state.store.lock().unwrap();

    // Import waits for the store on the blocking pool
    let body = multipart_body(Some(("matriz.xlsx", workbook().as_slice())), &[]);
    let import = tokio::spawn({
        let router = router.clone();
        async move { send(&router, import_request(body)).await.0 }
    });
    tokio::task::yield_now().await;

    // The single runtime thread is still free to answer
    let health = send_json(&router, get("/health"));
    let (status, json) = tokio::time::timeout(Duration::from_secs(5), health)
        .await
        .expect("health answered while the store was busy");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "healthy");
    assert!(!import.is_finished());

    drop(guard);
    assert_eq!(import.await.unwrap(), StatusCode::OK);
    assert_eq!(state.store.lock().unwrap().matrix_counts().unwrap().subjects, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// MATRIX TREE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_disciplines_tree() {
    let (_, router) = app();
    let body = multipart_body(Some(("matriz.xlsx", workbook().as_slice())), &[]);
    send(&router, import_request(body)).await;

    let (status, json) = send_json(&router, get("/api/v1/disciplinas")).await;
    assert_eq!(status, StatusCode::OK);
    let discipline = &json["data"][0];
    assert_eq!(discipline["nome"], "Português");
    assert_eq!(discipline["assuntos"][0]["nome"], "Crase");
    assert_eq!(discipline["assuntos"][0]["link_resumos"], "https://onenote");
    assert_eq!(discipline["assuntos"][0]["subassuntos"][0]["nome"], "Uso");
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPORT AND DUPLICATE
// ═══════════════════════════════════════════════════════════════════════════

fn seed_contest(state: &AppState) -> i64 {
    let store = state.store.lock().unwrap();
    let contest = store
        .create_contest(&NewContest::new("TRF 1ª Região", "TRF1"))
        .unwrap();
    store
        .add_entry(contest.id, &NewEntry::extra("Simulado", 1))
        .unwrap();
    contest.id
}

#[tokio::test]
async fn test_export_returns_attachment() {
    let (state, router) = app();
    let id = seed_contest(&state);

    let (status, bytes, headers) =
        send(&router, get(&format!("/api/v1/concursos/{}/exportar", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("filename=\"TRF1_tutory.xlsx\""));

    let (name, rows) = read_first_sheet(&bytes);
    assert_eq!(name, "TRF1");
    assert_eq!(text(&rows[1][1]), "Simulado");
}

#[tokio::test]
async fn test_export_unknown_contest_is_404() {
    let (_, router) = app();
    let (status, json) = send_json(&router, get("/api/v1/concursos/42/exportar")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_duplicate_with_and_without_name() {
    let (state, router) = app();
    let id = seed_contest(&state);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/concursos/{}/duplicar", id))
        .body(Body::empty())
        .unwrap();
    let (status, json) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["nome"], "TRF 1ª Região (Cópia)");
    assert_eq!(json["data"]["sigla"], "TRF1");

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/concursos/{}/duplicar", id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"novo_nome": "TRF 2026"}"#))
        .unwrap();
    let (status, json) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["nome"], "TRF 2026");

    let store = state.store.lock().unwrap();
    let copy_id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(store.list_entries(copy_id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_unknown_contest_is_404() {
    let (_, router) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/concursos/7/duplicar")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
