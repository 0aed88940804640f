// Name Reconciliation - Web Server
// POST /compare with a ledger document and a spreadsheet, JSON partition back

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use name_reconciliation::{logging, AppConfig, ComparisonSession, Upload};

/// Shared application state (read-only; every request builds its own data)
#[derive(Clone)]
struct AppState {
    session: Arc<ComparisonSession>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// Pull the `pdf` and `excel` parts out of the form
async fn read_uploads(mut multipart: Multipart) -> anyhow::Result<(Option<Upload>, Option<Upload>)> {
    let mut document = None;
    let mut sheet = None;

    while let Some(field) = multipart.next_field().await.context("Malformed multipart body")? {
        let part = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().unwrap_or(part.as_str()).to_string();

        match part.as_str() {
            "pdf" | "excel" => {
                let bytes = field
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read part '{}'", part))?;
                let upload = Upload::new(file_name, bytes.to_vec());
                if part == "pdf" {
                    document = Some(upload);
                } else {
                    sheet = Some(upload);
                }
            }
            _ => {}
        }
    }

    Ok((document, sheet))
}

/// POST /compare - Reconcile an uploaded ledger against an uploaded sheet
async fn compare(State(state): State<AppState>, multipart: Multipart) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("compare", %request_id);

    async move {
        let (document, sheet) = match read_uploads(multipart).await {
            Ok(parts) => parts,
            Err(e) => {
                error!(error = %e, "could not read upload");
                return error_response(StatusCode::BAD_REQUEST, "Malformed upload.");
            }
        };

        let (document, sheet) = match (document, sheet) {
            (Some(d), Some(s)) => (d, s),
            _ => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "Send a PDF file and a spreadsheet file.",
                )
            }
        };

        info!(
            document = %document.file_name,
            document_sha256 = %document.fingerprint(),
            sheet = %sheet.file_name,
            sheet_sha256 = %sheet.fingerprint(),
            "comparison requested"
        );

        let session = state.session.clone();
        let outcome = tokio::task::spawn_blocking(move || session.compare(&document, &sheet)).await;

        match outcome {
            Ok(report) => (StatusCode::OK, Json(report.result)).into_response(),
            Err(e) => {
                error!(error = %e, "comparison failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
        }
    }
    .instrument(span)
    .await
}

// ============================================================================
// Main Server
// ============================================================================

fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let api_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .route("/compare", post(compare))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::configure_logging();

    let config = AppConfig::from_env()?;
    let state = AppState {
        session: Arc::new(ComparisonSession::from_config(&config)),
    };

    let app = build_router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    const BOUNDARY: &str = "recon-boundary";

    fn test_app() -> Router {
        let state = AppState {
            session: Arc::new(ComparisonSession::new()),
        };
        build_router(state, 1024 * 1024)
    }

    fn multipart_body(parts: &[(&str, &str, &str)]) -> String {
        let mut body = String::new();
        for (part, file_name, content) in parts {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, part, file_name, content
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        body
    }

    fn compare_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/compare")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "OK");
    }

    #[tokio::test]
    async fn test_compare_without_spreadsheet_is_bad_request() {
        let body = multipart_body(&[("pdf", "extrato.txt", "ANA LIMA 01/02/2024 TED")]);
        let response = test_app().oneshot(compare_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_compare_without_document_is_bad_request() {
        let body = multipart_body(&[("excel", "clientes.csv", "Nome\nAna Lima")]);
        let response = test_app().oneshot(compare_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_compare_returns_partition() {
        let body = multipart_body(&[
            ("pdf", "extrato.txt", "ANA LIMA 01/02/2024 TED\nJOSE SOUZA 02/02/2024 PIX"),
            ("excel", "clientes.csv", "Nome\nAna Lima\nRafael Costa"),
        ]);
        let response = test_app().oneshot(compare_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(
            json,
            serde_json::json!({
                "nomes_em_ambos": [{"nome": "ANA LIMA", "op": "TED"}],
                "nomes_apenas_excel": ["RAFAEL COSTA"],
                "nomes_apenas_pdf": [{"nome": "JOSE SOUZA", "op": "PIX"}],
            })
        );
    }
}
