//! Proxy Handlers
//!
//! アップロードエンドポイントとヘルスチェック

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::json;

use super::AppState;
use crate::application::dto::incoming_upload::IncomingUpload;
use crate::domain::entities::source_file::SourceFile;
use crate::domain::entities::submission::AdmissionReceipt;
use crate::domain::errors::ProxyError;
use crate::domain::repositories::processor_repository::ProcessorRepository;

const FILE_FIELD: &str = "file";
const TIMESTAMP_FIELD: &str = "timestamp";

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        // 詳細はログにのみ出し、クライアントには固定文言を返す
        let (status, message) = match self {
            ProxyError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server is not configured correctly.",
            ),
            ProxyError::BadRequest(_) => (StatusCode::BAD_REQUEST, "No file found in the request."),
            ProxyError::Internal(_) => (StatusCode::BAD_GATEWAY, "An internal error occurred."),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// POST /api/webhook
///
/// 設定の検証 → マルチパートの解析 → `file` の有無、の順に検査する
pub async fn upload<P: ProcessorRepository + 'static>(
    State(state): State<AppState<P>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AdmissionReceipt>, ProxyError> {
    let target = state.admit.target()?;

    let multipart = multipart.map_err(|e| {
        error!("Webhook proxy error: {}", e);
        ProxyError::Internal(e.to_string())
    })?;
    let upload = read_upload(multipart).await.map_err(|e| {
        error!("Webhook proxy error: {}", e);
        ProxyError::Internal(e.to_string())
    })?;

    let admission = state.admit.admit(target, upload)?;
    Ok(Json(admission.receipt))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn read_upload(mut multipart: Multipart) -> Result<IncomingUpload, MultipartError> {
    let mut upload = IncomingUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let content = field.bytes().await?;
                upload.file = Some(SourceFile::new(file_name, content_type, content));
            }
            Some(TIMESTAMP_FIELD) => {
                let timestamp = field.text().await?;
                if !timestamp.is_empty() {
                    upload.timestamp = Some(timestamp);
                }
            }
            _ => {}
        }
    }

    Ok(upload)
}
