//! HTTP Upload Repository Implementation
//!
//! UploadRepositoryの reqwest 実装（マルチパートをチャンク単位でストリーム送信）

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use serde::Deserialize;

use crate::domain::entities::source_file::SourceFile;
use crate::domain::entities::submission::AdmissionReceipt;
use crate::domain::errors::UploadError;
use crate::domain::repositories::upload_repository::{ProgressCallback, UploadRepository};

/// 進捗通知の単位
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// プロキシが返すエラーボディ
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// reqwest によるアップロードリポジトリ
pub struct HttpUploadRepository {
    client: reqwest::Client,
    endpoint: String,
    chunk_size: usize,
}

impl HttpUploadRepository {
    /// 新しいリポジトリを作成
    ///
    /// # Arguments
    ///
    /// * `endpoint` - プロキシのアップロードURL（`.../api/webhook`）
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 送信したバイト数を数えながら流すボディ
    fn progress_body(&self, content: &Bytes, on_progress: ProgressCallback) -> Body {
        let total = content.len() as u64;
        let chunks = split_chunks(content, self.chunk_size);
        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            on_progress(sent, total);
            Ok::<Bytes, std::io::Error>(chunk)
        }));
        Body::wrap_stream(stream)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[async_trait]
impl UploadRepository for HttpUploadRepository {
    async fn upload(
        &self,
        file: &SourceFile,
        on_progress: ProgressCallback,
    ) -> Result<AdmissionReceipt, UploadError> {
        let body = self.progress_body(file.content(), on_progress);
        let part = Part::stream_with_length(body, file.len())
            .file_name(file.name().to_string())
            .mime_str(file.content_type())
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let form = Form::new()
            .part("file", part)
            .text("timestamp", chrono::Utc::now().timestamp_millis().to_string());

        debug!("POST {} ({} bytes)", self.endpoint, file.len());
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        serde_json::from_slice(&body).map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }
}

/// 成功以外のレスポンスをエラーにする
///
/// ボディの `message` を優先し、無ければステータスを示す
fn rejection(status: StatusCode, body: &[u8]) -> UploadError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

    UploadError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn split_chunks(content: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let mut chunks = Vec::with_capacity(content.len() / chunk_size + 1);
    let mut offset = 0;
    while offset < content.len() {
        let end = (offset + chunk_size).min(content.len());
        chunks.push(content.slice(offset..end));
        offset = end;
    }
    chunks
}
