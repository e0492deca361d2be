//! # Submission Entities
//!
//! プロキシが受け付けたアップロードと、その転送先

use serde::{Deserialize, Serialize};

use super::session_id::SessionId;
use super::source_file::SourceFile;

pub const ADMISSION_MESSAGE: &str = "File upload initiated. Awaiting processing.";

/// 外部ワークフローへ転送する内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub file: SourceFile,
    pub session_id: SessionId,
    /// クライアントが付けたepochミリ秒（任意）
    pub timestamp: Option<String>,
}

/// 転送先（外部ワークフローのWebhook）
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub webhook_url: String,
    /// Bearer認証に使うAPIキー
    pub api_key: String,
}

// APIキーをログに出さない
impl std::fmt::Debug for UpstreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamTarget")
            .field("webhook_url", &self.webhook_url)
            .field("api_key", &"***")
            .finish()
    }
}

/// 受付結果（プロキシのレスポンスボディ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReceipt {
    pub message: String,
    pub session_id: SessionId,
}

impl AdmissionReceipt {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            message: ADMISSION_MESSAGE.to_string(),
            session_id,
        }
    }
}
