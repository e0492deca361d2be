//! # Incoming Upload DTO
//!
//! プロキシが受け取ったマルチパートの内容

use crate::domain::entities::source_file::SourceFile;

/// 受信したアップロード
///
/// `file` パートが無いリクエストも表現できるよう `Option` で持つ
#[derive(Debug, Clone, Default)]
pub struct IncomingUpload {
    pub file: Option<SourceFile>,
    /// クライアントのepochミリ秒
    pub timestamp: Option<String>,
}

impl IncomingUpload {
    pub fn new(file: Option<SourceFile>, timestamp: Option<String>) -> Self {
        Self { file, timestamp }
    }
}
