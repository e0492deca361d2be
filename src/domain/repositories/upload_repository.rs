//! # Upload Repository Trait
//!
//! プロキシへのファイルアップロードを抽象化

use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::domain::entities::source_file::SourceFile;
use crate::domain::entities::submission::AdmissionReceipt;
use crate::domain::errors::UploadError;

/// 送信済みバイト数と合計バイト数を受け取るコールバック
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// アップロードリポジトリ
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// ファイルをマルチパートでアップロード
    ///
    /// # Arguments
    ///
    /// * `file` - アップロードするファイル
    /// * `on_progress` - 送信中に `(sent, total)` で呼ばれる
    ///
    /// # Errors
    ///
    /// ネットワークエラー、または成功以外のステータスの場合に `UploadError` を返す
    async fn upload(
        &self,
        file: &SourceFile,
        on_progress: ProgressCallback,
    ) -> Result<AdmissionReceipt, UploadError>;
}
