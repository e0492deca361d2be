//! # Processor Repository Trait
//!
//! 外部ワークフロー（OCR処理）への転送を抽象化

use async_trait::async_trait;

use crate::domain::entities::submission::{Submission, UpstreamTarget};
use crate::domain::errors::UpstreamForwardError;

/// 処理系リポジトリ
#[async_trait]
pub trait ProcessorRepository: Send + Sync {
    /// ファイルとセッションIDを外部ワークフローへ転送
    ///
    /// 結果は元の呼び出し元には返らない
    ///
    /// # Errors
    ///
    /// 転送先に届かない、または成功以外のステータスの場合
    async fn forward(
        &self,
        target: &UpstreamTarget,
        submission: Submission,
    ) -> Result<(), UpstreamForwardError>;
}
