//! # Admit Upload Use Case
//!
//! アップロードを受け付け、セッションIDを発行して外部ワークフローへ転送する
//!
//! 転送はデタッチしたタスクで行い、完了を待たずに受付結果を返す。
//! 転送の失敗はログに残すだけで、呼び出し元には影響しない。

use log::{error, info};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::application::dto::incoming_upload::IncomingUpload;
use crate::application::dto::proxy_settings::ProxySettings;
use crate::domain::entities::session_id::SessionId;
use crate::domain::entities::submission::{AdmissionReceipt, Submission, UpstreamTarget};
use crate::domain::errors::ProxyError;
use crate::domain::repositories::processor_repository::ProcessorRepository;

/// 受付結果
#[derive(Debug)]
pub struct Admission {
    /// 呼び出し元へ返す内容
    pub receipt: AdmissionReceipt,
    /// 転送タスク（通常は待たずに捨てる）
    pub forwarding: JoinHandle<()>,
}

/// アップロード受付ユースケース
pub struct AdmitUploadUseCase<P: ProcessorRepository> {
    processor: Arc<P>,
    settings: ProxySettings,
}

impl<P: ProcessorRepository + 'static> AdmitUploadUseCase<P> {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `processor` - 外部ワークフローへの転送を担うリポジトリ
    /// * `settings` - 転送先の設定
    pub fn new(processor: Arc<P>, settings: ProxySettings) -> Self {
        Self {
            processor,
            settings,
        }
    }

    /// 転送先の設定を検証
    ///
    /// リクエストボディを読む前に呼ぶ
    ///
    /// # Errors
    ///
    /// 設定が欠けている場合に `ProxyError::Configuration`
    pub fn target(&self) -> Result<UpstreamTarget, ProxyError> {
        self.settings.resolve().inspect_err(|e| {
            error!("Server configuration error: {}", e);
        })
    }

    /// アップロードを受け付ける
    ///
    /// # Arguments
    ///
    /// * `target` - [`Self::target`] で解決した転送先
    /// * `upload` - 受信したマルチパートの内容
    ///
    /// # Errors
    ///
    /// `file` パートが無い場合に `ProxyError::BadRequest`
    pub fn admit(
        &self,
        target: UpstreamTarget,
        upload: IncomingUpload,
    ) -> Result<Admission, ProxyError> {
        let file = upload
            .file
            .ok_or_else(|| ProxyError::BadRequest("no file part in request".to_string()))?;

        let session_id = SessionId::generate();
        info!(
            "Admitted upload {} ({} bytes) as {}",
            file.name(),
            file.len(),
            session_id
        );

        let submission = Submission {
            file,
            session_id: session_id.clone(),
            timestamp: upload.timestamp,
        };

        let processor = self.processor.clone();
        let forwarding = tokio::spawn(async move {
            let session_id = submission.session_id.clone();
            match processor.forward(&target, submission).await {
                Ok(()) => info!("Forwarded {} to upstream processor", session_id),
                Err(e) => error!(
                    "Error forwarding {} to upstream processor: {}",
                    session_id, e
                ),
            }
        });

        Ok(Admission {
            receipt: AdmissionReceipt::new(session_id),
            forwarding,
        })
    }
}
