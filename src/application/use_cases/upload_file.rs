//! # Upload Client
//!
//! プロキシへファイルをアップロードし、アップロード状態を所有する

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::entities::session_id::SessionId;
use crate::domain::entities::source_file::SourceFile;
use crate::domain::entities::upload_state::UploadState;
use crate::domain::errors::UploadError;
use crate::domain::repositories::upload_repository::{ProgressCallback, UploadRepository};

/// アップロードクライアント
///
/// 状態は `watch` で公開し、変更はこのクライアントの処理からのみ行う
pub struct UploadClient<U: UploadRepository> {
    repository: Arc<U>,
    state: Arc<watch::Sender<UploadState>>,
}

impl<U: UploadRepository> Clone for UploadClient<U> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            state: self.state.clone(),
        }
    }
}

impl<U: UploadRepository> UploadClient<U> {
    /// 新しいクライアントを作成
    pub fn new(repository: Arc<U>) -> Self {
        let (state, _) = watch::channel(UploadState::new());
        Self {
            repository,
            state: Arc::new(state),
        }
    }

    /// 現在の状態のスナップショット
    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    /// 状態の変更を購読
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    /// ファイルをアップロード
    ///
    /// # Arguments
    ///
    /// * `file` - アップロードするファイル
    /// * `on_progress` - 進捗（0〜100）が上がる度に呼ばれる
    ///
    /// # Returns
    ///
    /// プロキシが発行したセッションID
    ///
    /// # Errors
    ///
    /// ネットワークエラー、または成功以外のステータスの場合
    pub async fn upload<F>(&self, file: &SourceFile, on_progress: F) -> Result<SessionId, UploadError>
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        let mut attempt = 0;
        self.state.send_modify(|state| attempt = state.begin());
        info!("Uploading {} ({})", file.name(), file.display_size());

        let state = self.state.clone();
        let file_size = file.len();
        let callback: ProgressCallback = Arc::new(move |sent, total| {
            // 合計が不明な場合はファイルサイズで代用
            let total = if total == 0 { file_size } else { total };
            let mut updated = None;
            state.send_if_modified(|state| {
                updated = state.record_progress(attempt, sent, total);
                updated.is_some()
            });
            if let Some(percent) = updated {
                on_progress(percent);
            }
        });

        match self.repository.upload(file, callback).await {
            Ok(receipt) => {
                let session_id = receipt.session_id;
                let accepted = self
                    .state
                    .send_if_modified(|state| state.succeed(attempt, session_id.clone()));
                if accepted {
                    info!("Upload accepted: {}", session_id);
                } else {
                    debug!("Upload {} settled after reset, ignoring", session_id);
                }
                Ok(session_id)
            }
            Err(e) => {
                let accepted = self
                    .state
                    .send_if_modified(|state| state.fail(attempt, e.message()));
                if accepted {
                    warn!("Upload failed: {}", e);
                } else {
                    debug!("Upload failed after reset, ignoring: {}", e);
                }
                Err(e)
            }
        }
    }

    /// 進捗・エラー・セッションIDを初期値に戻す
    ///
    /// 進行中の通信はキャンセルしないが、その結果は状態に反映されない
    pub fn reset(&self) {
        self.state.send_modify(UploadState::reset);
    }
}
