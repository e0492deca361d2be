//! # UploadState Entity
//!
//! アップロードクライアントが所有するアップロード状態

use super::session_id::SessionId;

/// アップロードの状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadStatus {
    /// アップロードしていない
    #[default]
    Idle,
    /// アップロード中（0〜100%）
    Uploading { progress: u8 },
    /// 失敗
    Failed { message: String },
    /// 成功（セッションIDを受け取った）
    Succeeded { session_id: SessionId },
}

/// アップロード状態
///
/// `attempt` はリセットの度に進むので、放棄された試行の遅延コールバックは
/// 現在の状態を変更できない
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadState {
    status: UploadStatus,
    attempt: u64,
}

impl UploadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.status, UploadStatus::Uploading { .. })
    }

    /// 現在の進捗（アップロード中以外は成功時100、その他0）
    pub fn progress(&self) -> u8 {
        match self.status {
            UploadStatus::Uploading { progress } => progress,
            UploadStatus::Succeeded { .. } => 100,
            _ => 0,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match &self.status {
            UploadStatus::Succeeded { session_id } => Some(session_id),
            _ => None,
        }
    }

    /// 新しい試行を開始し、その試行番号を返す
    pub fn begin(&mut self) -> u64 {
        self.attempt += 1;
        self.status = UploadStatus::Uploading { progress: 0 };
        self.attempt
    }

    /// 送信済みバイト数から進捗を記録
    ///
    /// 進捗は単調非減少。現在の試行でない場合は無視する
    ///
    /// # Returns
    ///
    /// 進捗が更新された場合に新しい値
    pub fn record_progress(&mut self, attempt: u64, sent: u64, total: u64) -> Option<u8> {
        if attempt != self.attempt {
            return None;
        }

        match &mut self.status {
            UploadStatus::Uploading { progress } => {
                let percent = percent_of(sent, total);
                if percent > *progress {
                    *progress = percent;
                    Some(percent)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// 成功を記録（現在の試行のみ）
    pub fn succeed(&mut self, attempt: u64, session_id: SessionId) -> bool {
        if attempt != self.attempt || !self.is_uploading() {
            return false;
        }
        self.status = UploadStatus::Succeeded { session_id };
        true
    }

    /// 失敗を記録（現在の試行のみ）
    pub fn fail(&mut self, attempt: u64, message: String) -> bool {
        if attempt != self.attempt || !self.is_uploading() {
            return false;
        }
        self.status = UploadStatus::Failed { message };
        true
    }

    /// 初期状態に戻す。進行中の試行は放棄される
    pub fn reset(&mut self) {
        self.attempt += 1;
        self.status = UploadStatus::Idle;
    }
}

/// `round(sent * 100 / total)` を 0〜100 に収める
///
/// 合計が0の場合は送信するものが無いので100とする
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = sent.min(total) as f64;
    ((sent * 100.0) / total as f64).round().clamp(0.0, 100.0) as u8
}
