//! # Domain Errors
//!
//! アップロード・プロキシ・リアルタイムチャネルのエラー分類
//!
//! ユーザーに見えるエラーは最終的に全て `Phase::Error` に集約される。

use thiserror::Error;

use super::entities::processing_state::Phase;

/// プロキシエンドポイントのエラー
///
/// HTTPステータスへの対応は Adapter層（axum）で行う
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyError {
    /// 上流アドレスや認証情報が未設定（500）
    ///
    /// どの設定が欠けているかは呼び出し元に返さない
    #[error("server is not configured correctly: {0}")]
    Configuration(String),

    /// `file` パートが無い（400）
    #[error("bad request: {0}")]
    BadRequest(String),

    /// プロキシ処理中の予期しない失敗（502）
    #[error("internal proxy failure: {0}")]
    Internal(String),
}

/// 外部ワークフローへの転送エラー
///
/// 呼び出し元には既に成功を返しているので、ログに残すだけ
#[derive(Debug, Error)]
pub enum UpstreamForwardError {
    #[error("failed to reach upstream processor: {0}")]
    Transport(String),

    #[error("upstream processor responded with {status}: {body}")]
    Status { status: u16, body: String },
}

/// アップロードクライアントのエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    /// ネットワーク呼び出し自体の失敗
    #[error("{0}")]
    Network(String),

    /// プロキシが成功以外のステータスを返した
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// レスポンスボディが解釈できない
    #[error("invalid response from upload endpoint: {0}")]
    InvalidResponse(String),
}

impl UploadError {
    /// 状態表示用のメッセージ
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// リアルタイムチャネルのエラー
#[derive(Debug, Error)]
pub enum ChannelError {
    /// フレームのJSONパース失敗（フレーム単位で破棄される）
    #[error("failed to parse channel frame: {0}")]
    Parse(#[from] serde_json::Error),

    /// 接続の確立に失敗（拒否など）
    #[error("failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    /// 接続中のトランスポートエラー（リセットなど）
    #[error("channel transport error: {0}")]
    Transport(String),
}

/// 状態遷移エラー
///
/// ユーザー操作が現在のフェーズで許可されていない場合に返す
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("cannot {action} while {from}")]
    InvalidTransition { from: Phase, action: &'static str },
}
