//! # ChannelEvent Entity
//!
//! リアルタイムチャネルから届くイベント（閉じた直和型）
//!
//! ワイヤ形式:
//!
//! ```json
//! {"type": "progress" | "complete" | "error", "progress": 40, "message": "...", "data": {"files": [...]}}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::errors::ChannelError;

/// 処理結果ファイル
///
/// `complete` イベントでのみ届く。受信後は不変
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub name: String,
    /// 取得先URL
    pub url: String,
    /// 人が読めるサイズ表記（任意）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// `complete` イベントのペイロード
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionData {
    #[serde(default)]
    pub files: Vec<ResultFile>,
}

/// チャネルイベント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelEvent {
    /// 処理の進捗
    Progress {
        #[serde(rename = "progress", default, skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// 処理完了
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default)]
        data: CompletionData,
    },
    /// 外部処理側で発生したエラー
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl ChannelEvent {
    /// テキストフレームをパース
    ///
    /// # Errors
    ///
    /// JSONとして不正、または `type` が未知の場合に `ChannelError::Parse` を返す
    pub fn parse(frame: &str) -> Result<Self, ChannelError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// チャネルを閉じるべき終端イベントかどうか
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelEvent::Progress { .. })
    }

    /// イベント種別名（ログ用）
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelEvent::Progress { .. } => "progress",
            ChannelEvent::Complete { .. } => "complete",
            ChannelEvent::Error { .. } => "error",
        }
    }
}
