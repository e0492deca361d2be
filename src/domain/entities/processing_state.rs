//! # ProcessingState Entity
//!
//! アップロード〜処理完了までのライフサイクル状態機械
//!
//! ```text
//! idle --select--> file_selected --start--> uploading --成功--> processing --complete--> complete
//!                                               |                   |
//!                                               +--失敗--> error <--+--error
//! complete / error --reset--> idle
//! ```
//!
//! 状態機械自体はI/Oを持たず、副作用は [`Effect`] として呼び出し元に返す。

use std::fmt;

use super::channel_event::{ChannelEvent, ResultFile};
use super::session_id::SessionId;
use super::source_file::SourceFile;
use crate::domain::errors::LifecycleError;
use crate::domain::services::channel_address::channel_address;

pub const STATUS_UPLOADING: &str = "Uploading file...";
pub const STATUS_AWAITING_PROCESSING: &str = "Upload complete. Waiting for processing to begin...";
pub const STATUS_PROCESSING: &str = "Processing...";
pub const STATUS_COMPLETE: &str = "Processing complete!";
pub const DEFAULT_PROCESSING_ERROR: &str = "An error occurred during processing.";

/// アプリケーションのフェーズ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    FileSelected,
    Uploading,
    Processing,
    Complete,
    Error,
}

impl Phase {
    /// リセットするまで抜けられないフェーズ
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::FileSelected => "file_selected",
            Phase::Uploading => "uploading",
            Phase::Processing => "processing",
            Phase::Complete => "complete",
            Phase::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 状態遷移が要求する副作用
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// ファイルのアップロードを開始
    StartUpload(SourceFile),
    /// リアルタイムチャネルを開く
    OpenChannel(String),
    /// リアルタイムチャネルを閉じる
    CloseChannel,
}

/// ライフサイクル状態
///
/// 全ての遷移はこの型を経由する。進捗の表示値はアップロード中は
/// アップロード進捗、処理中はチャネルの進捗のみで決まり、両者は混ざらない
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingState {
    phase: Phase,
    file: Option<SourceFile>,
    progress: f64,
    status: String,
    session_id: Option<SessionId>,
    results: Vec<ResultFile>,
    error: Option<String>,
}

impl ProcessingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn file(&self) -> Option<&SourceFile> {
        self.file.as_ref()
    }

    /// 表示用の進捗（0〜100）
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn results(&self) -> &[ResultFile] {
        &self.results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// ファイルを選択（idle / file_selected から）
    pub fn select_file(&mut self, file: SourceFile) -> Result<(), LifecycleError> {
        match self.phase {
            Phase::Idle | Phase::FileSelected => {
                self.file = Some(file);
                self.phase = Phase::FileSelected;
                Ok(())
            }
            from => Err(LifecycleError::InvalidTransition {
                from,
                action: "select a file",
            }),
        }
    }

    /// 選択を取り消す（file_selected から）
    pub fn remove_file(&mut self) -> Result<(), LifecycleError> {
        match self.phase {
            Phase::FileSelected => {
                self.file = None;
                self.phase = Phase::Idle;
                Ok(())
            }
            from => Err(LifecycleError::InvalidTransition {
                from,
                action: "remove the file",
            }),
        }
    }

    /// 処理を開始（file_selected から）
    pub fn start(&mut self) -> Result<Effect, LifecycleError> {
        match (self.phase, &self.file) {
            (Phase::FileSelected, Some(file)) => {
                let effect = Effect::StartUpload(file.clone());
                self.phase = Phase::Uploading;
                self.progress = 0.0;
                self.status = STATUS_UPLOADING.to_string();
                self.error = None;
                Ok(effect)
            }
            (from, _) => Err(LifecycleError::InvalidTransition {
                from,
                action: "start processing",
            }),
        }
    }

    /// アップロード進捗を反映（uploading のみ）
    pub fn upload_progress(&mut self, percent: u8) -> bool {
        if self.phase != Phase::Uploading {
            return false;
        }
        let percent = f64::from(percent.min(100));
        if percent > self.progress {
            self.progress = percent;
        }
        true
    }

    /// アップロード成功 → processing
    ///
    /// 進捗はチャネル駆動に切り替わるので0に戻す
    pub fn upload_succeeded(&mut self, session_id: SessionId, channel_base: &str) -> Option<Effect> {
        if self.phase != Phase::Uploading {
            return None;
        }

        let address = channel_address(channel_base, &session_id);
        self.phase = Phase::Processing;
        self.progress = 0.0;
        self.status = STATUS_AWAITING_PROCESSING.to_string();
        self.session_id = Some(session_id);
        Some(Effect::OpenChannel(address))
    }

    /// アップロード失敗 → error（チャネルは開かない）
    pub fn upload_failed(&mut self, message: String) -> bool {
        if self.phase != Phase::Uploading {
            return false;
        }
        self.phase = Phase::Error;
        self.status = message.clone();
        self.error = Some(message);
        true
    }

    /// チャネルイベントを反映（processing のみ）
    ///
    /// 終端イベントの後に届いたイベントはフェーズが変わっているので無視される
    ///
    /// # Returns
    ///
    /// イベントが適用された場合に `Some`。終端イベントなら `CloseChannel` を含む
    pub fn apply_channel_event(&mut self, event: ChannelEvent) -> Option<Vec<Effect>> {
        if self.phase != Phase::Processing {
            return None;
        }

        match event {
            ChannelEvent::Progress { percent, message } => {
                if let Some(percent) = percent.filter(|p| p.is_finite()) {
                    let percent = percent.clamp(0.0, 100.0);
                    if percent > self.progress {
                        self.progress = percent;
                    }
                }
                self.status = message.unwrap_or_else(|| STATUS_PROCESSING.to_string());
                Some(Vec::new())
            }
            ChannelEvent::Complete { message, data } => {
                self.phase = Phase::Complete;
                self.progress = 100.0;
                self.status = message.unwrap_or_else(|| STATUS_COMPLETE.to_string());
                self.results = data.files;
                Some(vec![Effect::CloseChannel])
            }
            ChannelEvent::Error { message } => {
                let message = message.unwrap_or_else(|| DEFAULT_PROCESSING_ERROR.to_string());
                self.phase = Phase::Error;
                self.status = message.clone();
                self.error = Some(message);
                Some(vec![Effect::CloseChannel])
            }
        }
    }

    /// どのフェーズからでも idle に戻す
    ///
    /// 開いているチャネルも一緒に閉じる必要がある
    pub fn reset(&mut self) -> Effect {
        *self = Self::default();
        Effect::CloseChannel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::domain::entities::channel_event::CompletionData;

    const BASE: &str = "wss://hooks.example.com/ws";

    fn test_file() -> SourceFile {
        SourceFile::new("scan.pdf", "application/pdf", Bytes::from_static(b"%PDF-1.7"))
    }

    fn processing_state() -> ProcessingState {
        let mut state = ProcessingState::new();
        state.select_file(test_file()).unwrap();
        state.start().unwrap();
        state.upload_succeeded(SessionId::from("session-1-abc"), BASE);
        state
    }

    fn progress(percent: f64) -> ChannelEvent {
        ChannelEvent::Progress {
            percent: Some(percent),
            message: None,
        }
    }

    #[test]
    fn test_initial_state() {
        let state = ProcessingState::new();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.progress(), 0.0);
        assert!(state.results().is_empty());
        assert!(state.error().is_none());
    }

    #[test]
    fn test_select_and_remove_file() {
        let mut state = ProcessingState::new();
        state.select_file(test_file()).unwrap();
        assert_eq!(state.phase(), Phase::FileSelected);
        assert_eq!(state.file().unwrap().name(), "scan.pdf");

        // 選択し直しも可能
        state
            .select_file(SourceFile::new("other.png", "image/png", Bytes::new()))
            .unwrap();
        assert_eq!(state.file().unwrap().name(), "other.png");

        state.remove_file().unwrap();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.file().is_none());
    }

    #[test]
    fn test_start_requires_selected_file() {
        let mut state = ProcessingState::new();
        let err = state.start().unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: Phase::Idle,
                action: "start processing"
            }
        );
    }

    #[test]
    fn test_start_emits_upload_effect() {
        let mut state = ProcessingState::new();
        state.select_file(test_file()).unwrap();

        let effect = state.start().unwrap();
        assert_eq!(effect, Effect::StartUpload(test_file()));
        assert_eq!(state.phase(), Phase::Uploading);
        assert_eq!(state.status(), STATUS_UPLOADING);
    }

    #[test]
    fn test_cannot_select_while_uploading() {
        let mut state = ProcessingState::new();
        state.select_file(test_file()).unwrap();
        state.start().unwrap();

        assert!(state.select_file(test_file()).is_err());
        assert!(state.remove_file().is_err());
        assert!(state.start().is_err());
    }

    #[test]
    fn test_upload_progress_tracks_upload_only() {
        let mut state = ProcessingState::new();
        state.select_file(test_file()).unwrap();
        state.start().unwrap();

        assert!(state.upload_progress(30));
        assert!(state.upload_progress(20));
        assert_eq!(state.progress(), 30.0);

        state.upload_succeeded(SessionId::from("session-1-abc"), BASE);
        // processing に入ったらアップロード進捗は反映しない
        assert!(!state.upload_progress(90));
        assert_eq!(state.progress(), 0.0);
    }

    #[test]
    fn test_upload_succeeded_opens_channel() {
        let mut state = ProcessingState::new();
        state.select_file(test_file()).unwrap();
        state.start().unwrap();

        let effect = state.upload_succeeded(SessionId::from("session-1700000000-abc1234"), BASE);

        assert_eq!(
            effect,
            Some(Effect::OpenChannel(
                "wss://hooks.example.com/ws?sessionId=session-1700000000-abc1234".to_string()
            ))
        );
        assert_eq!(state.phase(), Phase::Processing);
        assert_eq!(state.status(), STATUS_AWAITING_PROCESSING);
        assert_eq!(
            state.session_id().unwrap().as_str(),
            "session-1700000000-abc1234"
        );
    }

    #[test]
    fn test_upload_failed_goes_to_error_without_channel() {
        let mut state = ProcessingState::new();
        state.select_file(test_file()).unwrap();
        state.start().unwrap();

        assert!(state.upload_failed("Network Error".to_string()));
        assert_eq!(state.phase(), Phase::Error);
        assert_eq!(state.error(), Some("Network Error"));
        assert!(state.session_id().is_none());

        // 失敗後の成功通知は無視
        assert!(state
            .upload_succeeded(SessionId::from("session-1-abc"), BASE)
            .is_none());
        assert_eq!(state.phase(), Phase::Error);
    }

    #[test]
    fn test_channel_progress_is_non_decreasing() {
        let mut state = processing_state();

        let mut seen = Vec::new();
        for p in [10.0, 35.0, 20.0, 35.0, 80.0, 5.0] {
            state.apply_channel_event(progress(p)).unwrap();
            seen.push(state.progress());
        }

        assert_eq!(seen, vec![10.0, 35.0, 35.0, 35.0, 80.0, 80.0]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_channel_progress_clamped_and_status() {
        let mut state = processing_state();

        state
            .apply_channel_event(ChannelEvent::Progress {
                percent: Some(250.0),
                message: Some("Extracting text".to_string()),
            })
            .unwrap();
        assert_eq!(state.progress(), 100.0);
        assert_eq!(state.status(), "Extracting text");
        assert_eq!(state.phase(), Phase::Processing);

        state
            .apply_channel_event(ChannelEvent::Progress {
                percent: None,
                message: None,
            })
            .unwrap();
        assert_eq!(state.status(), STATUS_PROCESSING);
    }

    #[test]
    fn test_complete_event() {
        let mut state = processing_state();
        state.apply_channel_event(progress(40.0));

        let effects = state
            .apply_channel_event(ChannelEvent::Complete {
                message: None,
                data: CompletionData {
                    files: vec![ResultFile {
                        name: "out.pdf".to_string(),
                        url: "https://x/out.pdf".to_string(),
                        size: None,
                    }],
                },
            })
            .unwrap();

        assert_eq!(effects, vec![Effect::CloseChannel]);
        assert_eq!(state.phase(), Phase::Complete);
        assert_eq!(state.progress(), 100.0);
        assert_eq!(state.results().len(), 1);
        assert_eq!(state.results()[0].name, "out.pdf");
        assert_eq!(state.status(), STATUS_COMPLETE);
    }

    #[test]
    fn test_error_event() {
        let mut state = processing_state();

        let effects = state
            .apply_channel_event(ChannelEvent::Error { message: None })
            .unwrap();

        assert_eq!(effects, vec![Effect::CloseChannel]);
        assert_eq!(state.phase(), Phase::Error);
        assert_eq!(state.error(), Some(DEFAULT_PROCESSING_ERROR));
    }

    #[test]
    fn test_events_after_terminal_are_ignored() {
        let mut state = processing_state();
        state.apply_channel_event(ChannelEvent::Error {
            message: Some("failed".to_string()),
        });

        assert!(state.apply_channel_event(progress(50.0)).is_none());
        assert!(state
            .apply_channel_event(ChannelEvent::Complete {
                message: None,
                data: CompletionData::default(),
            })
            .is_none());
        assert_eq!(state.phase(), Phase::Error);
        assert_eq!(state.error(), Some("failed"));
    }

    #[test]
    fn test_channel_event_outside_processing_ignored() {
        let mut state = ProcessingState::new();
        assert!(state.apply_channel_event(progress(50.0)).is_none());
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_reset_from_every_phase() {
        let mut states = vec![ProcessingState::new()];

        let mut selected = ProcessingState::new();
        selected.select_file(test_file()).unwrap();
        states.push(selected.clone());

        let mut uploading = selected.clone();
        uploading.start().unwrap();
        uploading.upload_progress(70);
        states.push(uploading.clone());

        let mut processing = processing_state();
        processing.apply_channel_event(progress(60.0));
        states.push(processing.clone());

        let mut complete = processing.clone();
        complete.apply_channel_event(ChannelEvent::Complete {
            message: None,
            data: CompletionData::default(),
        });
        states.push(complete);

        let mut failed = uploading;
        failed.upload_failed("boom".to_string());
        states.push(failed);

        for mut state in states {
            assert_eq!(state.reset(), Effect::CloseChannel);
            assert_eq!(state, ProcessingState::new());
            assert_eq!(state.phase(), Phase::Idle);
            assert_eq!(state.progress(), 0.0);
            assert!(state.results().is_empty());
            assert!(state.error().is_none());
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::FileSelected.to_string(), "file_selected");
        assert!(Phase::Complete.is_terminal());
        assert!(Phase::Error.is_terminal());
        assert!(!Phase::Processing.is_terminal());
    }
}
