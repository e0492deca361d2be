//! # Process Document Use Case
//!
//! アップロード〜処理完了のライフサイクルを駆動する
//!
//! 状態の変更は全て `&mut self` のメソッドで1イベントずつ行う。
//! アップロードとチャネル受信はバックグラウンドタスクで行い、結果はメッセージで届く。
//! リセット後に届いた古い試行の通知は世代番号で破棄する。

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::application::use_cases::realtime_channel::RealtimeChannelClient;
use crate::application::use_cases::upload_file::UploadClient;
use crate::domain::entities::channel_event::ChannelEvent;
use crate::domain::entities::processing_state::{Effect, Phase, ProcessingState};
use crate::domain::entities::session_id::SessionId;
use crate::domain::entities::source_file::SourceFile;
use crate::domain::entities::upload_state::UploadState;
use crate::domain::errors::{LifecycleError, UploadError};
use crate::domain::repositories::channel_repository::ChannelConnector;
use crate::domain::repositories::upload_repository::UploadRepository;

/// アップロードタスクからの通知
#[derive(Debug)]
pub enum UploadEvent {
    Progress {
        generation: u64,
        percent: u8,
    },
    Finished {
        generation: u64,
        result: Result<SessionId, UploadError>,
    },
}

impl UploadEvent {
    fn generation(&self) -> u64 {
        match self {
            UploadEvent::Progress { generation, .. } | UploadEvent::Finished { generation, .. } => {
                *generation
            }
        }
    }
}

/// ドキュメント処理ユースケース
pub struct ProcessDocumentUseCase<U: UploadRepository, C: ChannelConnector> {
    state: ProcessingState,
    upload_client: UploadClient<U>,
    channel: RealtimeChannelClient<C>,
    channel_events: watch::Receiver<Option<ChannelEvent>>,
    channel_base: String,
    generation: u64,
    upload_tx: mpsc::UnboundedSender<UploadEvent>,
    upload_rx: mpsc::UnboundedReceiver<UploadEvent>,
}

impl<U, C> ProcessDocumentUseCase<U, C>
where
    U: UploadRepository + 'static,
    C: ChannelConnector + 'static,
{
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `upload_repository` - プロキシへのアップロード
    /// * `connector` - リアルタイムチャネルの接続
    /// * `channel_base` - チャネルのベースアドレス（`?sessionId=` を付けて接続する）
    pub fn new(upload_repository: Arc<U>, connector: Arc<C>, channel_base: String) -> Self {
        let channel = RealtimeChannelClient::new(connector);
        let channel_events = channel.subscribe();
        let (upload_tx, upload_rx) = mpsc::unbounded_channel();

        Self {
            state: ProcessingState::new(),
            upload_client: UploadClient::new(upload_repository),
            channel,
            channel_events,
            channel_base,
            generation: 0,
            upload_tx,
            upload_rx,
        }
    }

    /// 現在のライフサイクル状態
    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// アップロードクライアントの状態
    pub fn upload_state(&self) -> UploadState {
        self.upload_client.state()
    }

    pub fn channel(&self) -> &RealtimeChannelClient<C> {
        &self.channel
    }

    /// ファイルを選択
    pub fn select_file(&mut self, file: SourceFile) -> Result<(), LifecycleError> {
        self.state.select_file(file)
    }

    /// 選択を取り消す
    pub fn remove_file(&mut self) -> Result<(), LifecycleError> {
        self.state.remove_file()
    }

    /// 選択したファイルのアップロードを開始
    ///
    /// Tokioランタイム内から呼ぶこと
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        let effect = self.state.start()?;
        self.execute(effect);
        Ok(())
    }

    /// どの状態からでも idle に戻し、チャネルも閉じる
    pub fn reset(&mut self) {
        self.generation += 1;
        let effect = self.state.reset();
        self.upload_client.reset();
        self.execute(effect);
        self.channel_events.borrow_and_update();
        info!("Processing state reset");
    }

    /// 次のイベントを待って適用する
    ///
    /// # Returns
    ///
    /// 適用後のフェーズ。アップロード中・処理中でない場合は待たずに `None`
    pub async fn next_update(&mut self) -> Option<Phase> {
        if !matches!(self.state.phase(), Phase::Uploading | Phase::Processing) {
            return None;
        }

        tokio::select! {
            Some(event) = self.upload_rx.recv() => {
                self.handle_upload_event(event);
            }
            Ok(()) = self.channel_events.changed() => {
                let event = self.channel_events.borrow_and_update().clone();
                if let Some(event) = event {
                    self.handle_channel_event(event);
                }
            }
            else => return None,
        }

        Some(self.state.phase())
    }

    /// 終端フェーズまでイベントを処理する
    ///
    /// 処理中にイベントが来なければ戻らない
    pub async fn run_until_settled<F>(&mut self, mut on_update: F) -> Phase
    where
        F: FnMut(&ProcessingState),
    {
        while self.next_update().await.is_some() {
            on_update(&self.state);
        }
        self.state.phase()
    }

    /// アップロードタスクの通知を適用
    ///
    /// # Returns
    ///
    /// 状態に反映された場合に `true`
    pub fn handle_upload_event(&mut self, event: UploadEvent) -> bool {
        if event.generation() != self.generation {
            debug!("Ignoring upload event from abandoned attempt");
            return false;
        }

        match event {
            UploadEvent::Progress { percent, .. } => self.state.upload_progress(percent),
            UploadEvent::Finished {
                result: Ok(session_id),
                ..
            } => match self.state.upload_succeeded(session_id, &self.channel_base) {
                Some(effect) => {
                    self.execute(effect);
                    true
                }
                None => false,
            },
            UploadEvent::Finished { result: Err(e), .. } => self.state.upload_failed(e.message()),
        }
    }

    /// チャネルイベントを適用
    ///
    /// # Returns
    ///
    /// 状態に反映された場合に `true`
    pub fn handle_channel_event(&mut self, event: ChannelEvent) -> bool {
        let kind = event.kind();
        match self.state.apply_channel_event(event) {
            Some(effects) => {
                for effect in effects {
                    self.execute(effect);
                }
                true
            }
            None => {
                debug!("Ignoring {} event while {}", kind, self.state.phase());
                false
            }
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartUpload(file) => self.spawn_upload(file),
            Effect::OpenChannel(address) => {
                info!("Opening real-time channel {}", address);
                self.channel.connect(&address);
            }
            Effect::CloseChannel => {
                self.channel.disconnect();
                self.channel.clear();
            }
        }
    }

    fn spawn_upload(&self, file: SourceFile) {
        let client = self.upload_client.clone();
        let tx = self.upload_tx.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            let progress_tx = tx.clone();
            let result = client
                .upload(&file, move |percent| {
                    let _ = progress_tx.send(UploadEvent::Progress {
                        generation,
                        percent,
                    });
                })
                .await;

            if tx.send(UploadEvent::Finished { generation, result }).is_err() {
                warn!("Upload finished after the workflow was dropped");
            }
        });
    }
}
