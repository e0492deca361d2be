//! # Realtime Channel Client
//!
//! セッションIDで識別されるリアルタイムチャネルを開き、受信したイベントを公開する
//!
//! - 接続は所有ハンドルとしてクライアント内に保持する（プロセス全体のシングルトンではない）
//! - 最新のイベントのみ保持する（`watch`）
//! - パースできないフレームは警告ログを出して捨てる
//! - complete / error を受信したら接続を閉じ、以降のフレームは読まない
//! - 再接続はしない

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::domain::entities::channel_event::ChannelEvent;
use crate::domain::repositories::channel_repository::ChannelConnector;

/// 開いている接続のハンドル
struct Connection {
    address: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// リアルタイムチャネルクライアント
///
/// ドロップ時に接続を閉じる
pub struct RealtimeChannelClient<C: ChannelConnector> {
    connector: Arc<C>,
    events: Arc<watch::Sender<Option<ChannelEvent>>>,
    connection: Option<Connection>,
}

impl<C: ChannelConnector + 'static> RealtimeChannelClient<C> {
    /// 新しいクライアントを作成
    pub fn new(connector: Arc<C>) -> Self {
        let (events, _) = watch::channel(None);
        Self {
            connector,
            events: Arc::new(events),
            connection: None,
        }
    }

    /// `address` へ接続
    ///
    /// 既に接続している場合は何もしない。接続の確立と受信は
    /// バックグラウンドタスクで行うので、Tokioランタイム内から呼ぶこと
    pub fn connect(&mut self, address: &str) {
        if self.is_connected() {
            debug!("Real-time channel already connected, skipping {}", address);
            return;
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_connection(
            self.connector.clone(),
            address.to_string(),
            self.events.clone(),
            shutdown_rx,
        ));

        self.connection = Some(Connection {
            address: address.to_string(),
            shutdown: Some(shutdown_tx),
            task,
        });
    }
}

impl<C: ChannelConnector> RealtimeChannelClient<C> {
    /// 接続を閉じる。閉じている場合は何もしない
    pub fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            debug!("Closing real-time channel {}", connection.address);
            if let Some(shutdown) = connection.shutdown.take() {
                // タスクが既に終了している場合は受信側がいない
                let _ = shutdown.send(());
            }
        }
    }

    /// 接続タスクが生きているかどうか
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| !connection.task.is_finished())
    }

    /// 接続先アドレス
    pub fn address(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.address.as_str())
    }

    /// 最新イベントの購読
    pub fn subscribe(&self) -> watch::Receiver<Option<ChannelEvent>> {
        self.events.subscribe()
    }

    /// 最新のイベント
    pub fn last_event(&self) -> Option<ChannelEvent> {
        self.events.borrow().clone()
    }

    /// 最新イベントを消去
    pub fn clear(&self) {
        self.events.send_replace(None);
    }
}

impl<C: ChannelConnector> Drop for RealtimeChannelClient<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// 接続を確立し、閉じられるまでフレームを受信する
async fn run_connection<C: ChannelConnector>(
    connector: Arc<C>,
    address: String,
    events: Arc<watch::Sender<Option<ChannelEvent>>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut transport = tokio::select! {
        _ = &mut shutdown => {
            debug!("Real-time channel closed before it was established");
            return;
        }
        opened = connector.open(&address) => match opened {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to connect real-time channel: {}", e);
                return;
            }
        },
    };

    info!("Real-time channel connected: {}", address);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                if let Err(e) = transport.close().await {
                    warn!("Failed to close real-time channel cleanly: {}", e);
                }
                break;
            }
            frame = transport.next_frame() => match frame {
                Some(Ok(text)) => match ChannelEvent::parse(&text) {
                    Ok(event) => {
                        debug!("Received {} event", event.kind());
                        let terminal = event.is_terminal();
                        events.send_replace(Some(event));

                        // 終端イベントを後続フレームで上書きさせない
                        if terminal {
                            if let Err(e) = transport.close().await {
                                warn!("Failed to close real-time channel cleanly: {}", e);
                            }
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping channel frame: {}", e),
                },
                Some(Err(e)) => {
                    error!("Real-time channel error: {}", e);
                    break;
                }
                None => break,
            },
        }
    }

    info!("Real-time channel disconnected: {}", address);
}
