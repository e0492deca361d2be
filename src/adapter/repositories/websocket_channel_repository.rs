//! WebSocket Channel Repository Implementation
//!
//! ChannelConnector / ChannelTransport の tokio-tungstenite 実装

use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::domain::errors::ChannelError;
use crate::domain::repositories::channel_repository::{ChannelConnector, ChannelTransport};

/// WebSocket コネクタ
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[async_trait]
impl ChannelConnector for WebSocketConnector {
    async fn open(&self, address: &str) -> Result<Box<dyn ChannelTransport>, ChannelError> {
        let (stream, response) =
            connect_async(address)
                .await
                .map_err(|e| ChannelError::Connect {
                    address: address.to_string(),
                    reason: e.to_string(),
                })?;
        debug!(
            "WebSocket handshake with {} returned {}",
            address,
            response.status()
        );
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

/// 確立済みの WebSocket 接続
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[async_trait]
impl ChannelTransport for WebSocketTransport {
    async fn next_frame(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(frame)) => {
                    debug!("Channel closed by peer: {:?}", frame);
                    return None;
                }
                // バイナリ・ping・pong は無視
                Ok(_) => continue,
                Err(e) => return Some(Err(ChannelError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }
}
