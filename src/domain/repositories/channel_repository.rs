//! # Channel Repository Traits
//!
//! リアルタイムチャネル（双方向の永続接続）を抽象化

use async_trait::async_trait;

use crate::domain::errors::ChannelError;

/// 接続を開くファクトリ
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// `address` への接続を確立
    ///
    /// # Errors
    ///
    /// 接続拒否などで確立できない場合に `ChannelError::Connect` を返す
    async fn open(&self, address: &str) -> Result<Box<dyn ChannelTransport>, ChannelError>;
}

/// 確立済みの接続
#[async_trait]
pub trait ChannelTransport: Send {
    /// 次のテキストフレームを待つ
    ///
    /// 相手が接続を閉じた場合は `None`
    async fn next_frame(&mut self) -> Option<Result<String, ChannelError>>;

    /// 接続を閉じる
    async fn close(&mut self) -> Result<(), ChannelError>;
}
