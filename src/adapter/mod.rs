//! Adapter Layer
//!
//! 外部システム（HTTP, WebSocket, 設定ファイル）との統合

pub mod config;
pub mod repositories;
pub mod server;
