//! Repository Implementations
//!
//! Domain層のRepositoryトレイトの実装

pub mod http_upload_repository;
pub mod webhook_processor_repository;
pub mod websocket_channel_repository;
