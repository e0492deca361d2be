//! # Domain Entities
//!
//! ビジネスエンティティと値オブジェクト

pub mod channel_event;
pub mod processing_state;
pub mod session_id;
pub mod source_file;
pub mod submission;
pub mod upload_state;
