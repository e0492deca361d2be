//! # Data Transfer Objects
//!
//! ユースケースの入力

pub mod incoming_upload;
pub mod proxy_settings;
