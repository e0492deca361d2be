//! # Domain Services
//!
//! エンティティに属さないビジネスルール

pub mod channel_address;
pub mod progress_estimator;
