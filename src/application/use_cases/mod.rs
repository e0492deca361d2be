//! # Use Cases
//!
//! アプリケーションのビジネスフロー（ユースケース）
//!
//! ## ユースケース
//!
//! - **AdmitUploadUseCase**: アップロードの受付と外部ワークフローへの転送（プロキシ側）
//! - **UploadClient**: プロキシへのアップロードと進捗の追跡
//! - **RealtimeChannelClient**: セッション毎のリアルタイムチャネル
//! - **ProcessDocumentUseCase**: アップロード〜処理完了の状態機械の駆動

pub mod admit_upload;
pub mod process_document;
pub mod realtime_channel;
pub mod upload_file;
