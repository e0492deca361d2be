//! # Domain Layer
//!
//! このモジュールはアップロード〜処理完了のライフサイクルを定義します。
//!
//! ## 特徴
//!
//! - I/Oを持たない（ネットワークやファイルについて何も知らない）
//! - フレームワークに依存しない
//! - 状態遷移の副作用は値として返す
//!
//! ## 構成要素
//!
//! - **entities**: エンティティと値オブジェクト（SessionId, ChannelEvent, ProcessingStateなど）
//! - **errors**: エラー分類
//! - **repositories**: Repository trait（インターフェース定義のみ）
//! - **services**: Domain Service（チャネルアドレス、残り時間の見積もり）

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;
