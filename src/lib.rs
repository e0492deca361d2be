//! # ocrflow
//!
//! ドキュメントをOCRワークフローへアップロードし、処理状況をリアルタイムに追跡するツール
//!
//! このプロジェクトはクリーンアーキテクチャを採用しており、以下の4層で構成されています：
//!
//! - **Domain層**: 状態機械・イベント・エラー分類（外部依存なし）
//! - **Application層**: アップロード受付、アップロード、チャネル購読、処理ライフサイクル（ユースケース）
//! - **Adapter層**: 外部システムとの統合（HTTPサーバー, reqwest, WebSocket, 設定ファイル）
//! - **Driver層**: CLI、依存性注入、端末表示

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
// カバレッジ計測時にネットワーク依存コードを除外するために使用
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// Domain層（純粋なビジネスロジック）
pub mod domain;

// Application層（ユースケース）
pub mod application;

// Adapter層（Infrastructure）
pub mod adapter;

// Driver層（Presentation）
pub mod driver;
