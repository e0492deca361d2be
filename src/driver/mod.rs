//! # Driver Layer (Presentation)
//!
//! CLIやその他の外部インターフェースを提供
//!
//! ## 特徴
//!
//! - Use Caseを呼び出してビジネスフローを起動
//! - 依存性注入（DI）を行い、全てを組み立てる
//! - 進捗と結果を端末に表示
//!
//! ## 構成要素
//!
//! - **cli**: CLI引数のパース
//! - **workflow**: プロキシ起動・ドキュメント処理のオーケストレーション

pub mod cli;
pub mod workflow;

pub use cli::{Args, Command};
pub use workflow::OcrWorkflow;
