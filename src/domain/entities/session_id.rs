//! # SessionId Value Object
//!
//! アップロード・外部処理・リアルタイムチャネルを紐付ける相関ID

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ランダムサフィックスの長さ
const SUFFIX_LEN: usize = 7;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// セッションID
///
/// プロキシがアップロード毎に1度だけ生成する不透明な文字列。
/// 形式は `session-<epochミリ秒>-<base36 7文字>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// 新しいセッションIDを生成
    ///
    /// 時刻成分とランダム成分を組み合わせるので、衝突の確率は極めて低い
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let random = uuid::Uuid::new_v4().as_u128();
        Self::from_parts(millis, &encode_base36(random, SUFFIX_LEN))
    }

    /// 時刻とサフィックスから組み立てる
    pub fn from_parts(millis: i64, suffix: &str) -> Self {
        Self(format!("session-{}-{}", millis, suffix))
    }

    /// 文字列への参照を返す
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を移動して文字列を返す
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// 数値を base36 で `len` 文字にエンコード
fn encode_base36(mut value: u128, len: usize) -> String {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    // BASE36 はASCIIのみ
    out.into_iter().map(char::from).collect()
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
