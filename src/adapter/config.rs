//! Configuration
//!
//! JSON設定ファイルと環境変数から設定を組み立てる

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::application::dto::proxy_settings::ProxySettings;

pub const ENV_WEBHOOK_URL: &str = "N8N_WEBHOOK_URL";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_WEBSOCKET_URL: &str = "N8N_WEBSOCKET_URL";
pub const ENV_BIND: &str = "OCRFLOW_BIND";
pub const ENV_ENDPOINT: &str = "OCRFLOW_ENDPOINT";

/// 既定のリクエストボディ上限（50 MiB）
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// 設定の検証エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is not set (config field `{field}`)")]
    Missing {
        key: &'static str,
        field: &'static str,
    },
    #[error("{key} is invalid ({value:?}): {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// 外部ワークフローのWebhook URL（プロキシ用）
    pub webhook_url: Option<String>,
    /// Webhookへの Bearer キー（プロキシ用）
    pub api_key: Option<String>,
    /// リアルタイムチャネルのベースアドレス（クライアント用）
    pub websocket_url: Option<String>,
    pub bind_address: String,
    /// クライアントがアップロードするプロキシのURL
    pub upload_endpoint: String,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: None,
            api_key: None,
            websocket_url: None,
            bind_address: "127.0.0.1:3000".to_string(),
            upload_endpoint: "http://127.0.0.1:3000/api/webhook".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// 設定ファイルを読み込む
    ///
    /// `~` はホームディレクトリに展開する
    pub fn load(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let content = fs::read_to_string(expanded.as_ref())
            .with_context(|| format!("Failed to read config file: {}", expanded))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON: {}", expanded))?;
        info!("Loaded configuration from {}", expanded);
        Ok(config)
    }

    /// 設定ファイルが無ければ既定値を使う
    pub fn load_or_default(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        if !Path::new(expanded.as_ref()).exists() {
            debug!("No config file at {}, using defaults", expanded);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// 環境変数で上書き
    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// `lookup` が返した空でない値で上書き
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_WEBHOOK_URL) {
            self.webhook_url = Some(v);
        }
        if let Some(v) = get(ENV_API_KEY) {
            self.api_key = Some(v);
        }
        if let Some(v) = get(ENV_WEBSOCKET_URL) {
            self.websocket_url = Some(v);
        }
        if let Some(v) = get(ENV_BIND) {
            self.bind_address = v;
        }
        if let Some(v) = get(ENV_ENDPOINT) {
            self.upload_endpoint = v;
        }
        self
    }

    /// プロキシの転送先設定
    ///
    /// 欠けていてもここではエラーにしない（リクエスト毎に検証する）
    pub fn proxy_settings(&self) -> ProxySettings {
        ProxySettings::new(self.webhook_url.clone(), self.api_key.clone())
    }

    /// リアルタイムチャネルのベースアドレス
    ///
    /// `ws://` か `wss://` の URL でなければエラー
    pub fn channel_base(&self) -> Result<&str, ConfigError> {
        let base = self
            .websocket_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing {
                key: ENV_WEBSOCKET_URL,
                field: "websocket_url",
            })?;
        validate_channel_base(base)?;
        Ok(base)
    }
}

/// チャネルのベースアドレスを検証する
pub fn validate_channel_base(base: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: ENV_WEBSOCKET_URL,
        value: base.to_string(),
        reason,
    };

    let url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(invalid(format!("expected a ws or wss URL, got {}", other))),
    }
}
