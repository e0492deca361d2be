//! # Proxy Settings DTO
//!
//! プロキシが上流へ転送するための設定

use crate::domain::entities::submission::UpstreamTarget;
use crate::domain::errors::ProxyError;

/// プロキシ設定
///
/// 値はリクエスト毎に検証する。未設定を既定値で埋めることはしない
#[derive(Debug, Clone, Default)]
pub struct ProxySettings {
    /// 外部ワークフローのWebhook URL
    pub webhook_url: Option<String>,
    /// Bearer認証用のAPIキー
    pub api_key: Option<String>,
}

impl ProxySettings {
    /// 新しいプロキシ設定を作成します。
    ///
    /// # 例
    ///
    /// ```
    /// use ocrflow::application::dto::proxy_settings::ProxySettings;
    ///
    /// let settings = ProxySettings::new(
    ///     Some("https://n8n.example.com/webhook/ocr".to_string()),
    ///     Some("secret".to_string()),
    /// );
    /// let target = settings.resolve().unwrap();
    /// assert_eq!(target.webhook_url, "https://n8n.example.com/webhook/ocr");
    ///
    /// // APIキーが無い場合は設定エラー
    /// let missing = ProxySettings::new(Some("https://n8n.example.com".to_string()), None);
    /// assert!(missing.resolve().is_err());
    /// ```
    pub fn new(webhook_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            webhook_url,
            api_key,
        }
    }

    /// 未設定の項目名
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if non_blank(&self.webhook_url).is_none() {
            missing.push("webhook_url");
        }
        if non_blank(&self.api_key).is_none() {
            missing.push("api_key");
        }
        missing
    }

    /// 転送先を解決
    ///
    /// # Errors
    ///
    /// URL またはAPIキーが未設定（空文字を含む）の場合に `ProxyError::Configuration`
    pub fn resolve(&self) -> Result<UpstreamTarget, ProxyError> {
        match (non_blank(&self.webhook_url), non_blank(&self.api_key)) {
            (Some(webhook_url), Some(api_key)) => Ok(UpstreamTarget {
                webhook_url: webhook_url.to_string(),
                api_key: api_key.to_string(),
            }),
            _ => Err(ProxyError::Configuration(format!(
                "missing {}",
                self.missing_keys().join(", ")
            ))),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
