//! Webhook Processor Repository Implementation
//!
//! ProcessorRepositoryの reqwest 実装（外部ワークフローの Webhook へ転送）

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Body;

use crate::domain::entities::submission::{Submission, UpstreamTarget};
use crate::domain::errors::UpstreamForwardError;
use crate::domain::repositories::processor_repository::ProcessorRepository;

/// Webhook 転送リポジトリ
pub struct WebhookProcessorRepository {
    client: reqwest::Client,
}

impl WebhookProcessorRepository {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// `file`・`timestamp`（ある場合のみ）・`sessionId` のフォーム
    fn build_form(submission: Submission) -> Result<Form, UpstreamForwardError> {
        let Submission {
            file,
            session_id,
            timestamp,
        } = submission;

        let part = Part::stream_with_length(Body::from(file.content().clone()), file.len())
            .file_name(file.name().to_string())
            .mime_str(file.content_type())
            .map_err(|e| UpstreamForwardError::Transport(e.to_string()))?;

        let mut form = Form::new().part("file", part);
        if let Some(timestamp) = timestamp {
            form = form.text("timestamp", timestamp);
        }
        Ok(form.text("sessionId", session_id.into_inner()))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[async_trait]
impl ProcessorRepository for WebhookProcessorRepository {
    async fn forward(
        &self,
        target: &UpstreamTarget,
        submission: Submission,
    ) -> Result<(), UpstreamForwardError> {
        debug!(
            "Forwarding {} to {}",
            submission.session_id, target.webhook_url
        );
        let form = Self::build_form(submission)?;

        let response = self
            .client
            .post(&target.webhook_url)
            .bearer_auth(&target.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UpstreamForwardError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamForwardError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
