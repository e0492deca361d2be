//! Workflow Orchestration
//!
//! ワークフローのオーケストレーション

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapter::config::{validate_channel_base, Config};
use crate::adapter::repositories::http_upload_repository::HttpUploadRepository;
use crate::adapter::repositories::webhook_processor_repository::WebhookProcessorRepository;
use crate::adapter::repositories::websocket_channel_repository::WebSocketConnector;
use crate::adapter::server::{self, create_router, AppState};
use crate::application::use_cases::admit_upload::AdmitUploadUseCase;
use crate::application::use_cases::process_document::ProcessDocumentUseCase;
use crate::domain::entities::channel_event::ResultFile;
use crate::domain::entities::processing_state::{Phase, ProcessingState, DEFAULT_PROCESSING_ERROR};
use crate::domain::entities::source_file::SourceFile;
use crate::domain::services::progress_estimator::{estimate_remaining, format_duration};

use super::cli::Command;

/// ファイルを読み込み、拡張子から種別を推定する
pub async fn read_source_file(path: &Path) -> Result<SourceFile> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    Ok(SourceFile::with_guessed_type(name, Bytes::from(content)))
}

/// 状態1件分の表示行
pub fn progress_line(state: &ProcessingState, processing_elapsed: Option<Duration>) -> String {
    match state.phase() {
        Phase::Uploading => format!("  ↑ {:>3.0}% {}", state.progress(), state.status()),
        Phase::Processing => {
            let line = format!("  … {:>3.0}% {}", state.progress(), state.status());
            let Some(elapsed) = processing_elapsed else {
                return line;
            };
            match estimate_remaining(state.progress(), elapsed) {
                Some(eta) => format!(
                    "{} (elapsed {}, about {} left)",
                    line,
                    format_duration(elapsed),
                    format_duration(eta)
                ),
                None => format!("{} (elapsed {})", line, format_duration(elapsed)),
            }
        }
        Phase::Complete => format!("✓ {}", state.status()),
        Phase::Error => format!("✗ {}", state.error().unwrap_or(DEFAULT_PROCESSING_ERROR)),
        Phase::Idle | Phase::FileSelected => format!("  {}", state.phase()),
    }
}

/// 結果ファイルの一覧
pub fn result_lines(results: &[ResultFile]) -> Vec<String> {
    results
        .iter()
        .map(|file| match &file.size {
            Some(size) => format!("    - {} ({}) {}", file.name, size, file.url),
            None => format!("    - {} {}", file.name, file.url),
        })
        .collect()
}

/// 結果ファイルの保存先。名前からディレクトリ成分を取り除く
fn download_target(dir: &Path, file: &ResultFile, index: usize) -> PathBuf {
    let name = Path::new(&file.name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| format!("result-{}", index + 1).into());
    dir.join(name)
}

async fn download_result(client: &reqwest::Client, file: &ResultFile, target: &Path) -> Result<()> {
    let response = client
        .get(&file.url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", file.url))?
        .error_for_status()
        .with_context(|| format!("Failed to fetch {}", file.url))?;
    let content = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read {}", file.url))?;
    tokio::fs::write(target, &content)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}

/// 結果ファイルを `dir` にダウンロードする
///
/// ファイル毎の失敗はログに残して次へ進む
///
/// # Returns
///
/// 保存できたファイルのパス
pub async fn download_results(
    client: &reqwest::Client,
    results: &[ResultFile],
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut saved = Vec::new();
    for (index, file) in results.iter().enumerate() {
        let target = download_target(dir, file, index);
        match download_result(client, file, &target).await {
            Ok(()) => {
                info!("Downloaded {} to {}", file.url, target.display());
                println!("  ✓ Saved {}", target.display());
                saved.push(target);
            }
            Err(e) => {
                warn!("Failed to download {}: {:#}", file.name, e);
                println!("  ⚠ Could not download {}", file.name);
            }
        }
    }
    Ok(saved)
}

/// 変化があった時だけ表示する
pub struct ProgressRenderer {
    last_line: Option<String>,
    processing_started: Option<Instant>,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self {
            last_line: None,
            processing_started: None,
        }
    }

    /// 前回と異なる行なら返す
    fn next_line(&mut self, state: &ProcessingState) -> Option<String> {
        if state.phase() == Phase::Processing && self.processing_started.is_none() {
            self.processing_started = Some(Instant::now());
        }
        let elapsed = self.processing_started.map(|started| started.elapsed());
        let line = progress_line(state, elapsed);

        // 経過時間と ETA だけが変わった行は出さない
        let key = line.split(" (elapsed").next().unwrap_or_default().to_string();
        if self.last_line.as_deref() == Some(key.as_str()) {
            return None;
        }
        self.last_line = Some(key);
        Some(line)
    }

    pub fn render(&mut self, state: &ProcessingState) {
        if let Some(line) = self.next_line(state) {
            println!("{}", line);
        }
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// OCR Workflow
pub struct OcrWorkflow {
    config: Config,
}

impl OcrWorkflow {
    /// Create a new workflow instance with dependency injection
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Execute the selected command
    pub async fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::Serve { bind } => self.serve(bind).await,
            Command::Process {
                file,
                endpoint,
                channel_url,
                output_dir,
            } => {
                let state = self
                    .process(&file, endpoint, channel_url, output_dir.as_deref())
                    .await?;
                if state.phase() == Phase::Error {
                    bail!(
                        "Processing failed: {}",
                        state.error().unwrap_or(DEFAULT_PROCESSING_ERROR)
                    );
                }
                Ok(())
            }
        }
    }

    /// プロキシを起動し、Ctrl-C まで配信する
    #[cfg_attr(coverage_nightly, coverage(off))]
    async fn serve(&self, bind: Option<String>) -> Result<()> {
        let bind = bind.unwrap_or_else(|| self.config.bind_address.clone());
        let settings = self.config.proxy_settings();

        let missing = settings.missing_keys();
        if missing.is_empty() {
            println!("✓ Forwarding uploads to the configured webhook");
        } else {
            // 起動は止めない。リクエスト毎に 500 を返す
            warn!("Proxy started without {}", missing.join(", "));
            println!("⚠ Missing configuration: {}", missing.join(", "));
            println!("  Uploads will be rejected until it is set");
        }

        let processor = Arc::new(WebhookProcessorRepository::new(reqwest::Client::new()));
        let state = AppState::new(AdmitUploadUseCase::new(processor, settings));
        let app = create_router(state, self.config.max_upload_bytes);

        println!("✓ Proxy listening on http://{}", bind);
        server::serve(app, &bind, server::shutdown_signal()).await
    }

    /// ファイルをアップロードし、終端フェーズまで追跡する
    ///
    /// # Returns
    ///
    /// 終端（complete / error）に達した時の状態。`output_dir` の
    /// ダウンロード失敗は結果に影響しない
    pub async fn process(
        &self,
        path: &Path,
        endpoint: Option<String>,
        channel_url: Option<String>,
        output_dir: Option<&Path>,
    ) -> Result<ProcessingState> {
        let endpoint = endpoint.unwrap_or_else(|| self.config.upload_endpoint.clone());
        let channel_base = match channel_url {
            Some(url) => {
                validate_channel_base(&url)?;
                url
            }
            None => self.config.channel_base()?.to_string(),
        };

        let file = read_source_file(path).await?;
        println!(
            "✓ Selected {} ({}, {})",
            file.name(),
            file.content_type(),
            file.display_size()
        );
        info!("Uploading to {}, channel {}", endpoint, channel_base);

        let client = reqwest::Client::new();
        let upload_repo = Arc::new(HttpUploadRepository::new(client.clone(), endpoint));
        let connector = Arc::new(WebSocketConnector::new());
        let mut use_case = ProcessDocumentUseCase::new(upload_repo, connector, channel_base);

        use_case.select_file(file)?;
        use_case.start()?;

        let mut renderer = ProgressRenderer::new();
        renderer.render(use_case.state());
        use_case
            .run_until_settled(|state| renderer.render(state))
            .await;

        let state = use_case.state().clone();
        if state.phase() == Phase::Complete {
            if state.results().is_empty() {
                println!("  No result files were returned");
            } else {
                println!("✓ {} result file(s):", state.results().len());
                for line in result_lines(state.results()) {
                    println!("{}", line);
                }
            }

            if let Some(dir) = output_dir {
                if let Err(e) = download_results(&client, state.results(), dir).await {
                    warn!("Skipping result downloads: {:#}", e);
                    println!("⚠ Could not save results to {}", dir.display());
                }
            }
        }

        use_case.reset();
        Ok(state)
    }
}
