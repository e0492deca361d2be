//! ocrflow - OCR upload proxy and processing client

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use anyhow::Result;
use clap::Parser;

use ocrflow::adapter::config::Config;
use ocrflow::driver::{Args, OcrWorkflow};

#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() -> Result<()> {
    // .env は任意
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Load configuration (file, then environment)
    let config = Config::load_or_default(&args.config)?.with_env_overrides();

    // Create workflow with injected dependencies
    let workflow = OcrWorkflow::new(config);

    workflow.execute(args.command).await
}
