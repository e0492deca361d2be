//! CLI Argument Parsing
//!
//! CLIの引数解析

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ドキュメントをOCRワークフローへ送り、処理状況を追跡するCLI
#[derive(Parser, Debug, Clone)]
#[command(name = "ocrflow")]
#[command(about = "Upload documents for OCR and follow processing in real time", long_about = None)]
pub struct Args {
    /// Config file path
    #[arg(short, long, global = true, default_value = "./ocrflow.json")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the upload proxy in front of the workflow webhook
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Upload a file through the proxy and follow its processing
    Process {
        /// File to upload
        file: PathBuf,

        /// Proxy upload URL (overrides config)
        #[arg(long)]
        endpoint: Option<String>,

        /// Real-time channel base address (overrides config)
        #[arg(long = "channel-url")]
        channel_url: Option<String>,

        /// Download result files into this directory
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,
    },
}
