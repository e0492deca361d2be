//! Proxy Server
//!
//! アップロードを受け付けて外部ワークフローへ転送する HTTP サーバー

mod handlers;
mod routes;

pub use routes::create_router;

use anyhow::{Context, Result};
use log::{info, warn};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::application::use_cases::admit_upload::AdmitUploadUseCase;
use crate::domain::repositories::processor_repository::ProcessorRepository;

/// ハンドラ間で共有する状態
pub struct AppState<P: ProcessorRepository> {
    pub admit: Arc<AdmitUploadUseCase<P>>,
}

impl<P: ProcessorRepository> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            admit: self.admit.clone(),
        }
    }
}

impl<P: ProcessorRepository + 'static> AppState<P> {
    pub fn new(admit: AdmitUploadUseCase<P>) -> Self {
        Self {
            admit: Arc::new(admit),
        }
    }
}

/// アドレスにバインドし、`shutdown` が完了するまで配信する
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn serve<F>(app: axum::Router, bind_address: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind_address))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Proxy listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Proxy server error")?;
    info!("Proxy stopped");

    Ok(())
}

/// Ctrl-C で完了する
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
