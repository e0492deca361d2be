//! Route definitions for the proxy server.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::AppState;
use crate::domain::repositories::processor_repository::ProcessorRepository;

/// ルーターを作成
///
/// `max_upload_bytes` はリクエストボディ全体の上限
pub fn create_router<P: ProcessorRepository + 'static>(
    state: AppState<P>,
    max_upload_bytes: usize,
) -> Router {
    Router::new()
        .route("/api/webhook", post(handlers::upload::<P>))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
