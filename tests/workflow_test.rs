//! End-to-end tests for the upload / processing workflow
//!
//! A real proxy is started in front of a fake workflow webhook and a fake
//! WebSocket server, and the production adapters drive the lifecycle.

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use ocrflow::adapter::config::Config;
use ocrflow::adapter::repositories::http_upload_repository::HttpUploadRepository;
use ocrflow::adapter::repositories::webhook_processor_repository::WebhookProcessorRepository;
use ocrflow::adapter::repositories::websocket_channel_repository::WebSocketConnector;
use ocrflow::adapter::server::{create_router, AppState};
use ocrflow::application::dto::proxy_settings::ProxySettings;
use ocrflow::application::use_cases::admit_upload::AdmitUploadUseCase;
use ocrflow::application::use_cases::process_document::ProcessDocumentUseCase;
use ocrflow::domain::entities::processing_state::Phase;
use ocrflow::domain::entities::source_file::SourceFile;
use ocrflow::domain::entities::channel_event::ResultFile;
use ocrflow::driver::workflow::{download_results, OcrWorkflow};

const API_KEY: &str = "test-key";

/// Webhook が受け取ったリクエスト
#[derive(Debug, Clone)]
struct ForwardedRequest {
    authorization: Option<String>,
    fields: HashMap<String, String>,
    file_name: Option<String>,
    file_len: usize,
}

type Received = Arc<Mutex<Vec<ForwardedRequest>>>;

async fn spawn_router(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn fake_webhook(
    State(received): State<Received>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> StatusCode {
    let mut request = ForwardedRequest {
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        fields: HashMap::new(),
        file_name: None,
        file_len: 0,
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            request.file_name = field.file_name().map(str::to_string);
            request.file_len = field.bytes().await.unwrap().len();
        } else {
            request.fields.insert(name, field.text().await.unwrap());
        }
    }
    received.lock().unwrap().push(request);
    StatusCode::OK
}

async fn spawn_upstream() -> (String, Received) {
    let received: Received = Arc::default();
    let app = Router::new()
        .route("/webhook/ocr", post(fake_webhook))
        .with_state(received.clone());
    let addr = spawn_router(app).await;
    (format!("http://{}/webhook/ocr", addr), received)
}

async fn spawn_proxy(settings: ProxySettings) -> String {
    let processor = Arc::new(WebhookProcessorRepository::new(reqwest::Client::new()));
    let state = AppState::new(AdmitUploadUseCase::new(processor, settings));
    let addr = spawn_router(create_router(state, 10 * 1024 * 1024)).await;
    format!("http://{}/api/webhook", addr)
}

/// 接続毎に `frames` を送り、接続時のURIを通知する WebSocket サーバー
async fn spawn_channel_server(frames: Vec<String>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (uri_tx, uri_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let frames = frames.clone();
            let uri_tx = uri_tx.clone();
            tokio::spawn(async move {
                let callback = |request: &Request, response: Response| {
                    let _ = uri_tx.send(request.uri().to_string());
                    Ok::<Response, ErrorResponse>(response)
                };
                let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                    .await
                    .unwrap();
                for frame in frames {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                // クライアントが閉じるまで待つ
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    (format!("ws://{}/ws", addr), uri_rx)
}

/// 結果ファイルを返すサーバー。`/files/missing.txt` は 404
async fn spawn_file_server() -> String {
    let app = Router::new()
        .route("/files/out.pdf", get(|| async { "%PDF-ocr-result" }))
        .route("/files/out.txt", get(|| async { "recognised text" }));
    let addr = spawn_router(app).await;
    format!("http://{}/files", addr)
}

fn test_file() -> SourceFile {
    SourceFile::with_guessed_type("scan.pdf", vec![b'x'; 200 * 1024].into())
}

#[tokio::test]
async fn test_upload_and_processing_complete() {
    let (webhook_url, received) = spawn_upstream().await;
    let proxy_url = spawn_proxy(ProxySettings::new(
        Some(webhook_url),
        Some(API_KEY.to_string()),
    ))
    .await;
    let (channel_base, mut uris) = spawn_channel_server(vec![
        r#"{"type":"progress","progress":30,"message":"Running OCR"}"#.to_string(),
        r#"{"type":"progress","progress":80}"#.to_string(),
        r#"{"type":"complete","data":{"files":[{"name":"out.pdf","url":"https://files.example.com/out.pdf","size":"210 KB"}]}}"#.to_string(),
    ])
    .await;

    let upload_repo = Arc::new(
        HttpUploadRepository::new(reqwest::Client::new(), proxy_url).with_chunk_size(16 * 1024),
    );
    let mut use_case = ProcessDocumentUseCase::new(
        upload_repo,
        Arc::new(WebSocketConnector::new()),
        channel_base,
    );

    use_case.select_file(test_file()).unwrap();
    use_case.start().unwrap();

    let mut upload_progress = Vec::new();
    let mut processing_progress = Vec::new();
    let phase = tokio::time::timeout(
        Duration::from_secs(10),
        use_case.run_until_settled(|state| match state.phase() {
            Phase::Uploading => upload_progress.push(state.progress()),
            Phase::Processing => processing_progress.push(state.progress()),
            _ => {}
        }),
    )
    .await
    .expect("workflow did not settle");

    assert_eq!(phase, Phase::Complete);
    let state = use_case.state();
    assert_eq!(state.progress(), 100.0);
    assert_eq!(state.status(), "Processing complete!");
    assert_eq!(state.results().len(), 1);
    assert_eq!(state.results()[0].name, "out.pdf");

    // アップロード進捗は単調増加で 100 に達する
    assert!(!upload_progress.is_empty());
    assert!(upload_progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(upload_progress.last(), Some(&100.0));
    assert!(processing_progress.windows(2).all(|w| w[0] <= w[1]));

    // チャネルはセッションIDで接続される
    let session_id = state.session_id().unwrap().as_str().to_string();
    assert!(session_id.starts_with("session-"));
    let uri = uris.recv().await.unwrap();
    assert_eq!(uri, format!("/ws?sessionId={}", session_id));

    // 上流へはファイルとセッションIDが Bearer 付きで転送される
    for _ in 0..100 {
        if !received.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let forwarded = received.lock().unwrap().clone();
    assert_eq!(forwarded.len(), 1);
    let request = &forwarded[0];
    assert_eq!(
        request.authorization.as_deref(),
        Some(format!("Bearer {}", API_KEY).as_str())
    );
    assert_eq!(request.fields.get("sessionId"), Some(&session_id));
    assert!(request.fields.contains_key("timestamp"));
    assert_eq!(request.file_name.as_deref(), Some("scan.pdf"));
    assert_eq!(request.file_len, 200 * 1024);

    // complete でチャネルは閉じている
    assert!(!use_case.channel().is_connected());
}

#[tokio::test]
async fn test_unconfigured_proxy_ends_in_error() {
    let proxy_url = spawn_proxy(ProxySettings::new(None, Some(API_KEY.to_string()))).await;
    let (channel_base, mut uris) = spawn_channel_server(Vec::new()).await;

    let mut use_case = ProcessDocumentUseCase::new(
        Arc::new(HttpUploadRepository::new(reqwest::Client::new(), proxy_url)),
        Arc::new(WebSocketConnector::new()),
        channel_base,
    );
    use_case.select_file(test_file()).unwrap();
    use_case.start().unwrap();

    let phase = tokio::time::timeout(Duration::from_secs(10), use_case.run_until_settled(|_| {}))
        .await
        .expect("workflow did not settle");

    assert_eq!(phase, Phase::Error);
    assert_eq!(
        use_case.state().error(),
        Some("Server is not configured correctly.")
    );
    // アップロード失敗時はチャネルを開かない
    assert!(uris.try_recv().is_err());
}

#[tokio::test]
async fn test_processing_error_event() {
    let (webhook_url, _received) = spawn_upstream().await;
    let proxy_url = spawn_proxy(ProxySettings::new(
        Some(webhook_url),
        Some(API_KEY.to_string()),
    ))
    .await;
    let (channel_base, _uris) = spawn_channel_server(vec![
        "garbage frame".to_string(),
        r#"{"type":"error","message":"OCR engine unavailable"}"#.to_string(),
    ])
    .await;

    let mut use_case = ProcessDocumentUseCase::new(
        Arc::new(HttpUploadRepository::new(reqwest::Client::new(), proxy_url)),
        Arc::new(WebSocketConnector::new()),
        channel_base,
    );
    use_case.select_file(test_file()).unwrap();
    use_case.start().unwrap();

    let phase = tokio::time::timeout(Duration::from_secs(10), use_case.run_until_settled(|_| {}))
        .await
        .expect("workflow did not settle");

    assert_eq!(phase, Phase::Error);
    assert_eq!(use_case.state().error(), Some("OCR engine unavailable"));
    assert!(!use_case.channel().is_connected());
}

#[tokio::test]
async fn test_cli_workflow_process_file() {
    let (webhook_url, received) = spawn_upstream().await;
    let proxy_url = spawn_proxy(ProxySettings::new(
        Some(webhook_url),
        Some(API_KEY.to_string()),
    ))
    .await;
    let (channel_base, _uris) = spawn_channel_server(vec![
        r#"{"type":"complete","message":"Done","data":{"files":[]}}"#.to_string(),
    ])
    .await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("receipt.png");
    std::fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();

    let config = Config {
        upload_endpoint: proxy_url,
        websocket_url: Some(channel_base),
        ..Config::default()
    };
    let workflow = OcrWorkflow::new(config);

    let state = tokio::time::timeout(
        Duration::from_secs(10),
        workflow.process(&path, None, None, None),
    )
    .await
    .expect("workflow did not settle")
    .unwrap();

    assert_eq!(state.phase(), Phase::Complete);
    assert_eq!(state.status(), "Done");
    assert!(state.results().is_empty());

    for _ in 0..100 {
        if !received.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(
        received.lock().unwrap()[0].file_name.as_deref(),
        Some("receipt.png")
    );
}

#[tokio::test]
async fn test_cli_workflow_upload_failure() {
    let proxy_url = spawn_proxy(ProxySettings::default()).await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scan.pdf");
    std::fs::write(&path, b"%PDF-1.7").unwrap();

    let workflow = OcrWorkflow::new(Config::default());
    let result = workflow
        .execute(ocrflow::driver::Command::Process {
            file: path,
            endpoint: Some(proxy_url),
            channel_url: Some("ws://127.0.0.1:9/ws".to_string()),
            output_dir: None,
        })
        .await;

    let err = result.unwrap_err();
    assert!(err
        .to_string()
        .contains("Server is not configured correctly."));
}

#[tokio::test]
async fn test_cli_workflow_downloads_results() {
    let (webhook_url, _received) = spawn_upstream().await;
    let proxy_url = spawn_proxy(ProxySettings::new(
        Some(webhook_url),
        Some(API_KEY.to_string()),
    ))
    .await;
    let files = spawn_file_server().await;
    let complete = serde_json::json!({
        "type": "complete",
        "data": {
            "files": [
                {"name": "out.pdf", "url": format!("{}/out.pdf", files), "size": "15 B"},
                {"name": "missing.txt", "url": format!("{}/missing.txt", files)},
                {"name": "nested/out.txt", "url": format!("{}/out.txt", files)},
            ]
        }
    });
    let (channel_base, _uris) = spawn_channel_server(vec![complete.to_string()]).await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scan.pdf");
    std::fs::write(&path, b"%PDF-1.7").unwrap();
    let output_dir = dir.path().join("results");

    let config = Config {
        upload_endpoint: proxy_url,
        websocket_url: Some(channel_base),
        ..Config::default()
    };
    let workflow = OcrWorkflow::new(config);

    let state = tokio::time::timeout(
        Duration::from_secs(10),
        workflow.process(&path, None, None, Some(output_dir.as_path())),
    )
    .await
    .expect("workflow did not settle")
    .unwrap();

    // ダウンロードの失敗は結果に影響しない
    assert_eq!(state.phase(), Phase::Complete);
    assert_eq!(state.results().len(), 3);

    assert_eq!(
        std::fs::read(output_dir.join("out.pdf")).unwrap(),
        b"%PDF-ocr-result"
    );
    assert_eq!(
        std::fs::read_to_string(output_dir.join("out.txt")).unwrap(),
        "recognised text"
    );
    assert!(!output_dir.join("missing.txt").exists());
    assert!(!output_dir.join("nested").exists());
}

#[tokio::test]
async fn test_download_results_reports_saved_files() {
    let files = spawn_file_server().await;
    let results = vec![
        ResultFile {
            name: "missing.txt".to_string(),
            url: format!("{}/missing.txt", files),
            size: None,
        },
        ResultFile {
            name: "out.pdf".to_string(),
            url: format!("{}/out.pdf", files),
            size: None,
        },
    ];

    let dir = TempDir::new().unwrap();
    let saved = download_results(&reqwest::Client::new(), &results, dir.path())
        .await
        .unwrap();

    assert_eq!(saved, vec![dir.path().join("out.pdf")]);
}
