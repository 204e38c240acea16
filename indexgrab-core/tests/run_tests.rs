// Tests for run orchestration

use indexgrab_core::run::{RunMode, RunOptions, execute_download, execute_run};
use indexgrab_scanner::{FilterSpec, RetryPolicy, ScanEvent, SharedSink};
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn listing_html(hrefs: &[&str]) -> String {
    let mut html = String::from("<html><body><h1>Index of /</h1><pre>");
    html.push_str(r#"<a href="?C=N;O=D">Name</a> <a href="../">Parent Directory</a>"#);
    for href in hrefs {
        html.push_str(&format!(r#"<a href="{}">{}</a>"#, href, href));
    }
    html.push_str("</pre></body></html>");
    html
}

async fn mount_listing(server: &MockServer, at: &str, hrefs: &[&str]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(listing_html(hrefs).into_bytes()),
        )
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(body.as_bytes().to_vec()),
        )
        .mount(server)
        .await;
}

/// /pub/ holds a.txt, b.log and docs/ with c.txt inside
async fn mirror_tree(server: &MockServer) {
    mount_listing(server, "/pub/", &["a.txt", "b.log", "docs/"]).await;
    mount_listing(server, "/pub/docs/", &["c.txt"]).await;
    mount_file(server, "/pub/a.txt", "alpha").await;
    mount_file(server, "/pub/b.log", "bravo").await;
    mount_file(server, "/pub/docs/c.txt", "charlie").await;
}

fn root(server: &MockServer) -> Url {
    Url::parse(&format!("{}/pub/", server.uri())).unwrap()
}

fn options(dest: &std::path::Path, mode: RunMode) -> RunOptions {
    RunOptions {
        destination: dest.to_path_buf(),
        workers: 2,
        retry: RetryPolicy::new(2).without_backoff(),
        mode,
        ..RunOptions::default()
    }
}

fn recording_sink() -> (SharedSink, Arc<Mutex<Vec<ScanEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = events.clone();
    let sink: SharedSink = Arc::new(move |event: ScanEvent| {
        recorded.lock().unwrap().push(event);
    });
    (sink, events)
}

#[tokio::test]
async fn test_two_phase_run_mirrors_tree() {
    let server = MockServer::start().await;
    mirror_tree(&server).await;
    let dest = tempfile::tempdir().unwrap();

    let report = execute_run(root(&server), options(dest.path(), RunMode::TwoPhase), None)
        .await
        .unwrap();

    assert_eq!(report.discovered.len(), 3);
    assert_eq!(report.downloads.succeeded(), 3);
    assert!(!report.has_failures());
    assert_eq!(
        std::fs::read_to_string(dest.path().join("pub/a.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(
        std::fs::read_to_string(dest.path().join("pub/docs/c.txt")).unwrap(),
        "charlie"
    );
}

#[tokio::test]
async fn test_streaming_run_matches_two_phase() {
    let server = MockServer::start().await;
    mirror_tree(&server).await;
    let dest = tempfile::tempdir().unwrap();

    let report = execute_run(root(&server), options(dest.path(), RunMode::Streaming), None)
        .await
        .unwrap();

    assert_eq!(report.mode, RunMode::Streaming);
    assert_eq!(report.discovered.len(), 3);
    assert_eq!(report.downloads.len(), 3);
    assert_eq!(report.downloads.succeeded(), 3);
    assert!(dest.path().join("pub/b.log").is_file());
}

#[tokio::test]
async fn test_list_only_run_downloads_nothing() {
    let server = MockServer::start().await;
    mirror_tree(&server).await;
    let dest = tempfile::tempdir().unwrap();

    let report = execute_run(root(&server), options(dest.path(), RunMode::ListOnly), None)
        .await
        .unwrap();

    assert_eq!(report.discovered.len(), 3);
    assert!(report.downloads.is_empty());
    assert!(!dest.path().join("pub").exists());
}

#[tokio::test]
async fn test_run_applies_filter() {
    let server = MockServer::start().await;
    mirror_tree(&server).await;
    let dest = tempfile::tempdir().unwrap();

    let mut opts = options(dest.path(), RunMode::TwoPhase);
    opts.filter = FilterSpec::new().with_extensions([".txt"]);

    let report = execute_run(root(&server), opts, None).await.unwrap();

    assert_eq!(report.discovered.len(), 2);
    assert!(!dest.path().join("pub/b.log").exists());
}

#[tokio::test]
async fn test_run_reports_partial_failure() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["ok.txt", "gone.txt"]).await;
    mount_file(&server, "/pub/ok.txt", "fine").await;
    Mock::given(method("GET"))
        .and(path("/pub/gone.txt"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    let dest = tempfile::tempdir().unwrap();

    let report = execute_run(root(&server), options(dest.path(), RunMode::TwoPhase), None)
        .await
        .unwrap();

    assert!(report.has_failures());
    assert_eq!(report.downloads.succeeded(), 1);
    assert_eq!(report.downloads.failed(), 1);
}

#[tokio::test]
async fn test_run_root_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pub/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let dest = tempfile::tempdir().unwrap();

    let result = execute_run(root(&server), options(dest.path(), RunMode::Streaming), None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_run_forwards_events_to_caller_sink() {
    let server = MockServer::start().await;
    mirror_tree(&server).await;
    let dest = tempfile::tempdir().unwrap();
    let (sink, events) = recording_sink();

    execute_run(
        root(&server),
        options(dest.path(), RunMode::TwoPhase),
        Some(sink),
    )
    .await
    .unwrap();

    let events = events.lock().unwrap();
    let discovered = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::FileDiscovered { .. }))
        .count();
    let finished = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::DownloadFinished { .. }))
        .count();
    assert_eq!(discovered, 3);
    assert_eq!(finished, 3);
}

#[tokio::test]
async fn test_execute_download_explicit_urls() {
    let server = MockServer::start().await;
    mount_file(&server, "/files/one.bin", "1").await;
    mount_file(&server, "/files/two.bin", "22").await;
    let dest = tempfile::tempdir().unwrap();

    let urls = vec![
        Url::parse(&format!("{}/files/one.bin", server.uri())).unwrap(),
        Url::parse(&format!("{}/files/two.bin", server.uri())).unwrap(),
        Url::parse(&format!("{}/files/one.bin", server.uri())).unwrap(),
    ];

    let report = execute_download(urls, options(dest.path(), RunMode::TwoPhase), None)
        .await
        .unwrap();

    assert!(report.root.is_none());
    assert_eq!(report.discovered.len(), 2);
    assert_eq!(report.downloads.succeeded(), 2);
    assert_eq!(
        std::fs::read_to_string(dest.path().join("files/two.bin")).unwrap(),
        "22"
    );
}

#[tokio::test]
async fn test_execute_download_applies_filter() {
    let server = MockServer::start().await;
    mount_file(&server, "/iso/linux-6.1.iso", "kernel").await;
    mount_file(&server, "/iso/linux-6.1.iso.sig", "sig").await;
    mount_file(&server, "/iso/bsd-14.iso", "bsd").await;
    let dest = tempfile::tempdir().unwrap();

    let urls = ["linux-6.1.iso", "linux-6.1.iso.sig", "bsd-14.iso"]
        .iter()
        .map(|name| Url::parse(&format!("{}/iso/{}", server.uri(), name)).unwrap())
        .collect();

    let mut opts = options(dest.path(), RunMode::TwoPhase);
    opts.filter = FilterSpec::new()
        .with_pattern("linux")
        .unwrap()
        .with_extensions([".iso"]);

    let report = execute_download(urls, opts, None).await.unwrap();

    assert_eq!(report.discovered.len(), 1);
    assert_eq!(report.downloads.succeeded(), 1);
    assert!(dest.path().join("iso/linux-6.1.iso").exists());
    assert!(!dest.path().join("iso/linux-6.1.iso.sig").exists());
    assert!(!dest.path().join("iso/bsd-14.iso").exists());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_streaming_run_with_single_worker_completes() {
    let server = MockServer::start().await;
    mirror_tree(&server).await;
    let dest = tempfile::tempdir().unwrap();

    // listings and transfers share the one permit
    let mut opts = options(dest.path(), RunMode::Streaming);
    opts.workers = 1;

    let report = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        execute_run(root(&server), opts, None),
    )
    .await
    .expect("streaming run stalled")
    .unwrap();

    assert_eq!(report.discovered.len(), 3);
    assert_eq!(report.downloads.succeeded(), 3);
    assert!(dest.path().join("pub/docs/c.txt").exists());
}
