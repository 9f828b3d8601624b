//! End-to-end crawl tests
//!
//! A single mock server plays both roles: it serves the pages being archived and
//! the article API the crawler reads targets from and posts results to. Pages
//! are loaded by the real `HttpHost`, with short race timings.

use crate::{form_field, test_backend, test_user_agent};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tab_archiver::backend::HttpBackend;
use tab_archiver::config::{Config, CrawlerConfig, HandshakeFailurePolicy, HostConfig};
use tab_archiver::crawler::crawl;
use tab_archiver::host::HttpHost;
use tab_archiver::queue::fetch_targets;
use tab_archiver::TargetFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn create_test_config(base_url: &str, handshake_failure: HandshakeFailurePolicy) -> Config {
    Config {
        crawler: CrawlerConfig {
            force_capture_timeout_ms: 1500,
            preprocess_delay_ms: 100,
            handshake_timeout_ms: 1000,
            handshake_failure,
        },
        backend: test_backend(base_url),
        user_agent: test_user_agent(),
        host: HostConfig {
            tab_id: 7,
            page_timeout_ms: 10_000,
        },
    }
}

async fn mount_page(server: &MockServer, page: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_articles(server: &MockServer, pages: &[(&str, &str)]) {
    let base_url = server.uri();
    let articles: Vec<serde_json::Value> = pages
        .iter()
        .map(|(id, page)| json!({ "id": id, "url_origin": format!("{}{}", base_url, page) }))
        .collect();

    Mock::given(method("GET"))
        .and(path("/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(articles))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn posted_articles(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == "/article")
        .collect()
}

fn metadata(request: &Request) -> serde_json::Value {
    let raw = form_field(request, "metadata").expect("metadata part missing");
    serde_json::from_str(&raw).expect("metadata is not JSON")
}

async fn run_crawl(config: &Config) -> tab_archiver::output::RunSummary {
    let backend = Arc::new(
        HttpBackend::new(&config.backend, &config.user_agent).expect("Failed to build backend"),
    );
    let queue = fetch_targets(backend.as_ref(), TargetFilter::All, None, None)
        .await
        .expect("Failed to fetch targets");
    let host = HttpHost::new(&config.user_agent, &config.host).expect("Failed to build host");

    crawl(config, queue, Arc::new(host), backend, |_| {})
        .await
        .expect("Crawl failed")
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/ok",
        ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><title>First</title></head><body>
            <p>Hello</p><iframe src="/ad"></iframe><a href="/second">next</a>
            </body></html>"#,
            "text/html",
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/second",
        ResponseTemplate::new(200).set_body_raw(
            "<html><head><title>Second</title></head><body>Plain</body></html>",
            "text/html",
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/report.pdf",
        ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"),
    )
    .await;
    mount_articles(
        &mock_server,
        &[("a", "/ok"), ("b", "/second"), ("c", "/report.pdf")],
    )
    .await;

    let config = create_test_config(&mock_server.uri(), HandshakeFailurePolicy::Report);
    let summary = run_crawl(&config).await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.forced, 0);
    assert_eq!(summary.sink_errors, 0);

    let posts = posted_articles(&mock_server).await;
    let ids: Vec<String> = posts
        .iter()
        .map(|request| form_field(request, "id").unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let first = metadata(&posts[0]);
    assert_eq!(first["status"], "Success");
    assert_eq!(first["saved"], true);
    assert_eq!(first["pageStatus"], true);
    assert_eq!(first["numOfFrames"], 2);
    let first_body = String::from_utf8_lossy(&posts[0].body);
    assert!(first_body.contains("filename=\"a.mhtml\""));
    assert!(first_body.contains("Subject: First"));

    let webpage: serde_json::Value =
        serde_json::from_str(&form_field(&posts[0], "webpage").unwrap()).unwrap();
    assert_eq!(webpage["title"], "First");

    let pdf = metadata(&posts[2]);
    assert_eq!(pdf["status"], "Failed");
    assert_eq!(pdf["saved"], false);
    assert!(!String::from_utf8_lossy(&posts[2].body).contains("name=\"snapshot\""));
}

#[tokio::test]
async fn test_page_that_never_commits_is_force_captured_without_snapshot() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/hang",
        ResponseTemplate::new(200)
            .set_body_raw("<html></html>", "text/html")
            .set_delay(Duration::from_secs(10)),
    )
    .await;
    mount_articles(&mock_server, &[("slow", "/hang")]).await;

    let config = create_test_config(&mock_server.uri(), HandshakeFailurePolicy::Report);
    let started = std::time::Instant::now();
    let summary = run_crawl(&config).await;

    assert!(started.elapsed() >= Duration::from_millis(1500));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(summary.forced, 1);
    assert_eq!(summary.failed, 1);

    let posts = posted_articles(&mock_server).await;
    assert_eq!(posts.len(), 1);
    let record = metadata(&posts[0]);
    assert_eq!(record["status"], "Failed");
    assert_eq!(record["saved"], false);
    assert_eq!(record["pageStatus"], false);
    assert_eq!(record["numOfFrames"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_page_that_never_commits_is_skipped_under_skip_policy() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/hang",
        ResponseTemplate::new(200)
            .set_body_raw("<html></html>", "text/html")
            .set_delay(Duration::from_secs(10)),
    )
    .await;
    mount_page(
        &mock_server,
        "/fine",
        ResponseTemplate::new(200).set_body_raw("<html><body>ok</body></html>", "text/html"),
    )
    .await;
    mount_articles(&mock_server, &[("slow", "/hang"), ("fine", "/fine")]).await;

    let config = create_test_config(&mock_server.uri(), HandshakeFailurePolicy::Skip);
    let summary = run_crawl(&config).await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 1);

    let posts = posted_articles(&mock_server).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(form_field(&posts[0], "id").as_deref(), Some("fine"));
}

#[tokio::test]
async fn test_empty_target_list_finishes_immediately() {
    let mock_server = MockServer::start().await;
    mount_articles(&mock_server, &[]).await;

    let config = create_test_config(&mock_server.uri(), HandshakeFailurePolicy::Report);
    let summary = run_crawl(&config).await;

    assert_eq!(summary.total, 0);
    assert_eq!(summary.processed(), 0);
    assert!(posted_articles(&mock_server).await.is_empty());
}

/// Decodes the archived document out of an MHTML snapshot inside a posted form
fn archived_document(request: &Request) -> Vec<u8> {
    let body = String::from_utf8_lossy(&request.body);
    let part = body
        .find("Content-Transfer-Encoding: base64")
        .map(|at| &body[at..])
        .expect("snapshot has no base64 part");
    let start = part.find("\r\n\r\n").expect("part has no body") + 4;
    let end = part[start..].find("\r\n\r\n--").expect("part is not terminated") + start;
    let encoded: String = part[start..end].split("\r\n").collect();
    STANDARD.decode(encoded).expect("snapshot part is not base64")
}

#[tokio::test]
async fn test_non_utf8_page_is_archived_byte_for_byte() {
    let mock_server = MockServer::start().await;
    let served: Vec<u8> = b"<html><head><title>KR</title></head><body>\xC7\xD1\xB1\xDB</body></html>".to_vec();

    mount_page(
        &mock_server,
        "/kr",
        ResponseTemplate::new(200)
            .set_body_bytes(served.clone())
            .insert_header("content-type", "text/html; charset=euc-kr"),
    )
    .await;
    mount_articles(&mock_server, &[("kr", "/kr")]).await;

    let config = create_test_config(&mock_server.uri(), HandshakeFailurePolicy::Report);
    let summary = run_crawl(&config).await;
    assert_eq!(summary.succeeded, 1);

    let posts = posted_articles(&mock_server).await;
    assert_eq!(posts.len(), 1);
    let body = String::from_utf8_lossy(&posts[0].body);
    assert!(body.contains("Content-Type: text/html; charset=euc-kr"));
    assert_eq!(archived_document(&posts[0]), served);
}

/// Serves one page whose headers and first bytes arrive, then never finishes
async fn serve_stalled_page(prefix: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let address = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
                    prefix.len() + 10_000
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(prefix.as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });

    format!("http://{}/stalled", address)
}

#[tokio::test]
async fn test_page_that_commits_then_stalls_is_force_captured_with_snapshot() {
    let mock_server = MockServer::start().await;
    let prefix = "<html><head><title>Stalled</title></head><body><p>Partial article";
    let page_url = serve_stalled_page(prefix).await;

    Mock::given(method("GET"))
        .and(path("/articles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": "stall", "url_origin": page_url }])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), HandshakeFailurePolicy::Report);
    let summary = run_crawl(&config).await;

    assert_eq!(summary.forced, 1);
    assert_eq!(summary.succeeded, 1);

    let posts = posted_articles(&mock_server).await;
    assert_eq!(posts.len(), 1);
    let record = metadata(&posts[0]);
    assert_eq!(record["status"], "Success");
    assert_eq!(record["saved"], true);
    assert_eq!(record["pageStatus"], false);
    assert_eq!(record["numOfFrames"], 1);
    assert_eq!(archived_document(&posts[0]), prefix.as_bytes());

    let webpage: serde_json::Value =
        serde_json::from_str(&form_field(&posts[0], "webpage").unwrap()).unwrap();
    assert_eq!(webpage["title"], "Stalled");
}
