//! Configuration loading tests

use std::io::Write;
use std::path::Path;
use tab_archiver::config::{load_config, load_config_with_hash, HandshakeFailurePolicy};
use tab_archiver::ConfigError;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file.flush().expect("Failed to flush config");
    file
}

#[test]
fn test_example_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");
    let config = load_config(&path).expect("Example config should be valid");

    assert_eq!(config.crawler.force_capture_timeout_ms, 20000);
    assert_eq!(config.crawler.preprocess_delay_ms, 5000);
    assert_eq!(config.crawler.handshake_failure, HandshakeFailurePolicy::Report);
    assert_eq!(config.backend.base_url, "http://localhost:3000");
    assert_eq!(config.user_agent.crawler_name, "tab-archiver");
    assert_eq!(config.host.tab_id, 1);
}

#[test]
fn test_skip_policy_and_hash() {
    let file = write_config(
        r#"
[crawler]
handshake-failure = "skip"

[backend]
base-url = "https://archive.example/api"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"
"#,
    );

    let (config, hash) = load_config_with_hash(file.path()).expect("Config should load");
    assert_eq!(config.crawler.handshake_failure, HandshakeFailurePolicy::Skip);
    assert_eq!(config.crawler.force_capture_timeout_ms, 20000);
    assert_eq!(hash.len(), 64);
}

#[test]
fn test_unknown_policy_is_rejected() {
    let file = write_config(
        r#"
[crawler]
handshake-failure = "retry"

[backend]
base-url = "https://archive.example/api"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"
"#,
    );

    assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
}

#[test]
fn test_non_http_backend_is_rejected() {
    let file = write_config(
        r#"
[backend]
base-url = "ftp://archive.example"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"
"#,
    );

    assert!(load_config(file.path()).is_err());
}
