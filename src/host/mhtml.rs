//! MHTML (RFC 2557) snapshot encoding
//!
//! Produces the same envelope layout browsers use when saving a page as a single
//! `multipart/related` archive. Every part is base64 encoded, so binary subresources
//! and non-UTF-8 documents survive unchanged.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// MIME type of an encoded snapshot
pub const MHTML_CONTENT_TYPE: &str = "multipart/related";

/// Maximum encoded line length allowed by RFC 2045
const LINE_WIDTH: usize = 76;

/// Encodes a single document as an MHTML archive
///
/// # Arguments
///
/// * `url` - The document location, written to `Snapshot-Content-Location` and `Content-Location`
/// * `title` - Optional page title for the `Subject` header
/// * `content_type` - The document MIME type (e.g. `text/html; charset=utf-8`)
/// * `body` - Raw document bytes
/// * `saved_at` - Capture time for the `Date` header
pub fn encode_mhtml(
    url: &str,
    title: Option<&str>,
    content_type: &str,
    body: &[u8],
    saved_at: DateTime<Utc>,
) -> Vec<u8> {
    let boundary = boundary_for(url, saved_at);
    let mut out = String::with_capacity(body.len() * 4 / 3 + 512);

    out.push_str("From: <Saved by tab-archiver>\r\n");
    out.push_str(&format!("Snapshot-Content-Location: {}\r\n", url));
    if let Some(title) = title {
        out.push_str(&format!("Subject: {}\r\n", encode_header_word(title)));
    }
    out.push_str(&format!("Date: {}\r\n", saved_at.to_rfc2822()));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str(&format!(
        "Content-Type: {};\r\n\ttype=\"text/html\";\r\n\tboundary=\"{}\"\r\n\r\n",
        MHTML_CONTENT_TYPE, boundary
    ));

    out.push_str(&format!("--{}\r\n", boundary));
    out.push_str(&format!("Content-Type: {}\r\n", content_type));
    out.push_str("Content-ID: <frame-0@tab-archiver>\r\n");
    out.push_str("Content-Transfer-Encoding: base64\r\n");
    out.push_str(&format!("Content-Location: {}\r\n\r\n", url));

    let encoded = STANDARD.encode(body);
    for line in encoded.as_bytes().chunks(LINE_WIDTH) {
        // base64 output is pure ASCII
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str("\r\n");
    }
    out.push_str(&format!("\r\n--{}--\r\n", boundary));

    out.into_bytes()
}

/// Derives a boundary that cannot collide with base64 content
fn boundary_for(url: &str, saved_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(saved_at.to_rfc3339().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("----MultipartBoundary--{}----", &digest[..32])
}

/// RFC 2047 encoded-word for non-ASCII header values
fn encode_header_word(value: &str) -> String {
    if value.is_ascii() && !value.contains(['\r', '\n']) {
        value.to_string()
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}
