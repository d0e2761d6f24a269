use std::time::{Duration, SystemTime};

use bytes::Bytes;

use pocket_httpd::http::persistence::Persistence;
use pocket_httpd::http::request::Version;
use pocket_httpd::http::response::{Response, ResponseBuilder, StatusCode};
use pocket_httpd::http::writer::{send, send_headers_only, serialize_response_at};

fn head_of(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let end = text.find("\r\n\r\n").expect("header terminator");
    text[..end + 2].to_string()
}

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::Found.as_u16(), 302);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::PayloadTooLarge.as_u16(), 413);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
    assert_eq!(StatusCode::HttpVersionNotSupported.as_u16(), 505);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::Found.reason_phrase(), "Found");
    assert_eq!(StatusCode::PayloadTooLarge.reason_phrase(), "Payload Too Large");
    assert_eq!(
        StatusCode::HttpVersionNotSupported.reason_phrase(),
        "HTTP Version Not Supported"
    );
}

#[test]
fn test_response_builder_basic() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(&b"Hello, World!"[..])
        .build();

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.version, Version::Http11);
    assert_eq!(response.content.as_deref(), Some(&b"Hello, World!"[..]));
}

#[test]
fn test_response_builder_with_headers() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .content_type("text/plain")
        .header("X-Custom", "value")
        .body(&b"test"[..])
        .build();

    assert_eq!(response.header("Content-Type"), Some("text/plain"));
    assert_eq!(response.header("x-custom"), Some("value"));
}

#[test]
fn test_response_builder_auto_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(&b"This is the body"[..])
        .build();

    assert_eq!(response.header("Content-Length"), Some("16"));
}

#[test]
fn test_response_builder_multiple_headers() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-cache")
        .header("X-Frame-Options", "DENY")
        .body(&b"{}"[..])
        .build();

    assert_eq!(response.headers.len(), 4); // 3 custom + 1 auto (Content-Length)
    assert_eq!(response.header("Cache-Control"), Some("no-cache"));
}

#[test]
fn test_response_without_content_has_no_length() {
    let response = ResponseBuilder::new(StatusCode::Found).build();

    assert!(response.content.is_none());
    assert_eq!(response.header("Content-Length"), None);
}

#[test]
fn test_error_response_echoes_version() {
    let response = Response::error(Version::Http10, StatusCode::NotFound, "no such page");

    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.version, Version::Http10);
    assert_eq!(response.header("Content-Type"), Some("text/plain; charset=utf-8"));
    assert_eq!(
        response.content.as_deref(),
        Some(&b"404 Not Found\nno such page"[..])
    );
    assert!(response.to_bytes().starts_with(b"HTTP/1.0 404 Not Found\r\n"));
}

#[test]
fn test_build_wire_bytes() {
    let response = Response::new(
        Version::Http11,
        StatusCode::Ok,
        Some("text/plain"),
        Some("hi".into()),
    );
    let bytes = response.to_bytes();
    let head = head_of(&bytes);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: text/plain\r\n"));
    assert!(head.contains("Content-Length: 2\r\n"));
    assert!(head.contains("Date: "));
    assert!(bytes.ends_with(b"\r\n\r\nhi"));
    assert_eq!(&bytes[bytes.len() - 2..], b"hi");
}

#[test]
fn test_date_header_format() {
    let now = SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777);
    let response = Response::new(Version::Http11, StatusCode::Ok, None, Some(Bytes::new()));
    let bytes = serialize_response_at(&response, now);

    assert!(head_of(&bytes).contains("Date: Sun, 06 Nov 1994 08:49:37 GMT\r\n"));
}

#[test]
fn test_content_length_on_wire_matches_content() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Length", "999")
        .body(&b"test"[..])
        .build();

    // The struct keeps what the caller set; the wire carries the real length.
    assert_eq!(response.header("Content-Length"), Some("999"));
    let head = head_of(&response.to_bytes());
    assert!(head.contains("Content-Length: 4\r\n"));
    assert!(!head.contains("999"));
}

#[test]
fn test_status_line_echoes_version() {
    let response = Response::new(Version::Http10, StatusCode::NotFound, None, None);
    let bytes = response.to_bytes();

    assert!(bytes.starts_with(b"HTTP/1.0 404 Not Found\r\n"));
    assert!(!head_of(&bytes).contains("Content-Length"));
}

#[test]
fn test_redirect() {
    let response = Response::redirect(Version::Http11, "/Content/Index.htm");
    let head = head_of(&response.to_bytes());

    assert_eq!(response.status, StatusCode::Found);
    assert!(head.starts_with("HTTP/1.1 302 Found\r\n"));
    assert!(head.contains("Location: /Content/Index.htm\r\n"));
    assert!(response.content.is_none());
}

#[test]
fn test_download_headers() {
    let mut response = Response::new(
        Version::Http11,
        StatusCode::Ok,
        None,
        Some(vec![1u8, 2, 3].into()),
    );
    response.set_header("Content-Disposition", "attachment; filename=\"data.bin\"");
    let bytes = response.to_bytes();

    assert!(head_of(&bytes).contains("Content-Disposition: attachment; filename=\"data.bin\"\r\n"));
    assert!(bytes.ends_with(&[1, 2, 3]));
}

#[tokio::test]
async fn test_send_writes_connection_header_for_explicit_choice() {
    let mut out: Vec<u8> = Vec::new();
    let response = Response::new(Version::Http11, StatusCode::Ok, None, Some("body".into()));

    let decision = send(&mut out, response, Persistence::Close).await.unwrap();

    assert_eq!(decision, Persistence::Close);
    let head = head_of(&out);
    assert!(head.contains("Connection: close\r\n"));
    assert!(out.ends_with(b"body"));
}

#[tokio::test]
async fn test_send_unspecified_keeps_headers_untouched() {
    let mut out: Vec<u8> = Vec::new();
    let response = Response::new(Version::Http11, StatusCode::Ok, None, Some("x".into()));

    let decision = send(&mut out, response, Persistence::Unspecified).await.unwrap();

    assert_eq!(decision, Persistence::KeepAlive);
    assert!(!head_of(&out).contains("Connection"));
}

#[tokio::test]
async fn test_send_honours_existing_connection_header() {
    let mut out: Vec<u8> = Vec::new();
    let mut response = Response::new(Version::Http11, StatusCode::Ok, None, None);
    response.set_header("Connection", "close");

    let decision = send(&mut out, response, Persistence::Unspecified).await.unwrap();

    assert_eq!(decision, Persistence::Close);
}

#[tokio::test]
async fn test_send_headers_only_overrides_length() {
    let mut out: Vec<u8> = Vec::new();
    let response = Response::new(
        Version::Http11,
        StatusCode::Ok,
        Some("application/octet-stream"),
        Some("abc".into()),
    );

    send_headers_only(&mut out, &response, Some(1_000_000)).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Content-Length: 1000000\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
    assert!(!text.contains("abc"));
}
