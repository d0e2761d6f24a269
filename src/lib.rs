//! pocket_httpd - Embeddable HTTP/1.x server
//!
//! Incremental request parsing, multipart decoding, response serialization
//! and keep-alive handling for small hosts.

pub mod app;
pub mod config;
pub mod http;
pub mod server;
