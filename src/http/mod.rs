//! HTTP protocol implementation.
//!
//! This module implements an HTTP/1.x server core with support for
//! pipelined requests and keep-alive connections.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The session state machine, the `Handler` trait and the handle lent to it
//! - **`parser`**: Incremental request parsing from byte buffers
//! - **`request`**: HTTP request representation, methods and versions
//! - **`headers`**: Case-insensitive, last-write-wins header map
//! - **`multipart`**: Decoding of `multipart/*` bodies into parts
//! - **`mime`**: Content-type table and `Content-Type` parameter helpers
//! - **`response`**: HTTP response representation with builder pattern
//! - **`persistence`**: Keep-alive vs. close decision table
//! - **`writer`**: Serializes and writes HTTP responses to the client
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Feed socket bytes to the parser
//!        └──────┬──────┘
//!               │ Request complete          Parse error ──────────┐
//!               ▼                                                 │
//!        ┌──────────────────┐                                     │
//!        │   Processing     │ ← Handler answers through its handle│
//!        └──────┬───────────┘                                     │
//!               │ Unknown method/version, handler error ──┐       │
//!               │                                         ▼       ▼
//!               │                                  ┌──────────────────┐
//!               │                                  │    Rejecting     │ ← 4xx/5xx, then close
//!               │                                  └──────────────────┘
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pocket_httpd::http::connection::{Connection, ConnectionSettings};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let handler = Arc::new(pocket_httpd::app::InspectApp);
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, handler, ConnectionSettings::default());
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod headers;
pub mod mime;
pub mod multipart;
pub mod parser;
pub mod persistence;
pub mod request;
pub mod response;
pub mod writer;
