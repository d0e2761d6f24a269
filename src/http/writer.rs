use std::time::SystemTime;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::http::persistence::{decide, Persistence};
use crate::http::response::Response;

/// Headers the serializer places itself, in a fixed position.
const MANAGED: [&str; 3] = ["Content-Type", "Content-Length", "Date"];

/// Serializes a response, dating it now.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    serialize_response_at(resp, SystemTime::now())
}

/// Serializes a response with `now` as the default `Date`.
///
/// `Content-Length` always equals the content's byte length when there is
/// content. The content is appended verbatim after the blank line.
pub fn serialize_response_at(resp: &Response, now: SystemTime) -> Vec<u8> {
    let content_length = resp.content.as_ref().map(|c| c.len() as u64);
    let mut buf = serialize_head(resp, content_length, now);

    // Body
    if let Some(content) = &resp.content {
        buf.extend_from_slice(content);
    }

    buf
}

/// Serializes the status line and header block, including the blank line.
///
/// `content_length` overrides whatever `Content-Length` the response carries.
pub fn serialize_head(resp: &Response, content_length: Option<u64>, now: SystemTime) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        resp.version.response_token(),
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    if let Some(ct) = resp.header("Content-Type") {
        push_header(&mut buf, "Content-Type", ct);
    }

    for (k, v) in resp.headers.iter() {
        if MANAGED.iter().any(|m| m.eq_ignore_ascii_case(k)) {
            continue;
        }
        push_header(&mut buf, k, v.unwrap_or_default());
    }

    let date = resp
        .header("Date")
        .map(str::to_string)
        .unwrap_or_else(|| httpdate::fmt_http_date(now));
    push_header(&mut buf, "Date", &date);

    let length = content_length
        .map(|n| n.to_string())
        .or_else(|| resp.header("Content-Length").map(str::to_string));
    if let Some(length) = length {
        push_header(&mut buf, "Content-Length", &length);
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");
    buf
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

/// Resolves the persistence of `response` and records it in its headers.
///
/// An explicit `KeepAlive`/`Close` is written into `Connection`; with
/// `Unspecified` the headers are left as the caller set them.
pub fn apply_persistence(response: &mut Response, requested: Persistence) -> Persistence {
    let decision = decide(response.version, response.header("Connection"), requested);
    if let Some(value) = requested.header_value() {
        response.set_header("Connection", value);
    }
    decision
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self::from_bytes(serialize_response(response))
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}

/// Serializes and writes a whole response.
///
/// Returns the persistence decision; closing the connection on
/// [`Persistence::Close`] is the caller's job.
pub async fn send<W>(
    stream: &mut W,
    mut response: Response,
    persistence: Persistence,
) -> anyhow::Result<Persistence>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let decision = apply_persistence(&mut response, persistence);
    let mut writer = ResponseWriter::new(&response);
    writer.write_to_stream(stream).await?;

    debug!(
        status = response.status.as_u16(),
        bytes = writer.len(),
        persistence = ?decision,
        "response sent"
    );
    Ok(decision)
}

/// Writes only the status line and headers, for a body streamed separately.
///
/// `content_length` overrides the response's own `Content-Length`. The
/// connection's fate is not decided here.
pub async fn send_headers_only<W>(
    stream: &mut W,
    response: &Response,
    content_length: Option<u64>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let head = serialize_head(response, content_length, SystemTime::now());
    let mut writer = ResponseWriter::from_bytes(head);
    writer.write_to_stream(stream).await?;

    debug!(
        status = response.status.as_u16(),
        content_length = ?content_length,
        "response headers sent"
    );
    Ok(())
}
