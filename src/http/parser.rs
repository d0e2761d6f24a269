use bytes::{Bytes, BytesMut};
use memchr::memmem;
use tracing::{debug, trace};

use crate::http::headers::Headers;
use crate::http::mime;
use crate::http::multipart;
use crate::http::request::{Method, Request, Version};
use crate::http::response::StatusCode;

/// Largest `Content-Length` accepted by default (100 MiB).
pub const MAX_BODY_BYTES: u64 = 100 << 20;

/// Largest header section accepted by default while no terminator is found.
pub const MAX_HEADER_BYTES: usize = 64 << 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Not a failure: more bytes are needed.
    #[error("incomplete request")]
    Incomplete,
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("resource exceeded: {0}")]
    ResourceExceeded(String),
}

impl ParseError {
    /// Status the connection answers with before closing.
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::ResourceExceeded(_) => StatusCode::PayloadTooLarge,
            ParseError::Incomplete | ParseError::ProtocolViolation(_) => StatusCode::BadRequest,
        }
    }
}

/// Size ceilings enforced while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_body_bytes: u64,
    pub max_header_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_body_bytes: MAX_BODY_BYTES,
            max_header_bytes: MAX_HEADER_BYTES,
        }
    }
}

/// A request whose header section has been fully parsed.
#[derive(Debug, Clone)]
struct ParsedHead {
    request: Request,
    /// Offset of the first body byte from the start of the buffer
    body_start: usize,
    body_len: usize,
}

impl ParsedHead {
    fn total_len(&self) -> usize {
        self.body_start + self.body_len
    }
}

/// Parses the first request in `buf` with the default limits.
///
/// Returns the request and the number of bytes it occupied; anything past
/// that belongs to the next pipelined request.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    parse_with_limits(buf, &Limits::default())
}

pub fn parse_with_limits(buf: &[u8], limits: &Limits) -> Result<(Request, usize), ParseError> {
    let head = parse_head(buf, limits, 0)?;
    let total = head.total_len();

    if buf.len() < total {
        return Err(ParseError::Incomplete);
    }

    let body = (head.body_len > 0).then(|| Bytes::copy_from_slice(&buf[head.body_start..total]));
    Ok((assemble(head, body), total))
}

/// Result of feeding bytes to a [`RequestParser`].
#[derive(Debug)]
pub enum ParseOutcome {
    /// Call again once more bytes have arrived.
    NeedMore,
    /// A full request was consumed; any following bytes stay buffered.
    Complete(Request),
    Error(ParseError),
}

#[derive(Debug)]
enum State {
    AwaitingHead {
        /// Buffer length at the last unsuccessful terminator search
        searched: usize,
    },
    AwaitingBody(Box<ParsedHead>),
    Failed(ParseError),
}

/// Incremental request parser over an owned buffer.
///
/// Bytes may arrive in chunks of any size. The header section is parsed from
/// scratch once its terminator is present, so the result does not depend on
/// where chunk boundaries fell. After a request completes, the bytes that
/// follow it remain buffered and [`RequestParser::advance`] parses them.
#[derive(Debug)]
pub struct RequestParser {
    buffer: BytesMut,
    state: State,
    limits: Limits,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            state: State::AwaitingHead { searched: 0 },
            limits,
        }
    }

    /// Appends `chunk` and tries to complete the next request.
    pub fn feed(&mut self, chunk: &[u8]) -> ParseOutcome {
        self.buffer.extend_from_slice(chunk);
        self.advance()
    }

    /// Tries to complete the next request from bytes already buffered.
    ///
    /// Once an error has been reported the parser stays failed and keeps
    /// returning that error.
    pub fn advance(&mut self) -> ParseOutcome {
        let state = std::mem::replace(&mut self.state, State::AwaitingHead { searched: 0 });

        let head = match state {
            State::Failed(e) => return self.fail(e),
            State::AwaitingBody(head) => *head,
            State::AwaitingHead { searched } => {
                match parse_head(&self.buffer, &self.limits, searched) {
                    Ok(head) => head,
                    Err(ParseError::Incomplete) => {
                        self.state = State::AwaitingHead {
                            searched: self.buffer.len(),
                        };
                        return ParseOutcome::NeedMore;
                    }
                    Err(e) => {
                        debug!(error = %e, "rejecting request");
                        return self.fail(e);
                    }
                }
            }
        };

        let total = head.total_len();
        if self.buffer.len() < total {
            trace!(have = self.buffer.len(), need = total, "awaiting body");
            self.state = State::AwaitingBody(Box::new(head));
            return ParseOutcome::NeedMore;
        }

        let raw = self.buffer.split_to(total).freeze();
        let body = (head.body_len > 0).then(|| raw.slice(head.body_start..));
        ParseOutcome::Complete(assemble(head, body))
    }

    /// Bytes buffered but not yet part of a completed request.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// True when nothing is buffered and no request is in progress.
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty() && matches!(self.state, State::AwaitingHead { .. })
    }

    fn fail(&mut self, e: ParseError) -> ParseOutcome {
        self.state = State::Failed(e.clone());
        ParseOutcome::Error(e)
    }
}

fn find_headers_end(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let data = &buf[from..];
    let crlf = memmem::find(data, b"\r\n\r\n");
    let lf = memmem::find(data, b"\n\n");

    let (end, len) = match (crlf, lf) {
        (Some(c), Some(l)) if l < c => (l, 2),
        (Some(c), _) => (c, 4),
        (None, Some(l)) => (l, 2),
        (None, None) => return None,
    };
    Some((from + end, from + end + len))
}

fn parse_head(buf: &[u8], limits: &Limits, searched: usize) -> Result<ParsedHead, ParseError> {
    // Stray line breaks before a start line are skipped.
    let Some(skip) = buf.iter().position(|b| *b != b'\r' && *b != b'\n') else {
        return Err(unterminated(buf, limits));
    };

    let from = searched.saturating_sub(3).max(skip);
    let Some((head_end, body_start)) = find_headers_end(buf, from) else {
        return Err(unterminated(buf, limits));
    };

    let head = String::from_utf8_lossy(&buf[skip..head_end]);
    let mut lines = head.split('\n').map(|l| l.trim_end_matches('\r'));

    // Request line
    let request_line = lines.next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(ParseError::ProtocolViolation(format!(
            "invalid first line for HTTP request ({request_line})"
        )));
    }

    let method = Method::parse(parts[0]);
    let version = Version::parse(parts.get(2).copied());

    // Headers
    let mut headers = Headers::new();
    for line in lines {
        headers.parse_line(line);
    }

    let content_length = if headers.contains("Content-Length") {
        Some(parse_content_length(headers.get("Content-Length"), limits)?)
    } else {
        None
    };

    let multipart_boundary = if headers.contains("Content-Type") {
        let ct = headers.get("Content-Type").ok_or_else(|| {
            ParseError::ProtocolViolation("Content-Type header has no value".into())
        })?;
        if mime::is_multipart(ct) {
            let boundary = mime::boundary(ct).ok_or_else(|| {
                ParseError::ProtocolViolation(format!(
                    "multipart Content-Type without boundary ({ct})"
                ))
            })?;
            Some(boundary.to_string())
        } else {
            None
        }
    } else {
        None
    };

    let mut request = Request::new(method, parts[1], version, headers);
    request.content_length = content_length.map_or(-1, |n| n as i64);
    request.multipart_boundary = multipart_boundary;

    Ok(ParsedHead {
        request,
        body_start,
        body_len: content_length.unwrap_or(0) as usize,
    })
}

/// Error for a buffer that holds no complete header section yet. Skipped
/// blank lines count towards the ceiling.
fn unterminated(buf: &[u8], limits: &Limits) -> ParseError {
    if buf.len() > limits.max_header_bytes {
        ParseError::ResourceExceeded(format!(
            "header section exceeds {} bytes",
            limits.max_header_bytes
        ))
    } else {
        ParseError::Incomplete
    }
}

fn parse_content_length(value: Option<&str>, limits: &Limits) -> Result<u64, ParseError> {
    let n = value
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| {
            ParseError::ProtocolViolation(format!(
                "invalid Content-Length ({})",
                value.unwrap_or_default()
            ))
        })?;

    if n > limits.max_body_bytes {
        return Err(ParseError::ResourceExceeded(format!(
            "Content-Length {n} exceeds {}",
            limits.max_body_bytes
        )));
    }
    Ok(n)
}

/// Attaches the body and derives `body_text` / `mime_parts` from it.
fn assemble(head: ParsedHead, body: Option<Bytes>) -> Request {
    let mut request = head.request;

    if let Some(body) = &body {
        if let Some(ct) = request.headers.get("Content-Type") {
            if let Some(label) = mime::charset(ct) {
                request.body_text = mime::decode_charset(body, label);
            } else if mime::is_textual(ct) {
                request.body_text = Some(String::from_utf8_lossy(body).into_owned());
            } else if let Some(boundary) = &request.multipart_boundary {
                request.mime_parts = Some(multipart::decode(body, boundary));
            }
        }
    }

    request.body = body;
    request.mark_complete();
    request
}
