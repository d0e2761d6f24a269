//! Multipart body decoding.
//!
//! A multipart body is scanned line by line (`\n`, optionally preceded by
//! `\r`) for delimiter lines `--boundary` and the closing `--boundary--`.
//! Anything before the first delimiter is preamble and is dropped. Each part
//! is split at its first blank line into a header block and a body.

use bytes::Bytes;
use tracing::debug;

use crate::http::headers::Headers;
use crate::http::mime;

/// Parts nested deeper than this keep their raw body only.
const MAX_NESTING: usize = 8;

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    pub headers: Headers,
    /// `name` parameter of `Content-Disposition`
    pub name: Option<String>,
    /// `filename` parameter of `Content-Disposition`
    pub filename: Option<String>,
    pub body: Bytes,
    /// Decoded body, when a charset was given or the body is valid UTF-8
    pub body_text: Option<String>,
    /// Sub-parts, when this part is itself `multipart/*`
    pub nested_parts: Option<Vec<MimePart>>,
}

impl MimePart {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }
}

/// Splits `body` into its parts, in source order.
///
/// A body that contains no delimiter line yields no parts.
pub fn decode(body: &Bytes, boundary: &str) -> Vec<MimePart> {
    decode_at_depth(body, boundary, 0)
}

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    /// End of the line content, before `\r\n` or `\n`
    end: usize,
    /// Start of the following line
    next: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Open,
    Close,
}

fn lines(data: &[u8]) -> Vec<Line> {
    let mut out = Vec::new();
    let mut start = 0;

    for nl in memchr::memchr_iter(b'\n', data) {
        let end = if nl > start && data[nl - 1] == b'\r' { nl - 1 } else { nl };
        out.push(Line { start, end, next: nl + 1 });
        start = nl + 1;
    }

    if start < data.len() {
        out.push(Line {
            start,
            end: data.len(),
            next: data.len(),
        });
    }

    out
}

fn classify(line: &[u8], delimiter: &[u8]) -> Option<Delimiter> {
    let trimmed_len = line
        .iter()
        .rposition(|b| *b != b' ' && *b != b'\t')
        .map_or(0, |i| i + 1);
    let line = &line[..trimmed_len];

    if line == delimiter {
        return Some(Delimiter::Open);
    }

    match line.strip_prefix(delimiter) {
        Some(b"--") => Some(Delimiter::Close),
        _ => None,
    }
}

fn decode_at_depth(body: &Bytes, boundary: &str, depth: usize) -> Vec<MimePart> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut part_start: Option<usize> = None;

    for line in lines(body) {
        let Some(kind) = classify(&body[line.start..line.end], delimiter.as_bytes()) else {
            continue;
        };

        if let Some(start) = part_start {
            // The line break before a delimiter belongs to the delimiter.
            let mut end = line.start;
            if end > start && body[end - 1] == b'\n' {
                end -= 1;
                if end > start && body[end - 1] == b'\r' {
                    end -= 1;
                }
            }
            parts.push(parse_part(body.slice(start..end), depth));
        }

        match kind {
            Delimiter::Open => part_start = Some(line.next),
            Delimiter::Close => {
                part_start = None;
                break;
            }
        }
    }

    // Input ran out before a closing delimiter.
    if let Some(start) = part_start.filter(|s| *s < body.len()) {
        parts.push(parse_part(body.slice(start..), depth));
    }

    debug!(boundary, depth, parts = parts.len(), "decoded multipart body");
    parts
}

fn parse_part(raw: Bytes, depth: usize) -> MimePart {
    let mut headers = Headers::new();
    let part_lines = lines(&raw);

    let body_start = match part_lines.iter().position(|l| l.start == l.end) {
        Some(blank) => {
            for line in &part_lines[..blank] {
                headers.parse_line(&String::from_utf8_lossy(&raw[line.start..line.end]));
            }
            part_lines[blank].next
        }
        None => 0,
    };
    let body = raw.slice(body_start..);

    let content_type = headers.get("Content-Type");
    let mut body_text = None;
    let mut nested_parts = None;

    if let Some(label) = content_type.and_then(mime::charset) {
        body_text = mime::decode_charset(&body, label);
    } else if let Some(inner) = content_type
        .filter(|ct| mime::is_multipart(ct))
        .and_then(mime::boundary)
    {
        if depth + 1 < MAX_NESTING {
            nested_parts = Some(decode_at_depth(&body, inner, depth + 1));
        } else {
            debug!(depth, "multipart nesting too deep, keeping raw body");
        }
    } else {
        body_text = std::str::from_utf8(&body).ok().map(str::to_owned);
    }

    let (name, filename) = headers
        .get("Content-Disposition")
        .map(disposition_params)
        .unwrap_or_default();

    MimePart {
        headers,
        name,
        filename,
        body,
        body_text,
        nested_parts,
    }
}

/// Pulls `name` and `filename` out of a `Content-Disposition` value.
fn disposition_params(value: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut filename = None;

    for token in split_unquoted(value, ';') {
        let Some((key, val)) = token.split_once('=') else {
            continue;
        };
        let val = val.trim().trim_matches('"').to_string();
        match key.trim() {
            k if k.eq_ignore_ascii_case("name") => name = Some(val),
            k if k.eq_ignore_ascii_case("filename") => filename = Some(val),
            _ => {}
        }
    }

    (name, filename)
}

/// Splits on `sep`, ignoring separators inside double quotes.
fn split_unquoted(value: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            out.push(value[start..i].trim());
            start = i + c.len_utf8();
        }
    }
    out.push(value[start..].trim());
    out
}
