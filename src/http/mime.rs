//! Content-type table and `Content-Type` parameter helpers.

use encoding_rs::Encoding;

/// Content types the server commonly answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    TextHtml,
    TextPlain,
    FormUrlEncoded,
}

impl ContentType {
    /// Returns the full header value, including the charset where one applies.
    ///
    /// ```
    /// # use pocket_httpd::http::mime::ContentType;
    /// assert_eq!(ContentType::TextPlain.as_str(), "text/plain; charset=utf-8");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::TextHtml => "text/html; charset=utf-8",
            ContentType::TextPlain => "text/plain; charset=utf-8",
            ContentType::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

/// True when the value names a `multipart/*` type.
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .as_bytes()
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(b"multipart"))
}

/// True when the value mentions `text` anywhere (`text/plain`, `text/html`, ...).
pub fn is_textual(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text")
}

/// Extracts the `charset` parameter, if any.
///
/// Only a parameter named `charset` (any case) counts, not the word appearing
/// inside another parameter's value. Surrounding quotes are stripped.
pub fn charset(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim().eq_ignore_ascii_case("charset").then_some(value)
        })
        .and_then(param_value)
}

/// Extracts the `boundary` parameter of a multipart content type.
///
/// The key is matched case-sensitively and only its first occurrence counts.
pub fn boundary(content_type: &str) -> Option<&str> {
    let start = content_type.find("boundary=")? + "boundary=".len();
    param_value(&content_type[start..])
}

fn param_value(raw: &str) -> Option<&str> {
    let end = raw.find(';').unwrap_or(raw.len());
    let value = raw[..end].trim().trim_matches('"');
    (!value.is_empty()).then_some(value)
}

/// Decodes `bytes` using the character set named by `label`.
///
/// Returns `None` when the label is not a known encoding. Malformed sequences
/// are replaced rather than rejected.
pub fn decode_charset(bytes: &[u8], label: &str) -> Option<String> {
    let encoding = Encoding::for_label(label.trim().as_bytes())?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::trace!(charset = label, "body text decoded with replacements");
    }
    Some(text.into_owned())
}
