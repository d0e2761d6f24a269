use bytes::Bytes;

use crate::http::headers::Headers;
use crate::http::request::Version;

/// HTTP status codes the server answers with.
///
/// Common HTTP status codes used in responses:
/// - `Ok` (200): Request successful
/// - `Found` (302): Redirect to the `Location` header
/// - `BadRequest` (400): Malformed request
/// - `NotFound` (404): Resource not found
/// - `PayloadTooLarge` (413): Declared body over the configured ceiling
/// - `InternalServerError` (500): Handler failed
/// - `NotImplemented` (501): Unknown method
/// - `HttpVersionNotSupported` (505): Unknown protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 302 Found
    Found,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 413 Payload Too Large
    PayloadTooLarge,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
    /// 505 HTTP Version Not Supported
    HttpVersionNotSupported,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use pocket_httpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Found.as_u16(), 302);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Found => 302,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::HttpVersionNotSupported => 505,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use pocket_httpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotImplemented.reason_phrase(), "Not Implemented");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Found => "Found",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
///
/// `Content-Type` and `Content-Length` are seeded into `headers` when the
/// response is built; `Date` is filled in at serialization time unless the
/// caller set one, and `Connection` is decided when the response is sent.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    /// Version written on the status line, normally the client's
    pub version: Version,
    pub headers: Headers,
    pub content: Option<Bytes>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .version(request.version)
///     .content_type("application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    version: Version,
    content_type: Option<String>,
    headers: Headers,
    content: Option<Bytes>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            version: Version::Http11,
            content_type: None,
            headers: Headers::new(),
            content: None,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.content = Some(body.into());
        self
    }

    /// Builds the final Response.
    ///
    /// Adds `Content-Type` when one was given, and `Content-Length` from the
    /// body size when there is a body and the header was not set explicitly.
    pub fn build(mut self) -> Response {
        if let Some(ct) = self.content_type {
            self.headers.insert("Content-Type", ct);
        }

        if let Some(content) = &self.content {
            if !self.headers.contains("Content-Length") {
                self.headers.insert("Content-Length", content.len().to_string());
            }
        }

        Response {
            status: self.status,
            version: self.version,
            headers: self.headers,
            content: self.content,
        }
    }
}

impl Response {
    /// Creates a response with an optional content type and body.
    pub fn new(
        version: Version,
        status: StatusCode,
        content_type: Option<&str>,
        content: Option<Bytes>,
    ) -> Self {
        let mut builder = ResponseBuilder::new(status).version(version);
        if let Some(ct) = content_type {
            builder = builder.content_type(ct);
        }
        if let Some(content) = content {
            builder = builder.body(content);
        }
        builder.build()
    }

    /// Creates a `302 Found` response pointing at `location`, with no body.
    pub fn redirect(version: Version, location: &str) -> Self {
        ResponseBuilder::new(StatusCode::Found)
            .version(version)
            .header("Location", location)
            .build()
    }

    /// A plain-text error page used for protocol-level rejections.
    pub fn error(version: Version, status: StatusCode, detail: &str) -> Self {
        let text = format!("{} {}\n{}", status.as_u16(), status.reason_phrase(), detail);
        ResponseBuilder::new(status)
            .version(version)
            .content_type(crate::http::mime::ContentType::TextPlain.as_str())
            .body(text)
            .build()
    }

    /// Adds or replaces a header.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key, value);
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Serializes the response into wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        crate::http::writer::serialize_response(self)
    }
}
