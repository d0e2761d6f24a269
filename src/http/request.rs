use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;

use crate::http::headers::Headers;
use crate::http::multipart::MimePart;

/// HTTP request methods.
///
/// Anything outside the fixed table parses to [`Method::INVALID`] rather than
/// failing; the connection answers such requests with 501.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// TRACE - Loop the request back
    TRACE,
    /// CONNECT - Open a tunnel
    CONNECT,
    /// Unrecognized method token
    INVALID,
}

const METHODS: [(&str, Method); 8] = [
    ("GET", Method::GET),
    ("POST", Method::POST),
    ("PUT", Method::PUT),
    ("DELETE", Method::DELETE),
    ("HEAD", Method::HEAD),
    ("OPTIONS", Method::OPTIONS),
    ("TRACE", Method::TRACE),
    ("CONNECT", Method::CONNECT),
];

impl Method {
    /// Parses an HTTP method token, ignoring case.
    ///
    /// # Example
    ///
    /// ```
    /// # use pocket_httpd::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("get"), Method::GET);
    /// assert_eq!(Method::parse("BREW"), Method::INVALID);
    /// ```
    pub fn parse(s: &str) -> Self {
        METHODS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, method)| *method)
            .unwrap_or(Method::INVALID)
    }

    pub fn as_str(&self) -> &'static str {
        METHODS
            .iter()
            .find(|(_, method)| method == self)
            .map(|(name, _)| *name)
            .unwrap_or("INVALID")
    }
}

/// HTTP protocol version of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    /// No version token on the start line
    Http09,
    Http10,
    Http11,
    /// Unrecognized version token
    Invalid,
}

impl Version {
    /// Parses the third token of a start line, ignoring case.
    ///
    /// An absent token means HTTP/0.9.
    pub fn parse(token: Option<&str>) -> Self {
        match token {
            None | Some("") => Version::Http09,
            Some(t) if t.eq_ignore_ascii_case("HTTP/1.0") => Version::Http10,
            Some(t) if t.eq_ignore_ascii_case("HTTP/1.1") => Version::Http11,
            Some(_) => Version::Invalid,
        }
    }

    /// Version token written on a response status line.
    ///
    /// HTTP/0.9 clients are answered as 1.0; an unrecognized version is
    /// answered as 1.1.
    pub fn response_token(&self) -> &'static str {
        match self {
            Version::Http09 | Version::Http10 => "HTTP/1.0",
            Version::Http11 | Version::Invalid => "HTTP/1.1",
        }
    }
}

/// Represents a parsed HTTP request from a client.
///
/// `path`, `query_string` and `fragment` are raw substrings of the request
/// target and are never URL-decoded; use [`Request::url_parameters`] for
/// decoded query values.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Query component without the leading `?`
    pub query_string: Option<String>,
    /// Fragment component without the leading `#`
    pub fragment: Option<String>,
    pub version: Version,
    pub headers: Headers,
    /// Declared body length, or -1 when no `Content-Length` was sent
    pub content_length: i64,
    pub multipart_boundary: Option<String>,
    pub body: Option<Bytes>,
    /// Body decoded as text, when the content type allows it
    pub body_text: Option<String>,
    pub mime_parts: Option<Vec<MimePart>>,
    url_params: OnceLock<HashMap<String, String>>,
    complete: bool,
}

/// Splits a request target into path, query string and fragment.
///
/// A `#` that appears before the first `?` starts the fragment, and that `?`
/// then belongs to the fragment.
pub fn split_target(target: &str) -> (String, Option<String>, Option<String>) {
    let frag_index = target.find('#');
    let query_index = match (target.find('?'), frag_index) {
        (Some(q), Some(f)) if q > f => None,
        (q, _) => q,
    };

    let path_end = query_index.or(frag_index).unwrap_or(target.len());
    let path = target[..path_end].to_string();

    let query = query_index.map(|q| {
        let end = frag_index.unwrap_or(target.len());
        target[q + 1..end].to_string()
    });

    let fragment = frag_index.map(|f| target[f + 1..].to_string());

    (path, query, fragment)
}

impl Request {
    pub(crate) fn new(
        method: Method,
        target: &str,
        version: Version,
        headers: Headers,
    ) -> Self {
        let (path, query_string, fragment) = split_target(target);
        Self {
            method,
            path,
            query_string,
            fragment,
            version,
            headers,
            content_length: -1,
            multipart_boundary: None,
            body: None,
            body_text: None,
            mime_parts: None,
            url_params: OnceLock::new(),
            complete: false,
        }
    }

    /// True once the headers and the full declared body have been consumed.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// True when both the method and the version were recognized.
    pub fn is_valid(&self) -> bool {
        self.method != Method::INVALID && self.version != Version::Invalid
    }

    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Query string parameters, URL-decoded.
    ///
    /// Built from `query_string` on first access and cached afterwards. Items
    /// without `=` map to an empty value; the last duplicate name wins.
    pub fn url_parameters(&self) -> &HashMap<String, String> {
        self.url_params.get_or_init(|| {
            self.query_string
                .as_deref()
                .map(|qs| {
                    url::form_urlencoded::parse(qs.as_bytes())
                        .filter(|(name, _)| !name.is_empty())
                        .map(|(name, value)| (name.into_owned(), value.into_owned()))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// Convenience lookup into [`Request::url_parameters`].
    pub fn url_parameter(&self, name: &str) -> Option<&str> {
        self.url_parameters().get(name).map(String::as_str)
    }

    /// Raw value of the `Connection` header, if the client sent one.
    pub fn connection_header(&self) -> Option<&str> {
        self.header("Connection")
    }
}

/// Builder for constructing Request objects outside the parser.
///
/// Built requests are always complete.
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Version,
    headers: Headers,
    body: Option<Bytes>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            version: Version::Http11,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the raw request target, e.g. `/a/b?x=1#top`.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let method = self.method.ok_or("method missing")?;
        let target = self.target.ok_or("target missing")?;

        let mut request = Request::new(method, &target, self.version, self.headers);
        if let Some(body) = self.body {
            request.content_length = body.len() as i64;
            request.body = Some(body);
        }
        request.mark_complete();
        Ok(request)
    }
}
