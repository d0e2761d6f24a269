//! Keep-alive vs. close decision.
//!
//! | override | `Connection` header | version | result |
//! |---|---|---|---|
//! | `KeepAlive` / `Close` | any | any | the override, header rewritten |
//! | `Unspecified` | `keep-alive` | any | `KeepAlive` |
//! | `Unspecified` | `close` | any | `Close` |
//! | `Unspecified` | absent | 1.1 | `KeepAlive` |
//! | `Unspecified` | absent | 0.9 / 1.0 / invalid | `Close` |

use crate::http::request::Version;

/// Whether a connection stays open after a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    KeepAlive,
    Close,
    /// Let the existing header or the protocol version decide
    Unspecified,
}

impl Persistence {
    /// Value written into the `Connection` header.
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            Persistence::KeepAlive => Some("keep-alive"),
            Persistence::Close => Some("close"),
            Persistence::Unspecified => None,
        }
    }

    /// Reads a `Connection` header value. Tokens other than `keep-alive` and
    /// `close` leave the decision open.
    pub fn from_header(value: &str) -> Self {
        let mut result = Persistence::Unspecified;
        for token in value.split(',').map(str::trim) {
            if token.eq_ignore_ascii_case("close") {
                return Persistence::Close;
            }
            if token.eq_ignore_ascii_case("keep-alive") {
                result = Persistence::KeepAlive;
            }
        }
        result
    }
}

/// Resolves the persistence of a connection. Never returns `Unspecified`.
///
/// ```
/// # use pocket_httpd::http::persistence::{decide, Persistence};
/// # use pocket_httpd::http::request::Version;
/// assert_eq!(decide(Version::Http11, None, Persistence::Unspecified), Persistence::KeepAlive);
/// assert_eq!(decide(Version::Http10, None, Persistence::Unspecified), Persistence::Close);
/// ```
pub fn decide(version: Version, existing: Option<&str>, requested: Persistence) -> Persistence {
    if requested != Persistence::Unspecified {
        return requested;
    }

    match existing.map(Persistence::from_header) {
        Some(p @ (Persistence::KeepAlive | Persistence::Close)) => p,
        _ if version == Version::Http11 => Persistence::KeepAlive,
        _ => Persistence::Close,
    }
}
