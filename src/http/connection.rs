use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::http::mime::ContentType;
use crate::http::parser::{Limits, ParseOutcome, RequestParser};
use crate::http::persistence::Persistence;
use crate::http::request::{Method, Request, Version};
use crate::http::response::{Response, StatusCode};
use crate::http::writer;

/// A boxed, `Send` future borrowing for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Application callback invoked once per valid request.
///
/// The handler is expected to answer through `conn` exactly once, either with
/// [`ConnectionHandle::send`] or by streaming with
/// [`ConnectionHandle::send_headers_only`] and [`ConnectionHandle::write_raw`].
/// Nothing enforces this; a handler that sends nothing leaves the client
/// waiting until the read timeout closes the connection.
///
/// ```ignore
/// struct Hello;
///
/// impl Handler for Hello {
///     fn handle<'a>(
///         &'a self,
///         request: Request,
///         conn: &'a mut ConnectionHandle<'_>,
///     ) -> BoxFuture<'a, anyhow::Result<()>> {
///         Box::pin(async move {
///             let resp = conn.response(StatusCode::Ok, None, "hello");
///             conn.send(resp, Persistence::Unspecified).await?;
///             anyhow::Ok(())
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        request: Request,
        conn: &'a mut ConnectionHandle<'_>,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pending,
    Sent(Persistence),
    Streaming,
}

/// The write side of a connection, lent to a [`Handler`] for one request.
pub struct ConnectionHandle<'c> {
    stream: &'c mut (dyn AsyncWrite + Unpin + Send),
    peer: Option<SocketAddr>,
    version: Version,
    /// What the client's own `Connection` header asked for
    client: Persistence,
    outcome: Outcome,
}

impl<'c> ConnectionHandle<'c> {
    pub fn new(
        stream: &'c mut (dyn AsyncWrite + Unpin + Send),
        peer: Option<SocketAddr>,
        version: Version,
    ) -> Self {
        Self {
            stream,
            peer,
            version,
            client: Persistence::Unspecified,
            outcome: Outcome::Pending,
        }
    }

    /// Records the client's `Connection` preference. It applies when a
    /// response is sent with [`Persistence::Unspecified`] and carries no
    /// `Connection` header of its own.
    pub fn client_persistence(mut self, client: Persistence) -> Self {
        self.client = client;
        self
    }

    /// Version of the request being answered.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Builds a response carrying the request's version.
    pub fn response(
        &self,
        status: StatusCode,
        content_type: Option<&str>,
        content: impl Into<Bytes>,
    ) -> Response {
        Response::new(self.version, status, content_type, Some(content.into()))
    }

    /// True once a response (or a streamed header block) has gone out.
    pub fn has_responded(&self) -> bool {
        self.outcome != Outcome::Pending
    }

    /// Sends a complete response and returns the persistence decision.
    pub async fn send(
        &mut self,
        response: Response,
        persistence: Persistence,
    ) -> anyhow::Result<Persistence> {
        self.ensure_pending()?;
        let persistence = match persistence {
            Persistence::Unspecified if response.header("Connection").is_none() => self.client,
            p => p,
        };
        let decision = writer::send(&mut *self.stream, response, persistence).await?;
        self.outcome = Outcome::Sent(decision);
        Ok(decision)
    }

    /// Sends a `302 Found` pointing at `location`.
    pub async fn redirect(&mut self, location: &str) -> anyhow::Result<Persistence> {
        let response = Response::redirect(self.version, location);
        self.send(response, Persistence::Unspecified).await
    }

    /// Sends only the header block; the body follows through
    /// [`ConnectionHandle::write_raw`]. The connection closes after the
    /// handler returns.
    pub async fn send_headers_only(
        &mut self,
        response: &Response,
        content_length: Option<u64>,
    ) -> anyhow::Result<()> {
        self.ensure_pending()?;
        writer::send_headers_only(&mut *self.stream, response, content_length).await?;
        self.outcome = Outcome::Streaming;
        Ok(())
    }

    /// Writes body bytes after [`ConnectionHandle::send_headers_only`].
    pub async fn write_raw(&mut self, data: &[u8]) -> anyhow::Result<()> {
        if self.outcome != Outcome::Streaming {
            anyhow::bail!("write_raw called before send_headers_only");
        }
        self.stream.write_all(data).await?;
        Ok(())
    }

    fn ensure_pending(&self) -> anyhow::Result<()> {
        if self.outcome != Outcome::Pending {
            anyhow::bail!("a response was already sent for this request");
        }
        Ok(())
    }

    /// What the connection does next, if the handler responded.
    fn decision(&self) -> Option<Persistence> {
        match self.outcome {
            Outcome::Pending => None,
            Outcome::Sent(p) => Some(p),
            Outcome::Streaming => Some(Persistence::Close),
        }
    }
}

/// Per-connection tunables.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub read_timeout: Duration,
    pub read_buffer_size: usize,
    pub limits: Limits,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ConnectionSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            read_timeout: cfg.read_timeout(),
            read_buffer_size: cfg.read_buffer_size.max(1),
            limits: cfg.limits(),
        }
    }
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    /// Send this response, then close
    Rejecting(Response),
    Closed,
}

/// One client session: reads requests in order, hands each to the handler,
/// and keeps the connection open while the responses allow it.
pub struct Connection<S> {
    stream: S,
    peer: Option<SocketAddr>,
    parser: RequestParser,
    handler: Arc<dyn Handler>,
    settings: ConnectionSettings,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, handler: Arc<dyn Handler>, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            peer: None,
            parser: RequestParser::with_limits(settings.limits),
            handler,
            settings,
            state: ConnectionState::Reading,
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            self.state = match state {
                ConnectionState::Reading => self.read_request().await?,

                ConnectionState::Processing(req) => self.process(req).await?,

                ConnectionState::Rejecting(response) => {
                    writer::send(&mut self.stream, response, Persistence::Close).await?;
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = ?self.peer, error = %e, "shutdown failed");
        }
        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<ConnectionState> {
        // Pipelined requests may already be buffered.
        let mut outcome = self.parser.advance();
        let mut temp = vec![0u8; self.settings.read_buffer_size];

        loop {
            match outcome {
                ParseOutcome::Complete(req) => return Ok(ConnectionState::Processing(req)),

                ParseOutcome::Error(e) => {
                    warn!(peer = ?self.peer, error = %e, "malformed request");
                    let response = Response::error(Version::Http11, e.status(), &e.to_string());
                    return Ok(ConnectionState::Rejecting(response));
                }

                ParseOutcome::NeedMore => {}
            }

            let n = match timeout(self.settings.read_timeout, self.stream.read(&mut temp)).await {
                Ok(read) => read?,
                Err(_) => {
                    info!(peer = ?self.peer, "read timed out, abandoning connection");
                    return Ok(ConnectionState::Closed);
                }
            };

            if n == 0 {
                // Client closed connection
                if !self.parser.is_idle() {
                    debug!(peer = ?self.peer, "client closed mid-request");
                }
                return Ok(ConnectionState::Closed);
            }

            outcome = self.parser.feed(&temp[..n]);
        }
    }

    async fn process(&mut self, request: Request) -> anyhow::Result<ConnectionState> {
        if request.version == Version::Invalid {
            warn!(peer = ?self.peer, path = %request.path, "unsupported HTTP version");
            let response = Response::error(
                Version::Http11,
                StatusCode::HttpVersionNotSupported,
                "The request's HTTP version is not supported.",
            );
            return Ok(ConnectionState::Rejecting(response));
        }

        if request.method == Method::INVALID {
            warn!(peer = ?self.peer, path = %request.path, "unsupported method");
            let response = Response::error(
                request.version,
                StatusCode::NotImplemented,
                "The request method is not implemented.",
            );
            return Ok(ConnectionState::Rejecting(response));
        }

        info!(
            peer = ?self.peer,
            method = ?request.method,
            path = %request.path,
            "request"
        );

        let version = request.version;
        let client = request
            .connection_header()
            .map(Persistence::from_header)
            .unwrap_or(Persistence::Unspecified);
        let mut handle = ConnectionHandle::new(&mut self.stream, self.peer, version)
            .client_persistence(client);
        let result = self.handler.handle(request, &mut handle).await;
        let responded = handle.has_responded();
        let decision = handle.decision();

        match result {
            Err(e) => {
                error!(peer = ?self.peer, error = %e, "handler failed");
                if responded {
                    return Ok(ConnectionState::Closed);
                }
                let response = Response::new(
                    version,
                    StatusCode::InternalServerError,
                    Some(ContentType::TextPlain.as_str()),
                    Some(Bytes::from(format!("Internal Server Error!\n{e:?}"))),
                );
                Ok(ConnectionState::Rejecting(response))
            }

            Ok(()) => match decision {
                Some(Persistence::KeepAlive) => Ok(ConnectionState::Reading),
                Some(_) => Ok(ConnectionState::Closed),
                None => {
                    warn!(peer = ?self.peer, "handler sent no response");
                    Ok(ConnectionState::Reading)
                }
            },
        }
    }
}
