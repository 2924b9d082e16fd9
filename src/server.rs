use std::{
    io::{self, ErrorKind},
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::{Duration, Instant},
};

use futures::FutureExt;
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    time::timeout,
};

use crate::{
    api::{self, CallbackOutcome},
    error::{AuthError, CallbackError},
    types::AuthSession,
    warning,
};

/// Connections that stay silent this long are dropped. Browsers like to open
/// speculative connections they never use.
pub const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Accepted connections waiting for their request line. Further clients stay
/// in the kernel backlog until a slot frees up.
pub const MAX_PENDING_CONNECTIONS: usize = 8;

const WRITE_TIMEOUT: Duration = Duration::from_secs(1);
const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerOutcome {
    Success,
    Failure,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Listening,
    AwaitingRequest,
    ParsingRequest,
    Closed(ListenerOutcome),
}

/// One accepted browser connection, kept for a single request/response.
#[derive(Debug)]
struct PendingConnection {
    stream: TcpStream,
    remote: SocketAddr,
    buffer: Vec<u8>,
    accepted_at: Instant,
}

enum ReadProgress {
    Partial,
    Complete,
}

impl PendingConnection {
    fn new(stream: TcpStream, remote: SocketAddr) -> Self {
        PendingConnection {
            stream,
            remote,
            buffer: Vec::with_capacity(READ_CHUNK),
            accepted_at: Instant::now(),
        }
    }

    fn is_idle(&self) -> bool {
        self.accepted_at.elapsed() >= IDLE_CONNECTION_TIMEOUT
    }

    /// Reads whatever the runtime already has for this socket.
    fn fill(&mut self) -> io::Result<ReadProgress> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.try_read(&mut chunk) {
                // peer finished sending, parse whatever arrived
                Ok(0) => return Ok(ReadProgress::Complete),
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    if api::header_complete(&self.buffer) {
                        return Ok(ReadProgress::Complete);
                    }
                    if self.buffer.len() >= api::MAX_REQUEST_BYTES {
                        self.buffer.truncate(api::MAX_REQUEST_BYTES);
                        return Ok(ReadProgress::Complete);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(ReadProgress::Partial),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Hands the response to a background task. A browser that never reads
    /// is cut off after `WRITE_TIMEOUT`.
    fn respond(self, status: u16, reason: &str, body: &str) {
        let response = api::http_response(status, reason, body);
        let PendingConnection {
            mut stream, remote, ..
        } = self;

        tokio::spawn(async move {
            let sent = timeout(WRITE_TIMEOUT, async {
                stream.write_all(response.as_bytes()).await?;
                stream.shutdown().await
            })
            .await;

            match sent {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warning!("Cannot answer redirect request from {}: {}", remote, e),
                Err(_) => warning!("Gave up answering redirect request from {}", remote),
            }
        });
    }
}

/// Single-shot loopback listener capturing the authorization redirect.
///
/// The listener never blocks: [`RedirectListener::poll`] only accepts and
/// reads what the Tokio runtime already has ready, and answers are written
/// by spawned tasks. The owner calls it on every scheduler tick until it
/// yields the authorization code (or a denial), after which the socket is
/// closed for good. Polling must happen inside a Tokio runtime.
#[derive(Debug)]
pub struct RedirectListener {
    state: ListenerState,
    socket: Option<TcpListener>,
    pending: Vec<PendingConnection>,
    local_addr: Option<SocketAddr>,
    listen_port: u16,
    redirect_path: String,
    expected_state: String,
    success_page: String,
}

impl RedirectListener {
    pub fn new(session: &AuthSession, success_page: Option<String>) -> Self {
        RedirectListener {
            state: ListenerState::Idle,
            socket: None,
            pending: Vec::new(),
            local_addr: None,
            listen_port: session.listen_port,
            redirect_path: session.redirect_path(),
            expected_state: session.state.clone(),
            success_page: success_page.unwrap_or_else(|| api::DEFAULT_SUCCESS_PAGE.to_string()),
        }
    }

    /// Creates the listener and starts listening right away.
    pub async fn bind(session: &AuthSession, success_page: Option<String>) -> Result<Self, AuthError> {
        let mut listener = Self::new(session, success_page);
        listener.listen().await?;
        Ok(listener)
    }

    /// Binds `127.0.0.1:<listen_port>`. Only ever the loopback interface.
    pub async fn listen(&mut self) -> Result<SocketAddr, AuthError> {
        let port = self.listen_port;
        let bind_error = |source| AuthError::Bind { port, source };

        let socket = TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(bind_error)?;
        let addr = socket.local_addr().map_err(bind_error)?;

        self.socket = Some(socket);
        self.local_addr = Some(addr);
        self.state = ListenerState::Listening;
        Ok(addr)
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_open(&self) -> bool {
        matches!(
            self.state,
            ListenerState::Listening | ListenerState::AwaitingRequest | ListenerState::ParsingRequest
        )
    }

    /// Advances the listener by one step.
    ///
    /// Returns `Some(Ok(code))` exactly once, for the first request whose
    /// `state` matches, and `Some(Err(AuthError::Denied))` if the user
    /// refused consent. Every other request is answered (or dropped) and the
    /// listener keeps listening. Idle connections never hold back the others.
    pub fn poll(&mut self) -> Option<Result<String, AuthError>> {
        if !self.is_open() {
            return None;
        }
        self.accept_ready();

        let mut index = 0;
        while index < self.pending.len() {
            match self.pending[index].fill() {
                Ok(ReadProgress::Partial) if self.pending[index].is_idle() => {
                    self.pending.remove(index);
                }
                Ok(ReadProgress::Partial) => index += 1,
                Ok(ReadProgress::Complete) => {
                    let connection = self.pending.remove(index);
                    self.state = ListenerState::ParsingRequest;
                    if let Some(outcome) = self.handle_request(connection) {
                        return Some(outcome);
                    }
                }
                Err(e) => {
                    let connection = self.pending.remove(index);
                    warning!("Lost redirect connection from {}: {}", connection.remote, e);
                }
            }
        }

        self.state = if self.pending.is_empty() {
            ListenerState::Listening
        } else {
            ListenerState::AwaitingRequest
        };
        None
    }

    pub fn cancel(&mut self) {
        if !matches!(self.state, ListenerState::Closed(_)) {
            self.close(ListenerOutcome::Cancelled);
        }
    }

    fn accept_ready(&mut self) {
        let Some(socket) = &self.socket else {
            return;
        };

        while self.pending.len() < MAX_PENDING_CONNECTIONS {
            match socket.accept().now_or_never() {
                Some(Ok((stream, remote))) => self.pending.push(PendingConnection::new(stream, remote)),
                Some(Err(e)) => {
                    warning!("Failed to accept redirect connection: {}", e);
                    break;
                }
                None => break,
            }
        }
    }

    fn handle_request(&mut self, pending: PendingConnection) -> Option<Result<String, AuthError>> {
        // unparsable requests are dropped without an answer
        let request = api::parse_request(&pending.buffer).ok()?;

        match api::evaluate(&request, &self.redirect_path, &self.expected_state) {
            Ok(CallbackOutcome::Authorized(code)) => {
                pending.respond(200, "OK", &self.success_page);
                self.close(ListenerOutcome::Success);
                Some(Ok(code))
            }
            Ok(CallbackOutcome::Denied(reason)) => {
                pending.respond(200, "OK", api::FAILURE_PAGE);
                self.close(ListenerOutcome::Failure);
                Some(Err(AuthError::Denied(reason)))
            }
            Err(CallbackError::UnknownPath(_)) => {
                pending.respond(404, "Not Found", api::NOT_FOUND_PAGE);
                None
            }
            Err(e) => {
                warning!("Ignoring redirect from {}: {}", pending.remote, e);
                pending.respond(400, "Bad Request", api::FAILURE_PAGE);
                None
            }
        }
    }

    fn close(&mut self, outcome: ListenerOutcome) {
        self.pending.clear();
        self.socket = None;
        self.state = ListenerState::Closed(outcome);
    }
}
