use http::StatusCode;
use may::coroutine::{self, JoinHandle};
use may::net::{TcpListener, TcpStream};
use std::io::{self, BufReader, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::error::ProtocolError;
use super::payload::RequestBody;
use super::request::read_request_head;
use super::response::write_response;
use super::shutdown::ShutdownSignal;
use crate::dispatcher::{Dispatcher, HandlerResponse};
use crate::ids::RequestId;
use crate::runtime_config::RuntimeConfig;

/// Upper bound on how long a stopping server waits for in-flight requests.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Back-off after a failed `accept`.
const ACCEPT_RETRY: Duration = Duration::from_millis(10);

/// HTTP/1.1 server running the accept loop and every connection on `may`
/// coroutines.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
    config: RuntimeConfig,
}

/// Handle to a running HTTP server
///
/// Provides methods for waiting until the server is ready, stopping it gracefully,
/// or joining the accept coroutine.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Arc<ShutdownSignal>,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to (with the real port when bound to 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// Polls the server address by attempting TCP connections until successful.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` error if the server doesn't become ready within ~250ms (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        let target = connect_target(self.addr);
        for _ in 0..50 {
            if std::net::TcpStream::connect(target).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop the server gracefully
    ///
    /// Raises the shutdown flag, wakes the accept loop and waits for it to
    /// drain in-flight requests.
    pub fn stop(self) {
        if self.shutdown.request() {
            info!(addr = %self.addr, "Server stop requested");
        }
        if self.shutdown.claim_wake() {
            wake_acceptor(self.addr);
        }
        if self.handle.join().is_err() {
            error!(addr = %self.addr, "Accept coroutine panicked");
        }
    }

    /// Wait for the server to finish
    ///
    /// Blocks until `/quit` (or [`stop`](Self::stop) from elsewhere) ends the
    /// accept loop and in-flight requests have drained.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl HttpServer {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, config: RuntimeConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Bind `addr` and start accepting connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, the port cannot be bound,
    /// or the accept coroutine cannot be spawned.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        let shutdown = Arc::clone(self.dispatcher.shutdown_signal());

        info!(
            addr = %local_addr,
            stack_size = self.config.stack_size,
            max_body_bytes = self.config.max_body_bytes,
            "Wax server listening"
        );

        let HttpServer { dispatcher, config } = self;
        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The closure owns everything it touches (listener, Arc'd dispatcher, Copy config)
        // and does not rely on thread-local state.
        let handle = unsafe {
            coroutine::Builder::new()
                .name("wax-acceptor".to_string())
                .stack_size(config.stack_size)
                .spawn(move || accept_loop(listener, local_addr, dispatcher, config))
        }?;

        Ok(ServerHandle {
            addr: local_addr,
            shutdown,
            handle,
        })
    }
}

fn accept_loop(
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    config: RuntimeConfig,
) {
    let shutdown = Arc::clone(dispatcher.shutdown_signal());

    for stream in listener.incoming() {
        if shutdown.is_requested() {
            break;
        }
        match stream {
            Ok(stream) => spawn_connection(stream, local_addr, &dispatcher, config),
            Err(e) => {
                error!(error = %e, "Accept failed");
                coroutine::sleep(ACCEPT_RETRY);
            }
        }
    }
    drop(listener);

    info!(
        in_flight = shutdown.in_flight(),
        "Listener closed, draining in-flight requests"
    );
    if !shutdown.wait_idle(DRAIN_TIMEOUT) {
        warn!(
            in_flight = shutdown.in_flight(),
            timeout_ms = DRAIN_TIMEOUT.as_millis() as u64,
            "In-flight requests still running after drain timeout"
        );
    }
    info!(addr = %local_addr, "Server stopped");
}

fn spawn_connection(
    stream: TcpStream,
    local_addr: SocketAddr,
    dispatcher: &Arc<Dispatcher>,
    config: RuntimeConfig,
) {
    let peer = match stream.peer_addr() {
        Ok(peer) => peer,
        Err(e) => {
            debug!(error = %e, "Dropping connection without peer address");
            return;
        }
    };
    let dispatcher = Arc::clone(dispatcher);

    // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
    // The connection coroutine owns its stream and an Arc of the dispatcher.
    let spawn_result = unsafe {
        coroutine::Builder::new()
            .stack_size(config.stack_size)
            .spawn(move || {
                serve_connection(stream, peer, &dispatcher, &config);
                let shutdown = dispatcher.shutdown_signal();
                if shutdown.claim_wake() {
                    wake_acceptor(local_addr);
                }
            })
    };
    if let Err(e) = spawn_result {
        error!(peer = %peer, error = %e, "Failed to spawn connection coroutine");
    }
}

/// Serve requests on one connection until it closes or must be closed.
pub(crate) fn serve_connection<S: Read + Write>(
    stream: S,
    peer: SocketAddr,
    dispatcher: &Dispatcher,
    config: &RuntimeConfig,
) {
    debug!(peer = %peer, "Connection opened");
    let mut reader = BufReader::new(stream);
    loop {
        if dispatcher.shutdown_requested() {
            break;
        }
        match serve_request(&mut reader, peer, dispatcher, config) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Closing connection after protocol error");
                break;
            }
        }
    }
    debug!(peer = %peer, "Connection closed");
}

/// Read, dispatch and answer one request. `Ok(true)` keeps the connection.
fn serve_request<S: Read + Write>(
    reader: &mut BufReader<S>,
    peer: SocketAddr,
    dispatcher: &Dispatcher,
    config: &RuntimeConfig,
) -> Result<bool, ProtocolError> {
    let head = match read_request_head(reader, config.max_header_bytes) {
        Ok(Some(head)) => head,
        Ok(None) => return Ok(false),
        Err(e) if e.is_head_error() => {
            warn!(peer = %peer, error = %e, "Malformed request head");
            let response = HandlerResponse::error(StatusCode::BAD_REQUEST, "Malformed request");
            write_response(reader.get_mut(), &response, &RequestId::new(), false)?;
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let _in_flight = dispatcher.shutdown_signal().begin_request();
    let request_id = RequestId::from_header_or_new(head.get_header("x-request-id"));
    let start = Instant::now();

    let mut body = RequestBody::new(&head, reader, config.max_body_bytes);
    let response = dispatcher.dispatch(&head, &mut body)?;
    let keep_alive =
        head.wants_keep_alive() && body.is_consumed() && !dispatcher.shutdown_requested();

    write_response(reader.get_mut(), &response, &request_id, keep_alive)?;

    info!(
        request_id = %request_id,
        method = %head.method,
        path = %head.path,
        status = response.status.as_u16(),
        keep_alive,
        latency_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    Ok(keep_alive)
}

/// Loopback address for reaching a listener bound to `addr`.
fn connect_target(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}

/// Unblock the accept loop so it observes the shutdown flag.
fn wake_acceptor(addr: SocketAddr) {
    match TcpStream::connect(connect_target(addr)) {
        Ok(_) => debug!(addr = %addr, "Accept loop woken"),
        Err(e) => debug!(addr = %addr, error = %e, "Accept loop already gone"),
    }
}
