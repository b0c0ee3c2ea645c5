//! Daemon server: accept loop, worker pool, RPC dispatch, and
//! connection lifecycle (register / join / disconnect cleanup).

use std::fs;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::thread;
use std::time::Duration;

use serde_json::json;
use tracing::debug;
use tracing::info;
use tracing::warn;

use dendrite_ipc::{RpcRequest, RpcResponse, error_codes, socket_path};
use dendrite_proc::OsProcessLauncher;

use crate::config::DaemonConfig;
use crate::connections::{ConnectionId, ConnectionRegistry};
use crate::error::DaemonError;
use crate::handlers;
use crate::metrics::DaemonMetrics;
use crate::relay::DataRelay;
use crate::sessions::SessionStore;
use crate::signal_handler::SignalHandler;
use crate::sleeper::RealSleeper;
use crate::supervisor::Supervisor;
use crate::transport::{
    TransportConnection, TransportError, TransportListener, UnixSocketConnection,
    UnixSocketListener,
};
use crate::usecases::UseCaseContainer;

const CHANNEL_CAPACITY: usize = 16;
const ACCEPT_POLL: Duration = Duration::from_millis(50);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct DaemonServer {
    config: DaemonConfig,
    supervisor: Arc<Supervisor>,
    relay: Arc<DataRelay>,
    connections: Arc<ConnectionRegistry>,
    sessions: Arc<SessionStore>,
    usecases: UseCaseContainer<Supervisor>,
    metrics: Arc<DaemonMetrics>,
    active_connections: Arc<AtomicUsize>,
}

impl Default for DaemonServer {
    fn default() -> Self {
        Self::new()
    }
}

struct ThreadPool {
    workers: Vec<thread::JoinHandle<()>>,
    sender: SyncSender<UnixSocketConnection>,
}

impl ThreadPool {
    /// One worker per allowed connection: connections are long-lived
    /// (subscribers hold them open for event delivery), so a worker is
    /// occupied for the connection's whole lifetime.
    fn new(
        size: usize,
        server: Arc<DaemonServer>,
        shutdown: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel::<UnixSocketConnection>(CHANNEL_CAPACITY);
        let receiver = Arc::new(std::sync::Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = Arc::clone(&receiver);
            let server = Arc::clone(&server);
            let shutdown = Arc::clone(&shutdown);

            let handle = thread::Builder::new()
                .name(format!("conn-worker-{}", id))
                .spawn(move || {
                    loop {
                        if shutdown.load(Ordering::Relaxed) {
                            break;
                        }

                        let conn = {
                            let lock = match receiver.lock() {
                                Ok(lock) => lock,
                                Err(_) => break,
                            };
                            match lock.recv_timeout(Duration::from_millis(100)) {
                                Ok(conn) => conn,
                                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                                Err(mpsc::RecvTimeoutError::Disconnected) => break,
                            }
                        };

                        server.active_connections.fetch_add(1, Ordering::Relaxed);
                        server.handle_client(conn);
                        server.active_connections.fetch_sub(1, Ordering::Relaxed);
                    }
                });

            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => warn!(worker = id, error = %e, "failed to spawn worker"),
            }
        }

        if workers.is_empty() {
            return Err(std::io::Error::other("failed to spawn any worker threads"));
        }
        Ok(ThreadPool { workers, sender })
    }

    fn execute(&self, conn: UnixSocketConnection) -> Result<(), UnixSocketConnection> {
        self.sender.try_send(conn).map_err(|e| match e {
            mpsc::TrySendError::Full(c) | mpsc::TrySendError::Disconnected(c) => c,
        })
    }

    fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

impl DaemonServer {
    pub fn new() -> Self {
        Self::with_config(DaemonConfig::default())
    }

    pub fn with_config(config: DaemonConfig) -> Self {
        let sessions = Arc::new(SessionStore::new(config.uploads_dir()));
        let supervisor = Arc::new(Supervisor::new(
            &config,
            Arc::new(OsProcessLauncher),
            Arc::clone(&sessions),
            Arc::new(RealSleeper),
        ));
        let relay = Arc::new(DataRelay::new());
        let usecases = UseCaseContainer::new(
            Arc::clone(&supervisor),
            Arc::clone(&relay),
            Arc::clone(&sessions),
        );

        Self {
            config,
            supervisor,
            relay,
            connections: Arc::new(ConnectionRegistry::new()),
            sessions,
            usecases,
            metrics: Arc::new(DaemonMetrics::new()),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn handle_request(&self, conn_id: ConnectionId, request: RpcRequest) -> RpcResponse {
        match request.method.as_str() {
            "ping" => RpcResponse::success(request.id, json!({ "pong": true })),

            "health" => RpcResponse::success(
                request.id,
                json!({
                    "status": "ok",
                    "sims": self.supervisor.process_count(),
                    "connections": self.active_connections.load(Ordering::Relaxed),
                    "uptime_ms": self.metrics.uptime_ms(),
                }),
            ),

            "metrics" => RpcResponse::success(request.id, self.metrics.snapshot()),

            "launch" => {
                let response = handlers::sim::handle_launch(&self.usecases.launch, request);
                if response.error.is_none() {
                    self.metrics.record_launch();
                }
                response
            }
            "terminate" => handlers::sim::handle_terminate(&self.usecases.terminate, request),
            "status" => handlers::sim::handle_status(&self.usecases.status, request),
            "sims" => handlers::sim::handle_sims(&self.usecases.sims, request),
            "fetch_artifact" => {
                handlers::relay::handle_fetch_artifact(&self.usecases.artifact, request)
            }

            "push" => {
                let response = handlers::relay::handle_push(&self.usecases.push, request);
                if let Some(result) = &response.result {
                    if let Some(delivered) = result.get("delivered").and_then(|d| d.as_u64()) {
                        self.metrics.record_publish(delivered as usize);
                    }
                }
                response
            }

            // Event-style methods scoped to this connection.
            "register_client" => match request.require_str("client_id") {
                Ok(client_id) => {
                    self.connections.register(conn_id, client_id);
                    RpcResponse::action_success(request.id)
                }
                Err(resp) => resp,
            },
            "join_channel" => match request.require_str("data_channel_id") {
                Ok(channel) => {
                    self.relay.join(conn_id, channel);
                    RpcResponse::action_success(request.id)
                }
                Err(resp) => resp,
            },
            "sim_command" => handlers::sim::handle_command(&self.usecases.command, request),

            _ => RpcResponse::error(
                request.id,
                error_codes::METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_client(&self, mut conn: impl TransportConnection) {
        let conn_id = self.connections.next_id();

        if let Err(e) = conn.set_read_timeout(Some(self.config.idle_timeout)) {
            warn!(conn_id, error = %e, "failed to set read timeout");
            return;
        }
        if let Err(e) = conn.set_write_timeout(Some(WRITE_TIMEOUT)) {
            warn!(conn_id, error = %e, "failed to set write timeout");
            return;
        }

        self.relay.attach(conn_id, conn.event_sink());
        debug!(conn_id, "connection open");

        loop {
            match conn.read_request() {
                Ok(request) => {
                    self.metrics.record_request();
                    let response = self.handle_request(conn_id, request);
                    if response.error.is_some() {
                        self.metrics.record_error();
                    }
                    if let Err(e) = conn.write_response(&response) {
                        debug!(conn_id, error = %e, "write failed, closing connection");
                        break;
                    }
                }
                Err(TransportError::ConnectionClosed) => break,
                Err(TransportError::Timeout) => {
                    debug!(conn_id, "idle timeout, closing connection");
                    break;
                }
                Err(TransportError::Parse(e)) => {
                    self.metrics.record_error();
                    let response =
                        RpcResponse::error(0, error_codes::GENERIC_ERROR, &format!("Parse error: {}", e));
                    if conn.write_response(&response).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(conn_id, error = %e, "transport error, closing connection");
                    break;
                }
            }
        }

        self.disconnect(conn_id);
    }

    /// Disconnect cleanup: always clear subscriptions; if the connection
    /// registered a client id, remove its session directory and
    /// terminate its active process.
    fn disconnect(&self, conn_id: ConnectionId) {
        self.relay.detach(conn_id);
        self.relay.leave_all(conn_id);

        let Some(client_id) = self.connections.deregister(conn_id) else {
            debug!(conn_id, "connection closed (no registered client)");
            return;
        };

        info!(conn_id, client_id, "client disconnected, cleaning up");
        if let Err(e) = self.sessions.remove(&client_id) {
            warn!(client_id, error = %e, "session dir cleanup failed");
        }
        if let Some(pid) = self.supervisor.terminate_for_client(&client_id) {
            info!(client_id, pid, "terminated simulation on disconnect");
        }
    }

    /// Run the accept loop until the shutdown flag flips; then drain
    /// workers and terminate every registered simulation.
    pub fn serve(
        self: Arc<Self>,
        listener: UnixSocketListener,
        shutdown: Arc<AtomicBool>,
    ) -> Result<(), DaemonError> {
        listener
            .set_nonblocking(true)
            .map_err(|e| DaemonError::SocketBind(e.to_string()))?;

        let pool = ThreadPool::new(
            self.config.max_connections,
            Arc::clone(&self),
            Arc::clone(&shutdown),
        )
        .map_err(|e| DaemonError::ThreadPool(e.to_string()))?;

        while !shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok(conn) => {
                    if pool.execute(conn).is_err() {
                        warn!("connection queue full, dropping incoming connection");
                    }
                }
                Err(TransportError::Timeout) => thread::sleep(ACCEPT_POLL),
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        info!("shutting down");
        pool.shutdown();
        self.supervisor.shutdown_all();
        Ok(())
    }
}

/// Bind the daemon socket and serve until SIGINT/SIGTERM.
///
/// A stale socket file left by a dead daemon is removed; a live one
/// means another instance owns it.
pub fn start_daemon(config: DaemonConfig) -> Result<(), DaemonError> {
    let path = socket_path();
    if path.exists() {
        if UnixStream::connect(&path).is_ok() {
            return Err(DaemonError::AlreadyRunning);
        }
        debug!(path = %path.display(), "removing stale socket");
        let _ = fs::remove_file(&path);
    }

    let listener =
        UnixSocketListener::bind(&path).map_err(|e| DaemonError::SocketBind(e.to_string()))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let _signals = SignalHandler::setup(Arc::clone(&shutdown))?;

    let server = Arc::new(DaemonServer::with_config(config));
    info!(path = %path.display(), "dendrite daemon listening");

    let result = server.serve(listener, shutdown);
    let _ = fs::remove_file(&path);
    result
}
