//! TCP server hosting the board
//!
//! Each accepted connection gets a reader loop driving a `Session` and a
//! writer task draining that connection's outbound queue.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::WriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::hub::Hub;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{Flow, Session};

/// Board server handle
pub struct Server {
    addr: SocketAddr,
    hub: Arc<Hub>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

/// How long `shutdown` waits for sessions to clean up
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

impl Server {
    /// Bind and start accepting connections
    pub async fn start(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr()).await?;
        let bound_addr = listener.local_addr()?;

        info!(
            addr = %bound_addr,
            redaction = ?config.redaction,
            delete_auth = ?config.delete_auth,
            "Server started"
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        let hub = Arc::new(Hub::from_config(&config));

        let mut tasks = vec![tokio::spawn(accept_loop(
            listener,
            hub.clone(),
            config.clone(),
            shutdown_tx.clone(),
            shutdown_tx.subscribe(),
        ))];

        if config.stats_interval_secs > 0 {
            tasks.push(tokio::spawn(stats_task(
                hub.clone(),
                Duration::from_secs(config.stats_interval_secs),
                shutdown_tx.subscribe(),
            )));
        }

        Ok(Server {
            addr: bound_addr,
            hub,
            shutdown_tx,
            tasks,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Stop accepting, close every session and wait for their cleanup
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");

        let Server { hub, tasks, .. } = self;
        let drain = async move {
            for task in tasks {
                if let Err(e) = task.await {
                    warn!(error = %e, "Server task ended abnormally");
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Shutdown grace period elapsed");
        }

        info!(connections = hub.connection_count().await, "Server stopped");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    hub: Arc<Hub>,
    config: ServerConfig,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        if hub.connection_count().await >= config.max_connections {
                            warn!(addr = %addr, max = config.max_connections, "Server full, closing connection");
                            continue;
                        }
                        debug!(addr = %addr, "New connection");
                        connections.spawn(handle_connection(
                            stream,
                            addr,
                            hub.clone(),
                            config.outbound_queue,
                            shutdown_tx.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = shutdown_rx.recv() => {
                info!(open = connections.len(), "Accept loop shutting down");
                break;
            }
        }
    }

    // Sessions saw the same signal; wait for their cleanup to finish
    while connections.join_next().await.is_some() {}
}

/// Handle a single client connection from open to cleanup
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<Hub>,
    queue_depth: usize,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut reader, writer) = tokio::io::split(stream);

    let (msg_tx, msg_rx) = mpsc::channel(queue_depth);
    let mut writer_handle = tokio::spawn(writer_task(writer, msg_rx));

    let mut session = Session::open(hub, msg_tx).await;
    let conn = session.id();
    info!(addr = %addr, conn = %conn, "Connection opened");

    loop {
        tokio::select! {
            result = read_frame(&mut reader) => {
                match result {
                    Ok(payload) => {
                        if read_message(&mut session, &payload).await == Flow::Stop {
                            break;
                        }
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!(conn = %conn, "Connection closed");
                        break;
                    }
                    Err(e) => {
                        warn!(conn = %conn, error = %e, "Read error");
                        break;
                    }
                }
            }
            // The writer stops when a write fails or the hub drops this connection
            _ = &mut writer_handle => {
                debug!(conn = %conn, "Writer stopped");
                break;
            }
            _ = shutdown_rx.recv() => {
                debug!(conn = %conn, "Closing for shutdown");
                break;
            }
        }
    }

    session.close().await;
    writer_handle.abort();

    info!(addr = %addr, conn = %conn, "Connection closed");
}

/// Decode one frame and hand it to the session
async fn read_message(session: &mut Session, payload: &[u8]) -> Flow {
    match ClientMessage::decode(payload) {
        Ok(Some(msg)) => session.handle(msg).await,
        Ok(None) => {
            debug!(conn = %session.id(), "Ignoring unknown message type");
            Flow::Continue
        }
        Err(e) => {
            warn!(conn = %session.id(), error = %e, "Dropping malformed message");
            Flow::Continue
        }
    }
}

/// Writer task - sends queued messages to the client
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<ServerMessage>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &msg).await {
            debug!(error = %e, kind = msg.kind(), "Write failed");
            break;
        }
    }
}

/// Stats task - logs board and connection counts periodically
async fn stats_task(hub: Arc<Hub>, interval: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let stats = hub.stats().await;
                info!(
                    cards = stats.cards,
                    connections = stats.connections,
                    identities = stats.identities,
                    "Board stats"
                );
            }
            _ = shutdown_rx.recv() => {
                debug!("Stats task shutting down");
                break;
            }
        }
    }
}
