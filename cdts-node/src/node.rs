//! ContextNode: QUIC listener that admits a session only after the peer
//! proves it derived the same encryption context.
//!
//! Each connection's first bidirectional stream carries the handshake.
//! Once agreed, later streams carry Ping/Pong health frames. A session that
//! mismatches or times out is closed with its own application error code;
//! the listener keeps accepting.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cdts::{Context, ContextRegistry};
use log::{debug, info, warn};
use tokio::sync::{mpsc, Semaphore};

use crate::config::{NodeConfig, DEFAULT_IDLE_TIMEOUT};
use crate::net::transport;
use crate::protocol::handshake::{self, Agreed, HandshakeError, Role};
use crate::protocol::wire::{Frame, MessageType, MAX_FRAME_PAYLOAD};
use crate::session::{Session, SessionReport, SessionState};

/// Maximum time to wait for a complete health stream read.
const STREAM_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a rejecting side waits for the peer to read the verdict and
/// close before closing the connection itself.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

// Application close codes.
pub const CLOSE_DONE: u32 = 0;
pub const CLOSE_OVERLOADED: u32 = 1;
pub const CLOSE_MISMATCH: u32 = 2;
pub const CLOSE_TIMED_OUT: u32 = 3;
pub const CLOSE_PROTOCOL: u32 = 4;

/// Close code and reason for a failed handshake.
pub fn close_code(err: &HandshakeError) -> (u32, &'static [u8]) {
    match err {
        HandshakeError::Mismatch(_) => (CLOSE_MISMATCH, &b"context mismatch"[..]),
        HandshakeError::TimedOut(_) => (CLOSE_TIMED_OUT, &b"handshake timed out"[..]),
        HandshakeError::VersionMismatch { .. } => (CLOSE_PROTOCOL, &b"protocol version mismatch"[..]),
        HandshakeError::Frame(_) | HandshakeError::Protocol(_) => (CLOSE_PROTOCOL, &b"protocol error"[..]),
    }
}

/// A running context-negotiating node.
pub struct ContextNode {
    pub config: NodeConfig,
    registry: Arc<ContextRegistry>,
    reports: Option<mpsc::UnboundedSender<SessionReport>>,
}

impl ContextNode {
    pub fn new(config: NodeConfig, registry: Arc<ContextRegistry>) -> Self {
        Self {
            config,
            registry,
            reports: None,
        }
    }

    /// Publish every inbound session outcome on `tx`.
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<SessionReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    /// Bind `listen_addr` and serve until the endpoint closes.
    pub async fn run(&self) -> Result<()> {
        let endpoint =
            transport::create_server_endpoint(self.config.listen_addr, self.config.idle_timeout)?;
        self.serve(endpoint).await
    }

    /// Serve on an already-bound endpoint.
    pub async fn serve(&self, endpoint: quinn::Endpoint) -> Result<()> {
        info!(
            "Node listening on {} (context {})",
            endpoint.local_addr()?,
            self.registry.fingerprint().short_hex()
        );

        // Limit concurrent sessions to max_sessions
        let conn_semaphore = Arc::new(Semaphore::new(self.config.max_sessions as usize));
        let window = self.config.handshake_timeout;

        while let Some(incoming) = endpoint.accept().await {
            let conn_sem = conn_semaphore.clone();
            // Each session pins the context current at accept time; a later
            // rebuild affects only later sessions.
            let context = self.registry.current();
            let reports = self.reports.clone();

            tokio::spawn(async move {
                // Acquire session permit (drop releases it)
                let _permit = match conn_sem.try_acquire() {
                    Ok(p) => p,
                    Err(_) => {
                        warn!("Connection rejected: max sessions reached");
                        // Accept and immediately close to signal overload
                        if let Ok(conn) = incoming.await {
                            conn.close(CLOSE_OVERLOADED.into(), b"overloaded");
                        }
                        return;
                    }
                };

                if let Err(e) = handle_connection(incoming, context, window, reports).await {
                    warn!("Connection error: {}", e);
                }
            });
        }

        Ok(())
    }
}

async fn handle_connection(
    incoming: quinn::Incoming,
    context: Arc<Context>,
    window: Duration,
    reports: Option<mpsc::UnboundedSender<SessionReport>>,
) -> Result<()> {
    let peer = incoming.remote_address();
    let conn = match incoming.await {
        Ok(conn) => conn,
        Err(e) => return Err(lost_before_handshake(&reports, peer, e)),
    };
    debug!("Connection from {}", peer);

    let mut session = Session::new(Role::Responder, context);

    // The peer's stream only becomes visible once it sends, so waiting for
    // it counts against the negotiation window too.
    let started = tokio::time::Instant::now();
    let outcome = match tokio::time::timeout(window, conn.accept_bi()).await {
        Ok(Ok((mut send, mut recv))) => {
            let remaining = window.saturating_sub(started.elapsed());
            let outcome = session.negotiate(&mut recv, &mut send, remaining).await;
            let _ = send.finish();
            outcome.map_err(|e| over_window(e, window))
        }
        Ok(Err(e)) => return Err(lost_before_handshake(&reports, peer, e)),
        Err(_) => Err(HandshakeError::TimedOut(window)),
    };
    let state = match &outcome {
        // No stream arrived, so the session never left `Built`.
        Err(HandshakeError::TimedOut(_)) => SessionState::TimedOut,
        _ => session.state(),
    };

    report(
        &reports,
        SessionReport {
            peer,
            state,
            detail: outcome.as_ref().err().map(|e| e.to_string()),
        },
    );

    match outcome {
        Ok(agreed) => {
            info!(
                "Session with {} agreed on context {}",
                peer,
                agreed.fingerprint.short_hex()
            );
            serve_health(&conn).await
        }
        Err(e) => {
            warn!("Session with {} rejected: {}", peer, e);
            let (code, reason) = close_code(&e);
            if state != SessionState::TimedOut {
                // Let the initiator read the HelloAck before the close lands.
                let _ = tokio::time::timeout(CLOSE_GRACE, conn.closed()).await;
            }
            conn.close(code.into(), reason);
            Ok(())
        }
    }
}

/// The peer went away before any handshake frame; still a terminal outcome.
fn lost_before_handshake(
    reports: &Option<mpsc::UnboundedSender<SessionReport>>,
    peer: SocketAddr,
    err: quinn::ConnectionError,
) -> anyhow::Error {
    report(
        reports,
        SessionReport {
            peer,
            state: SessionState::Failed,
            detail: Some(format!("connection lost before handshake: {}", err)),
        },
    );
    err.into()
}

/// A timeout on the remainder of a window is reported against the whole.
fn over_window(err: HandshakeError, window: Duration) -> HandshakeError {
    match err {
        HandshakeError::TimedOut(_) => HandshakeError::TimedOut(window),
        other => other,
    }
}

fn report(reports: &Option<mpsc::UnboundedSender<SessionReport>>, report: SessionReport) {
    if let Some(tx) = reports {
        let _ = tx.send(report);
    }
}

/// Serve health streams on an agreed connection until the peer closes it.
async fn serve_health(conn: &quinn::Connection) -> Result<()> {
    loop {
        let (send, recv) = match conn.accept_bi().await {
            Ok(s) => s,
            Err(quinn::ConnectionError::ApplicationClosed(_)) => break,
            Err(quinn::ConnectionError::ConnectionClosed(_)) => break,
            Err(quinn::ConnectionError::LocallyClosed) => break,
            Err(e) => return Err(e.into()),
        };
        tokio::spawn(async move {
            if let Err(e) = handle_stream(send, recv).await {
                warn!("Stream error: {}", e);
            }
        });
    }
    Ok(())
}

/// Handle a single health stream (one request → one response).
async fn handle_stream(mut send: quinn::SendStream, mut recv: quinn::RecvStream) -> Result<()> {
    let data = tokio::time::timeout(
        STREAM_READ_TIMEOUT,
        recv.read_to_end(MAX_FRAME_PAYLOAD + 5),
    )
    .await
    .map_err(|_| anyhow::anyhow!("stream read timeout"))??;

    let (frame, _) = Frame::decode(&data).map_err(|e| anyhow::anyhow!("{}", e))?;

    let response = match frame.msg_type {
        MessageType::Ping => Frame::new(MessageType::Pong, frame.payload),
        // A second Hello on an agreed connection is not renegotiation.
        MessageType::Hello => Frame::new(MessageType::Error, b"already agreed".to_vec()),
        other => {
            warn!("Rejected unexpected message: {:?}", other);
            return Ok(());
        }
    };

    send.write_all(&response.try_encode()?).await?;
    send.finish()?;
    Ok(())
}

/// An agreed outbound session.
pub struct PeerSession {
    pub agreed: Agreed,
    connection: quinn::Connection,
    endpoint: quinn::Endpoint,
}

impl PeerSession {
    pub fn remote_address(&self) -> SocketAddr {
        self.connection.remote_address()
    }

    /// Send a Ping and wait for the matching Pong.
    pub async fn ping(&self, payload: &[u8]) -> Result<()> {
        let (mut send, mut recv) = self.connection.open_bi().await?;
        let frame = Frame::new_checked(MessageType::Ping, payload.to_vec())?;
        send.write_all(&frame.try_encode()?).await?;
        send.finish()?;

        let data = tokio::time::timeout(
            STREAM_READ_TIMEOUT,
            recv.read_to_end(MAX_FRAME_PAYLOAD + 5),
        )
        .await
        .map_err(|_| anyhow::anyhow!("pong timeout"))??;
        let (resp, _) = Frame::decode(&data).map_err(|e| anyhow::anyhow!("{}", e))?;
        if resp.msg_type != MessageType::Pong || resp.payload != payload {
            anyhow::bail!("expected matching Pong, got {:?}", resp.msg_type);
        }
        Ok(())
    }

    pub async fn close(self) {
        self.connection.close(CLOSE_DONE.into(), b"done");
        self.endpoint.wait_idle().await;
    }
}

/// Connect to a node and negotiate context agreement.
///
/// `window` bounds everything from the first QUIC packet to the verdict.
/// Handshake failures come back as [`HandshakeError`] inside the
/// `anyhow::Error`; the connection is closed with the matching code.
pub async fn connect_and_negotiate(
    addr: SocketAddr,
    ctx: &Context,
    window: Duration,
) -> Result<PeerSession> {
    let started = tokio::time::Instant::now();
    let endpoint = transport::create_client_endpoint(addr, DEFAULT_IDLE_TIMEOUT)?;
    let connecting = endpoint.connect(addr, transport::SERVER_NAME)?;

    let opened = tokio::time::timeout(window, async {
        let connection = connecting.await?;
        let streams = connection.open_bi().await?;
        Ok::<_, quinn::ConnectionError>((connection, streams))
    })
    .await;
    let (connection, (mut send, mut recv)) = match opened {
        Ok(result) => result?,
        Err(_) => {
            warn!("No QUIC handshake from {} within {:?}", addr, window);
            endpoint.close(CLOSE_TIMED_OUT.into(), b"handshake timed out");
            return Err(HandshakeError::TimedOut(window).into());
        }
    };

    let remaining = window.saturating_sub(started.elapsed());
    match handshake::negotiate(Role::Initiator, ctx, &mut recv, &mut send, remaining).await {
        Ok(agreed) => {
            let _ = send.finish();
            info!(
                "Agreed with {} on context {}",
                addr,
                agreed.fingerprint.short_hex()
            );
            Ok(PeerSession {
                agreed,
                connection,
                endpoint,
            })
        }
        Err(e) => {
            let e = over_window(e, window);
            warn!("Handshake with {} failed: {}", addr, e);
            let (code, reason) = close_code(&e);
            connection.close(code.into(), reason);
            endpoint.wait_idle().await;
            Err(e.into())
        }
    }
}
