use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_MAX_SESSIONS: u32 = 8;
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a context-negotiating node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address to listen for QUIC connections.
    pub listen_addr: SocketAddr,
    /// Maximum concurrent sessions.
    pub max_sessions: u32,
    /// Negotiation window for each session's handshake.
    pub handshake_timeout: Duration,
    /// QUIC idle timeout for agreed sessions; keep-alives run well inside it.
    pub idle_timeout: Duration,
}

impl NodeConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            max_sessions: DEFAULT_MAX_SESSIONS,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}
