//! Per-connection session state.
//!
//! `Built → Negotiating → Agreed | Mismatched | TimedOut | Failed`
//!
//! Sessions share nothing but a read-only `Arc<Context>`, so a failed
//! negotiation never affects another session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cdts::Context;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::protocol::handshake::{self, Agreed, HandshakeError, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Local context built, nothing sent yet.
    Built,
    Negotiating,
    Agreed,
    Mismatched,
    TimedOut,
    /// Transport or protocol fault, including a protocol version mismatch.
    Failed,
}

impl SessionState {
    fn after(outcome: &Result<Agreed, HandshakeError>) -> Self {
        match outcome {
            Ok(_) => SessionState::Agreed,
            Err(HandshakeError::Mismatch(_)) => SessionState::Mismatched,
            Err(HandshakeError::TimedOut(_)) => SessionState::TimedOut,
            Err(_) => SessionState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::Built | SessionState::Negotiating)
    }
}

#[derive(Debug)]
pub struct Session {
    role: Role,
    context: Arc<Context>,
    state: SessionState,
}

impl Session {
    pub fn new(role: Role, context: Arc<Context>) -> Self {
        Self {
            role,
            context,
            state: SessionState::Built,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Run the handshake once. A session cannot be renegotiated.
    pub async fn negotiate<R, W>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        window: Duration,
    ) -> Result<Agreed, HandshakeError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if self.state != SessionState::Built {
            return Err(HandshakeError::Protocol(format!(
                "session already negotiated (state {:?})",
                self.state
            )));
        }
        self.state = SessionState::Negotiating;
        let outcome = handshake::negotiate(self.role, &self.context, reader, writer, window).await;
        self.state = SessionState::after(&outcome);
        outcome
    }
}

/// Outcome of one inbound session, published by the node.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub peer: SocketAddr,
    pub state: SessionState,
    /// Error text for sessions that did not agree.
    pub detail: Option<String>,
}
