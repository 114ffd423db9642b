//! Hello/HelloAck context negotiation.
//!
//! The first exchange on a new session. The initiator sends its context
//! fingerprint, the responder answers with its own and a verdict. Each
//! side compares the peer's fingerprint against its own independently, so
//! a session is agreed only when both sides conclude it is.

use std::time::Duration;

use bincode::Options;
use cdts::{Context, Fingerprint, MismatchError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::protocol::wire::{read_frame, write_frame, Frame, FrameError, MessageType};

/// Maximum size for deserialization of Hello/HelloAck (4 KB).
const MAX_HANDSHAKE_MSG_SIZE: u64 = 4 * 1024;

/// Protocol version for this implementation.
pub const PROTOCOL_VERSION: u32 = 1;

/// Initial handshake message sent by the connecting peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub version: u32,
    pub fingerprint: Fingerprint,
}

/// Handshake response from the listening peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloAck {
    pub version: u32,
    /// Responder's own fingerprint, never an echo of the initiator's.
    pub fingerprint: Fingerprint,
    /// Whether the responder found the contexts identical.
    pub accepted: bool,
}

/// Which side of the exchange this endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Both sides derived the same context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agreed {
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error(transparent)]
    Mismatch(#[from] MismatchError),

    #[error("handshake did not complete within {0:?}")]
    TimedOut(Duration),

    #[error("protocol version mismatch: local {local}, peer {peer}")]
    VersionMismatch { local: u32, peer: u32 },

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("protocol violation: {0}")]
    Protocol(String),
}

pub fn encode_hello(hello: &Hello) -> Result<Vec<u8>, HandshakeError> {
    encode_limited(hello)
}

pub fn decode_hello(data: &[u8]) -> Result<Hello, HandshakeError> {
    decode_limited(data)
}

pub fn encode_hello_ack(ack: &HelloAck) -> Result<Vec<u8>, HandshakeError> {
    encode_limited(ack)
}

pub fn decode_hello_ack(data: &[u8]) -> Result<HelloAck, HandshakeError> {
    decode_limited(data)
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_HANDSHAKE_MSG_SIZE)
        .with_fixint_encoding()
}

fn encode_limited<T: Serialize>(msg: &T) -> Result<Vec<u8>, HandshakeError> {
    codec()
        .serialize(msg)
        .map_err(|e| HandshakeError::Protocol(format!("cannot encode handshake message: {}", e)))
}

fn decode_limited<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, HandshakeError> {
    codec()
        .deserialize(data)
        .map_err(|e| HandshakeError::Protocol(format!("malformed handshake message: {}", e)))
}

/// Run the handshake for `role` over a reader/writer pair.
///
/// The whole exchange must finish within `window`; otherwise the result is
/// `TimedOut`, never a mismatch.
pub async fn negotiate<R, W>(
    role: Role,
    ctx: &Context,
    reader: &mut R,
    writer: &mut W,
    window: Duration,
) -> Result<Agreed, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let local = Fingerprint::of(ctx);
    let exchange = async {
        match role {
            Role::Initiator => initiate(&local, reader, writer).await,
            Role::Responder => respond(&local, reader, writer).await,
        }
    };
    match tokio::time::timeout(window, exchange).await {
        Ok(result) => result,
        Err(_) => Err(HandshakeError::TimedOut(window)),
    }
}

async fn initiate<R, W>(local: &Fingerprint, reader: &mut R, writer: &mut W) -> Result<Agreed, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let hello = Hello {
        version: PROTOCOL_VERSION,
        fingerprint: *local,
    };
    write_frame(writer, &Frame::new(MessageType::Hello, encode_hello(&hello)?)).await?;

    let frame = read_frame(reader).await?;
    if frame.msg_type != MessageType::HelloAck {
        return Err(HandshakeError::Protocol(format!(
            "expected HelloAck, got {:?}",
            frame.msg_type
        )));
    }
    let ack = decode_hello_ack(&frame.payload)?;

    check_version(ack.version)?;
    local.compare(&ack.fingerprint)?;
    if !ack.accepted {
        return Err(HandshakeError::Protocol(
            "responder rejected identical fingerprint".into(),
        ));
    }
    Ok(Agreed { fingerprint: *local })
}

async fn respond<R, W>(local: &Fingerprint, reader: &mut R, writer: &mut W) -> Result<Agreed, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let frame = read_frame(reader).await?;
    if frame.msg_type != MessageType::Hello {
        return Err(HandshakeError::Protocol(format!(
            "expected Hello, got {:?}",
            frame.msg_type
        )));
    }
    let hello = decode_hello(&frame.payload)?;

    let verdict = check_version(hello.version)
        .and_then(|()| local.compare(&hello.fingerprint).map_err(HandshakeError::from));

    // Always answer, so the initiator reaches the same verdict instead of
    // seeing a dropped stream.
    let ack = HelloAck {
        version: PROTOCOL_VERSION,
        fingerprint: *local,
        accepted: verdict.is_ok(),
    };
    write_frame(writer, &Frame::new(MessageType::HelloAck, encode_hello_ack(&ack)?)).await?;

    verdict.map(|()| Agreed { fingerprint: *local })
}

fn check_version(peer: u32) -> Result<(), HandshakeError> {
    if peer != PROTOCOL_VERSION {
        return Err(HandshakeError::VersionMismatch {
            local: PROTOCOL_VERSION,
            peer,
        });
    }
    Ok(())
}
