//! Wire protocol: message types and framing.
//!
//! Frame format: `[1B type][4B length (big-endian)][payload]`
//!
//! Handshake payloads are bincode-serialized structs; health frames carry
//! an opaque payload that is echoed back.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// ─── Message types ───────────────────────────────────────────────────────

/// Protocol message type tags (1 byte on the wire).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    // Handshake
    Hello = 0x01,
    HelloAck = 0x02,
    // Health, only after agreement
    Ping = 0x20,
    Pong = 0x21,
    // Error
    Error = 0xFE,
}

impl MessageType {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Hello),
            0x02 => Some(Self::HelloAck),
            0x20 => Some(Self::Ping),
            0x21 => Some(Self::Pong),
            0xFE => Some(Self::Error),
            _ => None,
        }
    }
}

// ─── Frame encoding ──────────────────────────────────────────────────────

/// Maximum allowed frame payload size (64 KB).
///
/// Nothing this protocol sends comes close; the cap bounds what a peer
/// can make us allocate from a length field.
pub const MAX_FRAME_PAYLOAD: usize = 64 * 1024;

const HEADER_LEN: usize = 5;

/// Wire frame: 1B type + 4B big-endian length + payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: MessageType,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(msg_type: MessageType, payload: Vec<u8>) -> Self {
        Self { msg_type, payload }
    }

    /// Construct a frame, rejecting payloads above `MAX_FRAME_PAYLOAD`.
    pub fn new_checked(msg_type: MessageType, payload: Vec<u8>) -> Result<Self, FrameError> {
        if payload.len() > MAX_FRAME_PAYLOAD {
            return Err(FrameError::PayloadTooLarge(payload.len()));
        }
        Ok(Self { msg_type, payload })
    }

    /// Encode frame to bytes: [type][length][payload].
    pub fn try_encode(&self) -> Result<Vec<u8>, FrameError> {
        if self.payload.len() > MAX_FRAME_PAYLOAD {
            return Err(FrameError::PayloadTooLarge(self.payload.len()));
        }
        let len = self.payload.len() as u32;
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.push(self.msg_type as u8);
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Decode a frame from bytes. Returns (frame, bytes_consumed).
    pub fn decode(data: &[u8]) -> Result<(Self, usize), FrameError> {
        if data.len() < HEADER_LEN {
            return Err(FrameError::Incomplete);
        }
        let (msg_type, len) = parse_header([data[0], data[1], data[2], data[3], data[4]])?;
        if data.len() < HEADER_LEN + len {
            return Err(FrameError::Incomplete);
        }
        let payload = data[HEADER_LEN..HEADER_LEN + len].to_vec();
        Ok((Self { msg_type, payload }, HEADER_LEN + len))
    }
}

fn parse_header(header: [u8; HEADER_LEN]) -> Result<(MessageType, usize), FrameError> {
    let msg_type = MessageType::from_u8(header[0]).ok_or(FrameError::UnknownType(header[0]))?;
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if len > MAX_FRAME_PAYLOAD {
        return Err(FrameError::PayloadTooLarge(len));
    }
    Ok((msg_type, len))
}

// ─── Stream I/O ──────────────────────────────────────────────────────────

/// Read exactly one frame from a stream.
///
/// The header is validated before the payload is allocated. A stream that
/// ends mid-frame is `Incomplete`.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await.map_err(FrameError::from_io)?;
    let (msg_type, len) = parse_header(header)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(FrameError::from_io)?;
    Ok(Frame { msg_type, payload })
}

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame.try_encode()?;
    writer.write_all(&bytes).await.map_err(FrameError::from_io)?;
    writer.flush().await.map_err(FrameError::from_io)?;
    Ok(())
}

/// Frame decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Not enough bytes to decode a complete frame.
    Incomplete,
    /// Unknown message type byte.
    UnknownType(u8),
    /// Payload length exceeds `MAX_FRAME_PAYLOAD`.
    PayloadTooLarge(usize),
    /// The underlying stream failed.
    Io(std::io::ErrorKind),
}

impl FrameError {
    fn from_io(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::Incomplete,
            kind => Self::Io(kind),
        }
    }
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incomplete => write!(f, "incomplete frame"),
            Self::UnknownType(b) => write!(f, "unknown message type: 0x{:02x}", b),
            Self::PayloadTooLarge(n) => write!(
                f,
                "payload too large: {} bytes (max {})",
                n, MAX_FRAME_PAYLOAD
            ),
            Self::Io(kind) => write!(f, "stream error: {}", kind),
        }
    }
}

impl std::error::Error for FrameError {}
