//! # cdts-node — Context Agreement over QUIC
//!
//! Endpoints that must prove they derived the same encryption context
//! before exchanging any ciphertext. Each session runs a fingerprint
//! handshake; a mismatch or timeout ends that session and nothing else.
//!
//! ## Architecture
//!
//! - **`config`** — Node configuration (listen addr, session limit, negotiation window)
//! - **`protocol`** — Wire protocol: frame encoding and the Hello/HelloAck handshake
//! - **`session`** — Per-session state machine and outcome reports
//! - **`net`** — QUIC transport via quinn (self-signed TLS)
//! - **`node`** — Listener daemon and the client-side `connect_and_negotiate`

pub mod config;
pub mod net;
pub mod node;
pub mod protocol;
pub mod session;
