pub mod handshake;
pub mod wire;
