//! Wire-level types shared by the tunnel's signaling client and, on the
//! relay side, test fixtures: the initial version handshake, relay-address
//! derivation, and the ICE candidate batch envelope.

#![forbid(unsafe_code)]

pub mod address;
pub mod error;
pub mod wire;

pub use error::ProtocolError;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
