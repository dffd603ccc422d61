//! Protocol-layer error type.

use thiserror::Error;

/// Errors that can occur while decoding or validating wire messages
/// exchanged over the relay.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A description or candidate batch failed to deserialize.
    #[error("invalid peer message: {0}")]
    InvalidMessage(String),

    /// The peer's initial handshake reports a version newer than ours.
    #[error("unsupported peer version: local={local}, remote={remote}")]
    UnsupportedVersion {
        /// Our own protocol version.
        local: u64,
        /// The version the peer reported.
        remote: u64,
    },
}
