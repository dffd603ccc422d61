//! Error kinds for the signaling and tunnel-forwarding layers.
//!
//! One variant per row of `spec.md` §7's error table. The retry-vs-fatal
//! policy described there is enforced by callers (the `Signaler`'s retry
//! loops only ever see `RelayNetwork`/`RelayUnavailable`/`InvalidPeerMessage`
//! and retry those unconditionally; every other variant is returned to the
//! caller as fatal, or in the case of `LocalDialFailed`, swallowed per-flow).

use thiserror::Error;

/// Errors surfaced by the signaling handshake and tunnel-forwarding layers.
#[derive(Error, Debug)]
pub enum TunnelError {
    /// Transport-level failure contacting the relay (connection refused,
    /// DNS failure, timeout). Retried with backoff until cancelled.
    #[error("relay network error: {0}")]
    RelayNetwork(#[source] reqwest::Error),

    /// The relay responded with a non-200 status.
    #[error("relay unavailable: status {status}")]
    RelayUnavailable {
        /// HTTP status code returned by the relay.
        status: u16,
    },

    /// A description or candidate batch failed to deserialize.
    #[error("invalid peer message: {0}")]
    InvalidPeerMessage(String),

    /// The peer's initial handshake reports a version we don't support.
    #[error("unsupported peer version: local={local}, remote={remote}")]
    UnsupportedPeerVersion {
        /// Our own protocol version.
        local: u64,
        /// The version the peer reported.
        remote: u64,
    },

    /// The underlying peer connection transitioned to `Failed`.
    #[error("peer connection failed")]
    PeerConnectionFailed,

    /// The underlying peer connection transitioned to `Disconnected`.
    ///
    /// Not an error: a terminal *clean* stop (`spec.md` §7). Kept as an
    /// enum variant rather than `Ok(())` so the single completion channel
    /// described in §5 can carry both outcomes uniformly; callers at the
    /// command boundary map this specific variant back to a zero exit code.
    #[error("peer disconnected")]
    PeerConnectionDisconnected,

    /// The tunnel dialer could not reach the configured local service.
    /// Per-flow only: the owning channel is closed, the session continues.
    #[error("local dial failed: {0}")]
    LocalDialFailed(#[source] std::io::Error),

    /// The tunnel listener could not bind or accept. Fatal for the session.
    #[error("local accept failed: {0}")]
    LocalAcceptFailed(#[source] std::io::Error),

    /// A `--header` argument was missing its `:` separator.
    #[error("bad header format: {0:?} (expected \"name: value\")")]
    BadHeaderFormat(String),

    /// `--ice-servers` was not valid JSON in the expected shape.
    #[error("bad --ice-servers JSON: {0}")]
    BadIceServersJson(#[source] serde_json::Error),

    /// A WebRTC peer-connection API call failed.
    #[error("webrtc error: {0}")]
    WebRtc(#[from] webrtc::Error),

    /// Local I/O failure not covered by a more specific variant above.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the tunnel-net crate.
pub type Result<T> = std::result::Result<T, TunnelError>;

impl From<tunnel_protocol::ProtocolError> for TunnelError {
    fn from(err: tunnel_protocol::ProtocolError) -> Self {
        match err {
            tunnel_protocol::ProtocolError::UnsupportedVersion { local, remote } => {
                Self::UnsupportedPeerVersion { local, remote }
            }
            tunnel_protocol::ProtocolError::InvalidMessage(msg) => Self::InvalidPeerMessage(msg),
        }
    }
}
