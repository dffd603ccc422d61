//! Initial version handshake, exchanged before SDP so peers can detect
//! protocol skew (`spec.md` §3, `InitialHandshake`).

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::Result;

/// The protocol version this build speaks.
pub const CURRENT_VERSION: u64 = 1;

/// `{"version": <u64>}`, posted to `sha256_hex("<from>-<to>")` by each side
/// before any SDP is exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialHandshake {
    /// Protocol version the sender speaks.
    pub version: u64,
}

impl InitialHandshake {
    /// The handshake this build sends.
    pub fn current() -> Self {
        Self {
            version: CURRENT_VERSION,
        }
    }

    /// Validate a peer's handshake against our own version.
    ///
    /// Per `spec.md` §3: "An offer-side reader receiving a version strictly
    /// greater than its own must fail with `UnsupportedPeerVersion`." Only
    /// the offer side enforces this (the answer side has no counterpart
    /// check in the original protocol: it reads the offer's version but
    /// never rejects it, matching `duplex/handle_answer.go`, which logs the
    /// initial payload without comparing versions).
    pub fn check_supported(&self) -> Result<()> {
        if self.version > CURRENT_VERSION {
            return Err(ProtocolError::UnsupportedVersion {
                local: CURRENT_VERSION,
                remote: self.version,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_handshake_is_supported() {
        InitialHandshake::current().check_supported().unwrap();
    }

    #[test]
    fn newer_peer_version_is_rejected() {
        let err = InitialHandshake { version: 2 }
            .check_supported()
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnsupportedVersion {
                local: 1,
                remote: 2
            }
        ));
    }

    #[test]
    fn older_peer_version_is_accepted() {
        InitialHandshake { version: 0 }.check_supported().unwrap();
    }

    #[test]
    fn handshake_round_trips_through_json() {
        let h = InitialHandshake::current();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"version":1}"#);
        let back: InitialHandshake = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
