//! Side identifiers and relay-address derivation.
//!
//! Mirrors `core/common.go` (`offerSideId`/`answerSideId`) and
//! `piping-webrtc-signaling/common.go` from the original implementation:
//! the offer side is always `offer_<path>`, the answer side `answer_<path>`;
//! a signaling channel address is `sha256_hex("<from>-<to>")` for the
//! initial handshake, or the literal `"<from>-<to>/sdp"` /
//! `"<from>-<to>/candidate"` for the description and candidate exchanges.

use sha2::{Digest, Sha256};

/// Build the offer-side identifier for a tunnel `path`.
pub fn offer_side_id(path: &str) -> String {
    format!("offer_{path}")
}

/// Build the answer-side identifier for a tunnel `path`.
pub fn answer_side_id(path: &str) -> String {
    format!("answer_{path}")
}

/// Decide which of two `duplex` identifiers plays the offer role.
///
/// The lexicographically smaller identifier is the offer side, per
/// `spec.md` §3 ("the lexicographically smaller local identifier becomes
/// the offer role"). Ties are impossible for two distinct local/remote IDs
/// supplied by distinct peers; callers pass the same pair of strings on
/// both ends so both sides resolve the same role assignment independently.
pub fn is_offer_role(local_id: &str, remote_id: &str) -> bool {
    local_id < remote_id
}

/// `sha256_hex("<from>-<to>")`, the address used for the one-shot initial
/// handshake. Hashing is a privacy fig leaf only (`spec.md` §4.2): it keeps
/// raw IDs out of relay access logs but provides no authentication.
pub fn handshake_address(from: &str, to: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(from.as_bytes());
    hasher.update(b"-");
    hasher.update(to.as_bytes());
    hex::encode(hasher.finalize())
}

/// Address for the SDP exchange: literal `"<from>-<to>/sdp"`.
pub fn sdp_address(from: &str, to: &str) -> String {
    format!("{from}-{to}/sdp")
}

/// Address for the candidate-batch exchange: literal `"<from>-<to>/candidates"`.
pub fn candidate_address(from: &str, to: &str) -> String {
    format!("{from}-{to}/candidates")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_and_answer_ids_are_prefixed() {
        assert_eq!(offer_side_id("abc"), "offer_abc");
        assert_eq!(answer_side_id("abc"), "answer_abc");
    }

    #[test]
    fn offer_role_is_lexicographic() {
        assert!(is_offer_role("alice", "bob"));
        assert!(!is_offer_role("bob", "alice"));
    }

    #[test]
    fn handshake_address_is_sha256_of_from_dash_to() {
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"offer-answer");
            hex::encode(hasher.finalize())
        };
        assert_eq!(handshake_address("offer", "answer"), expected);
    }

    #[test]
    fn handshake_address_is_directional() {
        assert_ne!(
            handshake_address("offer", "answer"),
            handshake_address("answer", "offer")
        );
    }

    #[test]
    fn sdp_and_candidate_addresses_are_literal() {
        assert_eq!(sdp_address("offer_x", "answer_x"), "offer_x-answer_x/sdp");
        assert_eq!(
            candidate_address("offer_x", "answer_x"),
            "offer_x-answer_x/candidates"
        );
    }
}
